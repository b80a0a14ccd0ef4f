use axum::routing::get;
use axum::Router;
use risk_engine::broadcast::hub::BroadcastHub;
use risk_engine::broker::consumer::StreamConsumer;
use risk_engine::broker::stats::BrokerStatsCache;
use risk_engine::config::AppConfig;
use risk_engine::ingest::pipeline::IngestPipeline;
use risk_engine::ingest::validator::EventValidator;
use risk_engine::repo::correlations_repo::CorrelationsRepo;
use risk_engine::repo::customer_history_repo::CustomerHistoryRepo;
use risk_engine::repo::raw_events_repo::RawEventsRepo;
use risk_engine::repo::risk_scores_repo::RiskScoresRepo;
use risk_engine::repo::seen_events_repo::SeenEventsRepo;
use risk_engine::scoring::signals::FirstSeenSignals;
use risk_engine::service::correlator::Correlator;
use risk_engine::service::scorer::RiskScorer;
use risk_engine::AppState;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    // Schema bootstrap is all-or-nothing: any migration error aborts startup.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let redis_client = redis::Client::open(cfg.redis_url.clone())?;
    let hub = BroadcastHub::new(1024);

    let seen_events_repo = SeenEventsRepo { pool: pool.clone() };
    let raw_events_repo = RawEventsRepo { pool: pool.clone() };
    let correlations_repo = CorrelationsRepo { pool: pool.clone() };
    let risk_scores_repo = RiskScoresRepo { pool: pool.clone() };
    let history_repo = CustomerHistoryRepo { pool: pool.clone() };

    let scorer = RiskScorer {
        pool: pool.clone(),
        correlations_repo: correlations_repo.clone(),
        history_repo,
        scores_repo: risk_scores_repo.clone(),
        signals: Arc::new(FirstSeenSignals),
        score_ttl_hours: cfg.score_ttl_hours,
        hub: hub.clone(),
    };

    let correlator = Correlator {
        correlations_repo: correlations_repo.clone(),
        scorer,
    };

    let pipeline = IngestPipeline {
        validator: EventValidator::new(&cfg),
        seen_events_repo,
        raw_events_repo: raw_events_repo.clone(),
        correlator,
        hub: hub.clone(),
    };

    let consumer = StreamConsumer {
        redis_client: redis::Client::open(cfg.redis_url.clone())?,
        streams: cfg.stream_keys(),
        group: cfg.consumer_group.clone(),
        consumer_name: cfg.consumer_name.clone(),
        pipeline,
    };
    tokio::spawn(consumer.run());

    let stats_cache = BrokerStatsCache::new(
        redis_client,
        cfg.stream_keys(),
        cfg.consumer_group.clone(),
    );

    // Push broker stats to stream subscribers every 10s so the dashboard
    // does not poll.
    {
        let stats_cache = stats_cache.clone();
        let hub = hub.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(10));
            loop {
                interval.tick().await;
                match stats_cache.snapshot().await {
                    Ok(stats) => hub.publish("broker.stats", stats),
                    Err(err) => tracing::warn!("broker stats push failed: {:#}", err),
                }
            }
        });
    }

    // Heartbeat keeps stream connections alive through proxies.
    {
        let hub = hub.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(15));
            loop {
                interval.tick().await;
                hub.publish("heartbeat", json!({ "ts": chrono::Utc::now() }));
            }
        });
    }

    let state = AppState {
        pool,
        raw_events_repo,
        correlations_repo,
        risk_scores_repo,
        stats_cache,
        hub,
        started_at: std::time::Instant::now(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::OPTIONS])
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(risk_engine::http::handlers::health::health))
        .route("/scores/:order_id", get(risk_engine::http::handlers::scores::score_by_order))
        .route("/scores", get(risk_engine::http::handlers::scores::score_by_merchant))
        .route("/events", get(risk_engine::http::handlers::events::recent_events))
        .route("/broker/stats", get(risk_engine::http::handlers::broker_stats::broker_stats))
        .route("/stream", get(risk_engine::http::handlers::stream::stream))
        .route("/db/tables", get(risk_engine::http::handlers::db_tables::db_tables))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
