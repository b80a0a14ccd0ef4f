pub mod broadcast {
    pub mod hub;
}
pub mod broker {
    pub mod consumer;
    pub mod stats;
}
pub mod config;
pub mod domain {
    pub mod event;
    pub mod score;
}
pub mod http {
    pub mod handlers {
        pub mod broker_stats;
        pub mod db_tables;
        pub mod events;
        pub mod health;
        pub mod scores;
        pub mod stream;
    }
}
pub mod ingest {
    pub mod pipeline;
    pub mod validator;
}
pub mod repo {
    pub mod correlations_repo;
    pub mod customer_history_repo;
    pub mod raw_events_repo;
    pub mod risk_scores_repo;
    pub mod seen_events_repo;
}
pub mod scoring {
    pub mod signals;
}
pub mod service {
    pub mod correlator;
    pub mod scorer;
}

#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub raw_events_repo: repo::raw_events_repo::RawEventsRepo,
    pub correlations_repo: repo::correlations_repo::CorrelationsRepo,
    pub risk_scores_repo: repo::risk_scores_repo::RiskScoresRepo,
    pub stats_cache: broker::stats::BrokerStatsCache,
    pub hub: broadcast::hub::BroadcastHub,
    pub started_at: std::time::Instant,
}
