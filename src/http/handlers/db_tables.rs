use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use sqlx::{PgPool, Row};

const TABLE_QUERIES: [(&str, &str); 6] = [
    (
        "seen_events",
        "SELECT row_to_json(t) AS row FROM (
            SELECT event_id, topic, event_type, received_at
            FROM seen_events ORDER BY received_at DESC LIMIT 20) t",
    ),
    (
        "raw_events",
        "SELECT row_to_json(t) AS row FROM (
            SELECT id, event_id, topic, event_type, correlation_id, received_at
            FROM raw_events ORDER BY received_at DESC LIMIT 20) t",
    ),
    (
        "correlations",
        "SELECT row_to_json(t) AS row FROM (
            SELECT correlation_id, order_id, merchant_id, customer_id,
                   payment_id, bin_country, dispute_id, dispute_reason_code,
                   order_received_at, payment_received_at, dispute_received_at,
                   scored_at, created_at, updated_at,
                   (order_payload IS NOT NULL)   AS has_order,
                   (payment_payload IS NOT NULL) AS has_payment,
                   (dispute_payload IS NOT NULL) AS has_dispute
            FROM correlations ORDER BY updated_at DESC LIMIT 20) t",
    ),
    (
        "risk_scores",
        "SELECT row_to_json(t) AS row FROM (
            SELECT id, correlation_id, order_id, merchant_id, customer_id,
                   total_score, risk_level,
                   sig_ip_velocity, sig_device_reuse, sig_email_domain,
                   sig_bin_mismatch, sig_chargeback_history,
                   scored_at, expires_at
            FROM risk_scores ORDER BY scored_at DESC LIMIT 20) t",
    ),
    (
        "customer_ips",
        "SELECT row_to_json(t) AS row FROM (
            SELECT id, customer_id, ip_address, seen_at
            FROM customer_ips ORDER BY seen_at DESC LIMIT 20) t",
    ),
    (
        "customer_devices",
        "SELECT row_to_json(t) AS row FROM (
            SELECT id, customer_id, fingerprint, seen_at
            FROM customer_devices ORDER BY seen_at DESC LIMIT 20) t",
    ),
];

/// GET /db/tables, returning the last 20 rows of each table for the debug view.
pub async fn db_tables(State(state): State<AppState>) -> impl IntoResponse {
    match dump_tables(&state.pool).await {
        Ok(tables) => (
            StatusCode::OK,
            Json(json!({
                "tables": tables,
                "fetchedAt": chrono::Utc::now(),
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("db tables query failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Failed to query tables"})),
            )
                .into_response()
        }
    }
}

async fn dump_tables(pool: &PgPool) -> anyhow::Result<serde_json::Value> {
    let mut tables = serde_json::Map::new();

    for (table, sql) in TABLE_QUERIES {
        let rows = sqlx::query(sql).fetch_all(pool).await?;
        let rows: Vec<serde_json::Value> =
            rows.into_iter().map(|r| r.get::<serde_json::Value, _>("row")).collect();
        tables.insert(table.to_string(), serde_json::Value::Array(rows));
    }

    Ok(serde_json::Value::Object(tables))
}
