use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// GET /broker/stats, serving the cached broker/consumer-group snapshot.
pub async fn broker_stats(State(state): State<AppState>) -> impl IntoResponse {
    match state.stats_cache.snapshot().await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => {
            tracing::error!("broker stats fetch failed: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": "Failed to fetch broker stats"})),
            )
                .into_response()
        }
    }
}
