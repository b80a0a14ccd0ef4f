use crate::repo::raw_events_repo::DEFAULT_EVENT_QUERY_LIMIT;
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<i64>,
    pub topic: Option<String>,
    pub since: Option<DateTime<Utc>>,
}

/// GET /events?limit=&topic=&since=, querying the recent raw event log.
pub async fn recent_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_EVENT_QUERY_LIMIT);

    match state
        .raw_events_repo
        .recent(limit, query.topic.as_deref(), query.since)
        .await
    {
        Ok(events) => (
            StatusCode::OK,
            Json(json!({
                "count": events.len(),
                "data": events,
            })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}
