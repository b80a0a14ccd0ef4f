use crate::repo::correlations_repo::CorrelationBundle;
use crate::repo::risk_scores_repo::StoredScore;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

/// GET /scores/:order_id
pub async fn score_by_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Response {
    query_score(&state, &order_id).await
}

#[derive(Debug, Deserialize)]
pub struct MerchantScoreQuery {
    pub merchant: Option<String>,
    pub order: Option<String>,
}

/// GET /scores?merchant=&order=, an ownership-checked lookup.
pub async fn score_by_merchant(
    State(state): State<AppState>,
    Query(query): Query<MerchantScoreQuery>,
) -> Response {
    let (Some(merchant), Some(order)) = (query.merchant, query.order) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Both 'merchant' and 'order' query parameters are required"})),
        )
            .into_response();
    };

    match state.correlations_repo.order_owned_by(&order, &merchant).await {
        Ok(true) => query_score(&state, &order).await,
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "status": "not_found",
                "error": format!("No order {order} found for merchant {merchant}"),
            })),
        )
            .into_response(),
        Err(e) => internal(e),
    }
}

/// Resolves to exactly one of found / expired / pending / not_found.
async fn query_score(state: &AppState, order_id: &str) -> Response {
    let score = match state.risk_scores_repo.find_latest_by_order(order_id).await {
        Ok(score) => score,
        Err(e) => return internal(e),
    };

    if let Some(score) = score {
        if score.is_expired_at(Utc::now()) {
            return (
                StatusCode::GONE,
                Json(json!({
                    "status": "expired",
                    "error": format!("Score for {order_id} has expired"),
                    "expiredAt": score.expires_at,
                })),
            )
                .into_response();
        }

        let bundle = match state.correlations_repo.find(&score.correlation_id).await {
            Ok(bundle) => bundle,
            Err(e) => return internal(e),
        };

        return (
            StatusCode::OK,
            Json(json!({
                "status": "found",
                "data": score_body(&score, bundle.as_ref()),
            })),
        )
            .into_response();
    }

    // No score yet: distinguish an in-flight bundle from a never-seen order.
    match state.correlations_repo.find_latest_by_order(order_id).await {
        Ok(Some(bundle)) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "status": "pending",
                "message": "Order found but scoring is not complete yet",
                "receivedAt": bundle.created_at,
                "missingEvents": bundle.missing_legs(),
            })),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "status": "not_found",
                "error": format!("No score found for order {order_id}"),
            })),
        )
            .into_response(),
        Err(e) => internal(e),
    }
}

fn score_body(score: &StoredScore, bundle: Option<&CorrelationBundle>) -> serde_json::Value {
    json!({
        "correlationId": score.correlation_id,
        "orderId": score.order_id,
        "merchantId": score.merchant_id,
        "customerId": score.customer_id,
        "totalScore": score.total_score,
        "riskLevel": score.risk_level,
        "signals": score.signals,
        "hasDispute": bundle.map(|b| b.dispute_id.is_some()).unwrap_or(false),
        "disputeReason": bundle.and_then(|b| b.dispute_reason_code.clone()),
        "scoredAt": score.scored_at,
        "expiresAt": score.expires_at,
    })
}

fn internal(e: anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": e.to_string()})),
    )
        .into_response()
}
