use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, QueryBuilder, Row};

pub const MAX_EVENT_QUERY_LIMIT: i64 = 200;
pub const DEFAULT_EVENT_QUERY_LIMIT: i64 = 50;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRawEvent {
    pub id: i64,
    pub event_id: String,
    pub topic: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub correlation_id: String,
    pub received_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

/// Append-only log of every accepted (non-duplicate) event.
#[derive(Clone)]
pub struct RawEventsRepo {
    pub pool: PgPool,
}

impl RawEventsRepo {
    pub async fn insert(
        &self,
        event_id: &str,
        topic: &str,
        event_type: &str,
        correlation_id: &str,
        payload: &serde_json::Value,
        received_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO raw_events (event_id, topic, event_type, correlation_id, payload, received_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event_id)
        .bind(topic)
        .bind(event_type)
        .bind(correlation_id)
        .bind(payload)
        .bind(received_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent events, newest first, optionally narrowed by topic and
    /// a lower received-at bound.
    pub async fn recent(
        &self,
        limit: i64,
        topic: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<StoredRawEvent>> {
        let limit = clamp_limit(limit);

        let mut builder = QueryBuilder::new(
            "SELECT id, event_id, topic, event_type, correlation_id, payload, received_at FROM raw_events",
        );
        let mut first = true;
        if let Some(topic) = topic {
            builder.push(" WHERE topic = ").push_bind(topic);
            first = false;
        }
        if let Some(since) = since {
            builder.push(if first { " WHERE " } else { " AND " });
            builder.push("received_at >= ").push_bind(since);
        }
        builder.push(" ORDER BY received_at DESC LIMIT ").push_bind(limit);

        let rows = builder.build().fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|r| StoredRawEvent {
                id: r.get("id"),
                event_id: r.get("event_id"),
                topic: r.get("topic"),
                event_type: r.get("event_type"),
                correlation_id: r.get("correlation_id"),
                received_at: r.get("received_at"),
                payload: r.get("payload"),
            })
            .collect())
    }
}

pub fn clamp_limit(limit: i64) -> i64 {
    if limit <= 0 {
        DEFAULT_EVENT_QUERY_LIMIT
    } else {
        limit.min(MAX_EVENT_QUERY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_clamped() {
        assert_eq!(clamp_limit(0), DEFAULT_EVENT_QUERY_LIMIT);
        assert_eq!(clamp_limit(-10), DEFAULT_EVENT_QUERY_LIMIT);
        assert_eq!(clamp_limit(25), 25);
        assert_eq!(clamp_limit(200), 200);
        assert_eq!(clamp_limit(5000), MAX_EVENT_QUERY_LIMIT);
    }
}
