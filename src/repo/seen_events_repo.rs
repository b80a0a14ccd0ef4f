use anyhow::Result;
use sqlx::PgPool;

/// Durable deduplication registry. Membership in `seen_events` alone
/// decides duplicate-ness; rows are never updated or deleted.
#[derive(Clone)]
pub struct SeenEventsRepo {
    pub pool: PgPool,
}

impl SeenEventsRepo {
    /// Atomically register an event id. Returns true when the id was new.
    /// `ON CONFLICT DO NOTHING` against the primary key keeps this correct
    /// with any number of concurrent consumers.
    pub async fn register_if_new(
        &self,
        event_id: &str,
        topic: &str,
        event_type: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO seen_events (event_id, topic, event_type)
            VALUES ($1, $2, $3)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(topic)
        .bind(event_type)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
