use anyhow::Result;
use chrono::Utc;
use serde_json::json;

use crate::broadcast::hub::BroadcastHub;
use crate::ingest::validator::{EventValidator, ValidationError};
use crate::repo::raw_events_repo::RawEventsRepo;
use crate::repo::seen_events_repo::SeenEventsRepo;
use crate::service::correlator::Correlator;

/// Per-message processing: validate, dedup, persist, broadcast, correlate.
/// Runs to completion for each message before the consumer acks it.
#[derive(Clone)]
pub struct IngestPipeline {
    pub validator: EventValidator,
    pub seen_events_repo: SeenEventsRepo,
    pub raw_events_repo: RawEventsRepo,
    pub correlator: Correlator,
    pub hub: BroadcastHub,
}

impl IngestPipeline {
    pub async fn handle_message(&self, topic: &str, raw: &str) -> Result<()> {
        let valid = match self.validator.validate(topic, raw) {
            Ok(valid) => valid,
            Err(ValidationError::Malformed(err)) => {
                tracing::warn!("invalid JSON on {}: {}", topic, err);
                return Ok(());
            }
            Err(ValidationError::UnknownTopic) => return Ok(()),
            Err(ValidationError::Schema(problems)) => {
                tracing::warn!("validation failed on {}: {}", topic, problems.join("; "));
                return Ok(());
            }
        };

        let event = &valid.event;
        let event_type = event.payload.event_type();
        let received_at = Utc::now();

        let is_new = self
            .seen_events_repo
            .register_if_new(&event.id, topic, event_type)
            .await?;

        if !is_new {
            tracing::debug!("duplicate {} on {}", event.id, topic);
            self.hub.publish(
                "event.duplicate",
                json!({
                    "eventId": event.id,
                    "topic": topic,
                    "type": event_type,
                    "correlationId": event.correlation_id,
                    "rejectedAt": received_at,
                }),
            );
            return Ok(());
        }

        self.raw_events_repo
            .insert(&event.id, topic, event_type, &event.correlation_id, &valid.raw, received_at)
            .await?;

        self.hub.publish(
            "event.received",
            json!({
                "eventId": event.id,
                "topic": topic,
                "type": event_type,
                "correlationId": event.correlation_id,
                "receivedAt": received_at,
                "summary": event.summary(),
            }),
        );

        self.correlator.apply(event, &valid.raw, received_at).await?;

        Ok(())
    }
}
