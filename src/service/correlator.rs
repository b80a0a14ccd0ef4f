use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::domain::event::{EventPayload, IngestEvent};
use crate::repo::correlations_repo::CorrelationsRepo;
use crate::service::scorer::RiskScorer;

/// Stateful cross-stream join. Each incoming leg upserts only its own
/// columns, so the three events converge to the same bundle in any of the
/// six arrival orders.
#[derive(Clone)]
pub struct Correlator {
    pub correlations_repo: CorrelationsRepo,
    pub scorer: RiskScorer,
}

impl Correlator {
    pub async fn apply(
        &self,
        event: &IngestEvent,
        payload: &serde_json::Value,
        received_at: DateTime<Utc>,
    ) -> Result<()> {
        let correlation_id = &event.correlation_id;

        match &event.payload {
            EventPayload::OrderCreated { data } => {
                self.correlations_repo
                    .upsert_order_leg(correlation_id, data, payload, received_at)
                    .await?;
            }
            EventPayload::PaymentAuthorized { data } => {
                self.correlations_repo
                    .upsert_payment_leg(correlation_id, data, payload, received_at)
                    .await?;
            }
            EventPayload::DisputeOpened { data } => {
                self.correlations_repo
                    .upsert_dispute_leg(correlation_id, &event.id, data, payload, received_at)
                    .await?;
            }
        }

        // Cheap completeness gate; the scorer's conditional claim is what
        // guarantees single scoring under concurrent completions.
        let Some(bundle) = self.correlations_repo.find(correlation_id).await? else {
            return Ok(());
        };
        if bundle.is_complete() && bundle.scored_at.is_none() {
            self.scorer.score_correlation(correlation_id).await?;
        }

        Ok(())
    }
}
