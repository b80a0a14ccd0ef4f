use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::broadcast::hub::BroadcastHub;
use crate::domain::event::{EventPayload, IngestEvent, OrderData, PaymentData};
use crate::domain::score::{CorrelationFlow, RiskLevel, ScoreComputed, SignalBreakdown};
use crate::repo::correlations_repo::{CorrelationBundle, CorrelationsRepo};
use crate::repo::customer_history_repo::CustomerHistoryRepo;
use crate::repo::risk_scores_repo::{RiskScoreRecord, RiskScoresRepo};
use crate::scoring::signals::{self, SignalProvider};

/// Orchestrates the five fraud signals over a completed bundle and owns
/// the score/history/broadcast side effects.
#[derive(Clone)]
pub struct RiskScorer {
    pub pool: PgPool,
    pub correlations_repo: CorrelationsRepo,
    pub history_repo: CustomerHistoryRepo,
    pub scores_repo: RiskScoresRepo,
    pub signals: Arc<dyn SignalProvider>,
    pub score_ttl_hours: i64,
    pub hub: BroadcastHub,
}

impl RiskScorer {
    /// Score a bundle exactly once. Returns None when the bundle is
    /// absent, incomplete, or already claimed by a concurrent completion.
    ///
    /// The claim, the score upsert, and the history growth commit in one
    /// transaction: two workers observing "complete and unscored" at the
    /// same time still produce exactly one score and one broadcast, and a
    /// crash mid-scoring rolls the claim back rather than leaving a
    /// claimed-but-unscored bundle.
    pub async fn score_correlation(&self, correlation_id: &str) -> Result<Option<ScoreComputed>> {
        let Some(bundle) = self.correlations_repo.find(correlation_id).await? else {
            return Ok(None);
        };
        if !bundle.is_complete() {
            return Ok(None);
        }

        self.persist(&bundle, true).await
    }

    /// Recompute and overwrite an existing score. The upsert is keyed by
    /// correlation id, so repeated calls against an unchanged bundle leave
    /// a single identical row.
    pub async fn rescore(&self, correlation_id: &str) -> Result<Option<ScoreComputed>> {
        let Some(bundle) = self.correlations_repo.find(correlation_id).await? else {
            return Ok(None);
        };
        if !bundle.is_complete() {
            return Ok(None);
        }

        self.persist(&bundle, false).await
    }

    async fn persist(&self, bundle: &CorrelationBundle, claim: bool) -> Result<Option<ScoreComputed>> {
        let order = order_data(bundle)?;
        let payment = payment_data(bundle)?;

        let prior_ips = self.history_repo.known_ips(&order.customer_id).await?;
        let known_devices = self.history_repo.known_devices(&order.customer_id).await?;

        let breakdown =
            signals::evaluate(self.signals.as_ref(), &order, &payment, &prior_ips, &known_devices);
        let total = breakdown.total();
        let level = RiskLevel::from_total(total);

        let scored_at = Utc::now();
        let expires_at = scored_at + Duration::hours(self.score_ttl_hours);

        let record = RiskScoreRecord {
            correlation_id: bundle.correlation_id.clone(),
            order_id: order.order_id.clone(),
            merchant_id: order.merchant_id.clone(),
            customer_id: Some(order.customer_id.clone()),
            total_score: total,
            signals: breakdown,
            risk_level: level,
            scored_at,
            expires_at,
        };

        let mut tx = self.pool.begin().await?;
        if claim {
            let claimed =
                CorrelationsRepo::claim_scored_tx(&mut tx, &bundle.correlation_id, scored_at)
                    .await?;
            if !claimed {
                tx.rollback().await?;
                tracing::debug!(
                    "correlation {} already claimed by another worker",
                    bundle.correlation_id
                );
                return Ok(None);
            }
        } else {
            CorrelationsRepo::mark_scored_tx(&mut tx, &bundle.correlation_id, scored_at).await?;
        }
        RiskScoresRepo::upsert_tx(&mut tx, &record).await?;
        CustomerHistoryRepo::record_ip_tx(&mut tx, &order.customer_id, &order.ip_address).await?;
        CustomerHistoryRepo::record_fingerprint_tx(
            &mut tx,
            &order.customer_id,
            &order.device_fingerprint,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            "{} scored {} ({}) corr={}",
            order.order_id,
            total,
            level.as_str(),
            bundle.correlation_id
        );

        let computed = ScoreComputed {
            correlation_id: bundle.correlation_id.clone(),
            order_id: order.order_id.clone(),
            merchant_id: order.merchant_id.clone(),
            customer_id: order.customer_id.clone(),
            total_score: total,
            risk_level: level,
            signals: breakdown,
            scored_at,
            expires_at,
            flow: CorrelationFlow {
                order_received_at: bundle.order_received_at,
                payment_received_at: bundle.payment_received_at,
                dispute_received_at: bundle.dispute_received_at,
            },
        };

        self.hub.publish("score.computed", serde_json::to_value(&computed)?);

        Ok(Some(computed))
    }
}

fn order_data(bundle: &CorrelationBundle) -> Result<OrderData> {
    let payload = bundle
        .order_payload
        .clone()
        .context("bundle has no order payload")?;
    let event: IngestEvent = serde_json::from_value(payload)?;
    match event.payload {
        EventPayload::OrderCreated { data } => Ok(data),
        other => bail!("order leg holds {} payload", other.event_type()),
    }
}

fn payment_data(bundle: &CorrelationBundle) -> Result<PaymentData> {
    let payload = bundle
        .payment_payload
        .clone()
        .context("bundle has no payment payload")?;
    let event: IngestEvent = serde_json::from_value(payload)?;
    match event.payload {
        EventPayload::PaymentAuthorized { data } => Ok(data),
        other => bail!("payment leg holds {} payload", other.event_type()),
    }
}
