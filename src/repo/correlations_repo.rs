use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::domain::event::{DisputeData, OrderData, PaymentData};

/// Partial-to-complete join record for one correlation id. Each leg's
/// columns are written only by that leg's upsert; legs never overwrite
/// each other.
#[derive(Debug, Clone)]
pub struct CorrelationBundle {
    pub correlation_id: String,
    pub order_id: Option<String>,
    pub merchant_id: Option<String>,
    pub customer_id: Option<String>,
    pub order_payload: Option<serde_json::Value>,
    pub payment_id: Option<String>,
    pub bin_country: Option<String>,
    pub payment_payload: Option<serde_json::Value>,
    pub dispute_id: Option<String>,
    pub dispute_reason_code: Option<String>,
    pub dispute_payload: Option<serde_json::Value>,
    pub order_received_at: Option<DateTime<Utc>>,
    pub payment_received_at: Option<DateTime<Utc>>,
    pub dispute_received_at: Option<DateTime<Utc>>,
    pub scored_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CorrelationBundle {
    pub fn is_complete(&self) -> bool {
        self.order_payload.is_some()
            && self.payment_payload.is_some()
            && self.dispute_payload.is_some()
    }

    /// Legs not yet present, in stream order.
    pub fn missing_legs(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.order_payload.is_none() {
            missing.push("order");
        }
        if self.payment_payload.is_none() {
            missing.push("payment");
        }
        if self.dispute_payload.is_none() {
            missing.push("dispute");
        }
        missing
    }
}

#[derive(Clone)]
pub struct CorrelationsRepo {
    pub pool: PgPool,
}

impl CorrelationsRepo {
    pub async fn upsert_order_leg(
        &self,
        correlation_id: &str,
        data: &OrderData,
        payload: &serde_json::Value,
        received_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO correlations
                (correlation_id, order_id, merchant_id, customer_id,
                 order_payload, order_received_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (correlation_id) DO UPDATE SET
                order_id          = EXCLUDED.order_id,
                merchant_id       = EXCLUDED.merchant_id,
                customer_id       = EXCLUDED.customer_id,
                order_payload     = EXCLUDED.order_payload,
                order_received_at = EXCLUDED.order_received_at,
                updated_at        = NOW()
            "#,
        )
        .bind(correlation_id)
        .bind(&data.order_id)
        .bind(&data.merchant_id)
        .bind(&data.customer_id)
        .bind(payload)
        .bind(received_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn upsert_payment_leg(
        &self,
        correlation_id: &str,
        data: &PaymentData,
        payload: &serde_json::Value,
        received_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO correlations
                (correlation_id, payment_id, bin_country,
                 payment_payload, payment_received_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (correlation_id) DO UPDATE SET
                payment_id          = EXCLUDED.payment_id,
                bin_country         = EXCLUDED.bin_country,
                payment_payload     = EXCLUDED.payment_payload,
                payment_received_at = EXCLUDED.payment_received_at,
                updated_at          = NOW()
            "#,
        )
        .bind(correlation_id)
        .bind(&data.payment_id)
        .bind(&data.bin_country)
        .bind(payload)
        .bind(received_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The dispute event's envelope id is the dispute identity.
    pub async fn upsert_dispute_leg(
        &self,
        correlation_id: &str,
        dispute_event_id: &str,
        data: &DisputeData,
        payload: &serde_json::Value,
        received_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO correlations
                (correlation_id, dispute_id, dispute_reason_code,
                 dispute_payload, dispute_received_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (correlation_id) DO UPDATE SET
                dispute_id          = EXCLUDED.dispute_id,
                dispute_reason_code = EXCLUDED.dispute_reason_code,
                dispute_payload     = EXCLUDED.dispute_payload,
                dispute_received_at = EXCLUDED.dispute_received_at,
                updated_at          = NOW()
            "#,
        )
        .bind(correlation_id)
        .bind(dispute_event_id)
        .bind(data.reason_code.as_str())
        .bind(payload)
        .bind(received_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find(&self, correlation_id: &str) -> Result<Option<CorrelationBundle>> {
        let row = sqlx::query(
            r#"
            SELECT correlation_id, order_id, merchant_id, customer_id, order_payload,
                   payment_id, bin_country, payment_payload,
                   dispute_id, dispute_reason_code, dispute_payload,
                   order_received_at, payment_received_at, dispute_received_at,
                   scored_at, created_at, updated_at
            FROM correlations
            WHERE correlation_id = $1
            "#,
        )
        .bind(correlation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(bundle_from_row))
    }

    pub async fn find_latest_by_order(&self, order_id: &str) -> Result<Option<CorrelationBundle>> {
        let row = sqlx::query(
            r#"
            SELECT correlation_id, order_id, merchant_id, customer_id, order_payload,
                   payment_id, bin_country, payment_payload,
                   dispute_id, dispute_reason_code, dispute_payload,
                   order_received_at, payment_received_at, dispute_received_at,
                   scored_at, created_at, updated_at
            FROM correlations
            WHERE order_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(bundle_from_row))
    }

    pub async fn order_owned_by(&self, order_id: &str, merchant_id: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 AS one FROM correlations WHERE order_id = $1 AND merchant_id = $2 LIMIT 1",
        )
        .bind(order_id)
        .bind(merchant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Atomic scoring claim: sets `scored_at` only when the bundle is
    /// complete and not yet claimed. Returns whether this caller won.
    /// Concurrent completions race here and exactly one proceeds to score.
    pub async fn claim_scored_tx(
        tx: &mut Transaction<'_, Postgres>,
        correlation_id: &str,
        scored_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE correlations
            SET scored_at = $2, updated_at = NOW()
            WHERE correlation_id = $1
              AND scored_at IS NULL
              AND order_payload IS NOT NULL
              AND payment_payload IS NOT NULL
              AND dispute_payload IS NOT NULL
            "#,
        )
        .bind(correlation_id)
        .bind(scored_at)
        .execute(tx.as_mut())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Unconditional re-score stamp, used by the idempotent rescore path.
    pub async fn mark_scored_tx(
        tx: &mut Transaction<'_, Postgres>,
        correlation_id: &str,
        scored_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE correlations SET scored_at = $2, updated_at = NOW() WHERE correlation_id = $1",
        )
        .bind(correlation_id)
        .bind(scored_at)
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }
}

fn bundle_from_row(r: sqlx::postgres::PgRow) -> CorrelationBundle {
    CorrelationBundle {
        correlation_id: r.get("correlation_id"),
        order_id: r.get("order_id"),
        merchant_id: r.get("merchant_id"),
        customer_id: r.get("customer_id"),
        order_payload: r.get("order_payload"),
        payment_id: r.get("payment_id"),
        bin_country: r.get("bin_country"),
        payment_payload: r.get("payment_payload"),
        dispute_id: r.get("dispute_id"),
        dispute_reason_code: r.get("dispute_reason_code"),
        dispute_payload: r.get("dispute_payload"),
        order_received_at: r.get("order_received_at"),
        payment_received_at: r.get("payment_received_at"),
        dispute_received_at: r.get("dispute_received_at"),
        scored_at: r.get("scored_at"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_bundle() -> CorrelationBundle {
        CorrelationBundle {
            correlation_id: "corr-1".to_string(),
            order_id: None,
            merchant_id: None,
            customer_id: None,
            order_payload: None,
            payment_id: None,
            bin_country: None,
            payment_payload: None,
            dispute_id: None,
            dispute_reason_code: None,
            dispute_payload: None,
            order_received_at: None,
            payment_received_at: None,
            dispute_received_at: None,
            scored_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn completeness_requires_all_three_payloads() {
        let mut bundle = empty_bundle();
        assert!(!bundle.is_complete());
        assert_eq!(bundle.missing_legs(), vec!["order", "payment", "dispute"]);

        bundle.order_payload = Some(serde_json::json!({}));
        bundle.dispute_payload = Some(serde_json::json!({}));
        assert!(!bundle.is_complete());
        assert_eq!(bundle.missing_legs(), vec!["payment"]);

        bundle.payment_payload = Some(serde_json::json!({}));
        assert!(bundle.is_complete());
        assert!(bundle.missing_legs().is_empty());
    }
}
