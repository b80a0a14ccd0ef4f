use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::domain::score::{RiskLevel, SignalBreakdown};

pub struct RiskScoreRecord {
    pub correlation_id: String,
    pub order_id: String,
    pub merchant_id: String,
    pub customer_id: Option<String>,
    pub total_score: i32,
    pub signals: SignalBreakdown,
    pub risk_level: RiskLevel,
    pub scored_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StoredScore {
    pub correlation_id: String,
    pub order_id: String,
    pub merchant_id: String,
    pub customer_id: Option<String>,
    pub total_score: i32,
    pub signals: SignalBreakdown,
    pub risk_level: String,
    pub scored_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StoredScore {
    /// Lazy expiry: the row outlives `expires_at`, queries just stop
    /// treating it as live.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

#[derive(Clone)]
pub struct RiskScoresRepo {
    pub pool: PgPool,
}

impl RiskScoresRepo {
    /// Idempotent upsert keyed by correlation id; a re-score overwrites
    /// every signal in place.
    pub async fn upsert_tx(
        tx: &mut Transaction<'_, Postgres>,
        record: &RiskScoreRecord,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO risk_scores
                (correlation_id, order_id, merchant_id, customer_id, total_score,
                 sig_ip_velocity, sig_device_reuse, sig_email_domain, sig_bin_mismatch,
                 sig_chargeback_history, risk_level, scored_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (correlation_id) DO UPDATE SET
                total_score            = EXCLUDED.total_score,
                sig_ip_velocity        = EXCLUDED.sig_ip_velocity,
                sig_device_reuse       = EXCLUDED.sig_device_reuse,
                sig_email_domain       = EXCLUDED.sig_email_domain,
                sig_bin_mismatch       = EXCLUDED.sig_bin_mismatch,
                sig_chargeback_history = EXCLUDED.sig_chargeback_history,
                risk_level             = EXCLUDED.risk_level,
                scored_at              = EXCLUDED.scored_at,
                expires_at             = EXCLUDED.expires_at
            "#,
        )
        .bind(&record.correlation_id)
        .bind(&record.order_id)
        .bind(&record.merchant_id)
        .bind(&record.customer_id)
        .bind(record.total_score)
        .bind(record.signals.ip_velocity)
        .bind(record.signals.device_reuse)
        .bind(record.signals.email_domain)
        .bind(record.signals.bin_mismatch)
        .bind(record.signals.chargeback_history)
        .bind(record.risk_level.as_str())
        .bind(record.scored_at)
        .bind(record.expires_at)
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }

    pub async fn find_latest_by_order(&self, order_id: &str) -> Result<Option<StoredScore>> {
        let row = sqlx::query(
            r#"
            SELECT correlation_id, order_id, merchant_id, customer_id, total_score,
                   sig_ip_velocity, sig_device_reuse, sig_email_domain, sig_bin_mismatch,
                   sig_chargeback_history, risk_level, scored_at, expires_at
            FROM risk_scores
            WHERE order_id = $1
            ORDER BY scored_at DESC
            LIMIT 1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| StoredScore {
            correlation_id: r.get("correlation_id"),
            order_id: r.get("order_id"),
            merchant_id: r.get("merchant_id"),
            customer_id: r.get("customer_id"),
            total_score: r.get("total_score"),
            signals: SignalBreakdown {
                ip_velocity: r.get("sig_ip_velocity"),
                device_reuse: r.get("sig_device_reuse"),
                email_domain: r.get("sig_email_domain"),
                bin_mismatch: r.get("sig_bin_mismatch"),
                chargeback_history: r.get("sig_chargeback_history"),
            },
            risk_level: r.get("risk_level"),
            scored_at: r.get("scored_at"),
            expires_at: r.get("expires_at"),
        }))
    }
}
