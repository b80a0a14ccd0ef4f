use anyhow::Result;
use sqlx::{PgPool, Postgres, Row, Transaction};

/// First-seen sets of IP addresses and device fingerprints per customer.
/// Membership only: inserts are ignore-on-conflict, rows are never removed.
#[derive(Clone)]
pub struct CustomerHistoryRepo {
    pub pool: PgPool,
}

impl CustomerHistoryRepo {
    pub async fn known_ips(&self, customer_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT ip_address FROM customer_ips WHERE customer_id = $1")
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|r| r.get("ip_address")).collect())
    }

    pub async fn known_devices(&self, customer_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT fingerprint FROM customer_devices WHERE customer_id = $1")
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|r| r.get("fingerprint")).collect())
    }

    pub async fn record_ip_tx(
        tx: &mut Transaction<'_, Postgres>,
        customer_id: &str,
        ip_address: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO customer_ips (customer_id, ip_address) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(customer_id)
        .bind(ip_address)
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }

    pub async fn record_fingerprint_tx(
        tx: &mut Transaction<'_, Postgres>,
        customer_id: &str,
        fingerprint: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO customer_devices (customer_id, fingerprint) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(customer_id)
        .bind(fingerprint)
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }
}
