use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Bucket a total score. Boundaries are inclusive: 30 is MEDIUM,
    /// 60 is HIGH, 80 is CRITICAL.
    pub fn from_total(total: i32) -> Self {
        if total >= 80 {
            RiskLevel::Critical
        } else if total >= 60 {
            RiskLevel::High
        } else if total >= 30 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

/// The five fraud signals, each already clamped to 0..=20.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalBreakdown {
    pub ip_velocity: i32,
    pub device_reuse: i32,
    pub email_domain: i32,
    pub bin_mismatch: i32,
    pub chargeback_history: i32,
}

impl SignalBreakdown {
    pub fn total(&self) -> i32 {
        self.ip_velocity
            + self.device_reuse
            + self.email_domain
            + self.bin_mismatch
            + self.chargeback_history
    }
}

/// Payload of the `score.computed` broadcast.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreComputed {
    pub correlation_id: String,
    pub order_id: String,
    pub merchant_id: String,
    pub customer_id: String,
    pub total_score: i32,
    pub risk_level: RiskLevel,
    pub signals: SignalBreakdown,
    pub scored_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub flow: CorrelationFlow,
}

/// When each leg of the bundle arrived, for dashboard flow rendering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationFlow {
    pub order_received_at: Option<DateTime<Utc>>,
    pub payment_received_at: Option<DateTime<Utc>>,
    pub dispute_received_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_boundaries() {
        assert_eq!(RiskLevel::from_total(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_total(29), RiskLevel::Low);
        assert_eq!(RiskLevel::from_total(30), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_total(59), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_total(60), RiskLevel::High);
        assert_eq!(RiskLevel::from_total(79), RiskLevel::High);
        assert_eq!(RiskLevel::from_total(80), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_total(100), RiskLevel::Critical);
    }

    #[test]
    fn total_is_sum_of_signals() {
        let signals = SignalBreakdown {
            ip_velocity: 15,
            device_reuse: 12,
            email_domain: 8,
            bin_mismatch: 18,
            chargeback_history: 20,
        };
        assert_eq!(signals.total(), 73);
        assert_eq!(RiskLevel::from_total(signals.total()), RiskLevel::High);
    }
}
