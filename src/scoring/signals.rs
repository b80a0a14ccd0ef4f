use crate::domain::score::SignalBreakdown;
use crate::domain::event::{OrderData, PaymentData};

/// Contract for the five externally-supplied fraud signals. Each method
/// returns a raw score; the orchestrator clamps every value to 0..=20
/// before it enters a breakdown, so implementations need not self-clamp.
pub trait SignalProvider: Send + Sync {
    fn ip_velocity(&self, current_ip: &str, prior_ips: &[String]) -> i32;
    fn device_reuse(&self, fingerprint: &str, known_devices: &[String]) -> i32;
    fn email_domain(&self, email: &str) -> i32;
    fn bin_country_mismatch(&self, bin_country: &str, billing_country: &str) -> i32;
    fn chargeback_history(&self, merchant_id: &str, customer_id: &str) -> i32;
}

pub fn clamp_signal(v: i32) -> i32 {
    v.clamp(0, 20)
}

/// Evaluate all five signals for a completed bundle, clamped per slot.
pub fn evaluate(
    provider: &dyn SignalProvider,
    order: &OrderData,
    payment: &PaymentData,
    prior_ips: &[String],
    known_devices: &[String],
) -> SignalBreakdown {
    SignalBreakdown {
        ip_velocity: clamp_signal(provider.ip_velocity(&order.ip_address, prior_ips)),
        device_reuse: clamp_signal(provider.device_reuse(&order.device_fingerprint, known_devices)),
        email_domain: clamp_signal(provider.email_domain(&order.email)),
        bin_mismatch: clamp_signal(
            provider.bin_country_mismatch(&payment.bin_country, &order.billing_country),
        ),
        chargeback_history: clamp_signal(
            provider.chargeback_history(&order.merchant_id, &order.customer_id),
        ),
    }
}

/// Baseline provider used by the binary when no signal library is wired in.
/// It only looks at first-seen membership and country mismatch; domain
/// reputation and chargeback data live in an external capability and score
/// zero here.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstSeenSignals;

impl SignalProvider for FirstSeenSignals {
    fn ip_velocity(&self, current_ip: &str, prior_ips: &[String]) -> i32 {
        if prior_ips.is_empty() {
            5
        } else if prior_ips.iter().any(|ip| ip == current_ip) {
            0
        } else {
            15
        }
    }

    fn device_reuse(&self, fingerprint: &str, known_devices: &[String]) -> i32 {
        if known_devices.is_empty() {
            5
        } else if known_devices.iter().any(|fp| fp == fingerprint) {
            0
        } else {
            12
        }
    }

    fn email_domain(&self, _email: &str) -> i32 {
        0
    }

    fn bin_country_mismatch(&self, bin_country: &str, billing_country: &str) -> i32 {
        if bin_country.eq_ignore_ascii_case(billing_country) {
            0
        } else {
            18
        }
    }

    fn chargeback_history(&self, _merchant_id: &str, _customer_id: &str) -> i32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_bounds() {
        assert_eq!(clamp_signal(-3), 0);
        assert_eq!(clamp_signal(0), 0);
        assert_eq!(clamp_signal(20), 20);
        assert_eq!(clamp_signal(250), 20);
    }

    #[test]
    fn known_identity_scores_low() {
        let signals = FirstSeenSignals;
        let ips = vec!["10.0.0.1".to_string()];
        let devices = vec!["fp-1".to_string()];
        assert_eq!(signals.ip_velocity("10.0.0.1", &ips), 0);
        assert_eq!(signals.device_reuse("fp-1", &devices), 0);
        assert_eq!(signals.bin_country_mismatch("US", "us"), 0);
    }

    #[test]
    fn unseen_identity_scores_high() {
        let signals = FirstSeenSignals;
        let ips = vec!["10.0.0.1".to_string()];
        let devices = vec!["fp-1".to_string()];
        assert_eq!(signals.ip_velocity("10.9.9.9", &ips), 15);
        assert_eq!(signals.device_reuse("fp-2", &devices), 12);
        assert_eq!(signals.bin_country_mismatch("GB", "US"), 18);
    }
}
