use risk_engine::domain::event::{OrderData, PaymentData};
use risk_engine::domain::score::RiskLevel;
use risk_engine::scoring::signals::{evaluate, SignalProvider};

/// Provider returning fixed raw values, including out-of-range ones.
struct FixedSignals {
    values: [i32; 5],
}

impl SignalProvider for FixedSignals {
    fn ip_velocity(&self, _current_ip: &str, _prior_ips: &[String]) -> i32 {
        self.values[0]
    }
    fn device_reuse(&self, _fingerprint: &str, _known_devices: &[String]) -> i32 {
        self.values[1]
    }
    fn email_domain(&self, _email: &str) -> i32 {
        self.values[2]
    }
    fn bin_country_mismatch(&self, _bin_country: &str, _billing_country: &str) -> i32 {
        self.values[3]
    }
    fn chargeback_history(&self, _merchant_id: &str, _customer_id: &str) -> i32 {
        self.values[4]
    }
}

fn order() -> OrderData {
    OrderData {
        order_id: "ord-1".to_string(),
        txn_id: None,
        merchant_id: "m-1".to_string(),
        customer_id: "c-1".to_string(),
        amt: 99.0,
        currency: "USD".to_string(),
        email: "c@shop.example".to_string(),
        billing_country: "US".to_string(),
        ip_address: "198.51.100.7".to_string(),
        device_fingerprint: "fp-1".to_string(),
        ts: None,
    }
}

fn payment() -> PaymentData {
    PaymentData {
        order_id: "ord-1".to_string(),
        payment_id: "pay-1".to_string(),
        amount: 99.0,
        currency: "USD".to_string(),
        bin_country: "GB".to_string(),
        created_at: "2026-08-01T00:00:00Z".to_string(),
    }
}

#[test]
fn every_signal_is_clamped_to_twenty() {
    let provider = FixedSignals { values: [500, -7, 21, 20, 3] };
    let breakdown = evaluate(&provider, &order(), &payment(), &[], &[]);

    assert_eq!(breakdown.ip_velocity, 20);
    assert_eq!(breakdown.device_reuse, 0);
    assert_eq!(breakdown.email_domain, 20);
    assert_eq!(breakdown.bin_mismatch, 20);
    assert_eq!(breakdown.chargeback_history, 3);
}

#[test]
fn total_is_sum_and_stays_in_range() {
    let provider = FixedSignals { values: [20, 20, 20, 20, 20] };
    let breakdown = evaluate(&provider, &order(), &payment(), &[], &[]);
    assert_eq!(breakdown.total(), 100);
    assert_eq!(RiskLevel::from_total(breakdown.total()), RiskLevel::Critical);

    let provider = FixedSignals { values: [1000, 1000, 1000, 1000, 1000] };
    let breakdown = evaluate(&provider, &order(), &payment(), &[], &[]);
    assert_eq!(breakdown.total(), 100);

    let provider = FixedSignals { values: [-50, -1, 0, -99, -3] };
    let breakdown = evaluate(&provider, &order(), &payment(), &[], &[]);
    assert_eq!(breakdown.total(), 0);
    assert_eq!(RiskLevel::from_total(breakdown.total()), RiskLevel::Low);
}

#[test]
fn identical_inputs_give_identical_breakdowns() {
    let provider = FixedSignals { values: [5, 6, 7, 8, 9] };
    let first = evaluate(&provider, &order(), &payment(), &[], &[]);
    let second = evaluate(&provider, &order(), &payment(), &[], &[]);

    assert_eq!(first.total(), second.total());
    assert_eq!(first.ip_velocity, second.ip_velocity);
    assert_eq!(first.device_reuse, second.device_reuse);
    assert_eq!(first.email_domain, second.email_domain);
    assert_eq!(first.bin_mismatch, second.bin_mismatch);
    assert_eq!(first.chargeback_history, second.chargeback_history);
}
