use crate::config::AppConfig;
use crate::domain::event::{EventKind, EventPayload, IngestEvent};

/// A message that passed schema validation. `raw` keeps the original parsed
/// JSON so the durable log stores exactly what arrived on the wire.
#[derive(Debug, Clone)]
pub struct ValidEvent {
    pub event: IngestEvent,
    pub raw: serde_json::Value,
}

#[derive(Debug)]
pub enum ValidationError {
    /// Not JSON at all. Dropped with a warning.
    Malformed(serde_json::Error),
    /// Topic has no registered event kind. Dropped silently.
    UnknownTopic,
    /// Parsed but failed the schema for its kind. Dropped with diagnostics.
    Schema(Vec<String>),
}

#[derive(Clone)]
pub struct EventValidator {
    orders_topic: String,
    payments_topic: String,
    disputes_topic: String,
}

impl EventValidator {
    pub fn new(cfg: &AppConfig) -> Self {
        Self {
            orders_topic: cfg.orders_stream.clone(),
            payments_topic: cfg.payments_stream.clone(),
            disputes_topic: cfg.disputes_stream.clone(),
        }
    }

    pub fn kind_for_topic(&self, topic: &str) -> Option<EventKind> {
        if topic == self.orders_topic {
            Some(EventKind::OrderCreated)
        } else if topic == self.payments_topic {
            Some(EventKind::PaymentAuthorized)
        } else if topic == self.disputes_topic {
            Some(EventKind::DisputeOpened)
        } else {
            None
        }
    }

    pub fn validate(&self, topic: &str, raw: &str) -> Result<ValidEvent, ValidationError> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(ValidationError::Malformed)?;

        let expected = self.kind_for_topic(topic).ok_or(ValidationError::UnknownTopic)?;

        let event: IngestEvent = serde_json::from_value(value.clone())
            .map_err(|e| ValidationError::Schema(vec![e.to_string()]))?;

        let mut problems = Vec::new();
        check_envelope(&event, expected, &mut problems);
        match &event.payload {
            EventPayload::OrderCreated { data } => {
                require(&data.order_id, "data.order_id", &mut problems);
                require(&data.merchant_id, "data.merchant_id", &mut problems);
                require(&data.customer_id, "data.customer_id", &mut problems);
                require(&data.ip_address, "data.ip_address", &mut problems);
                require(&data.device_fingerprint, "data.device_fingerprint", &mut problems);
                check_amount(data.amt, "data.amt", &mut problems);
                check_currency(&data.currency, "data.currency", &mut problems);
                check_country(&data.billing_country, "data.billing_country", &mut problems);
                check_email(&data.email, "data.email", &mut problems);
            }
            EventPayload::PaymentAuthorized { data } => {
                require(&data.order_id, "data.orderId", &mut problems);
                require(&data.payment_id, "data.paymentId", &mut problems);
                check_amount(data.amount, "data.amount", &mut problems);
                check_currency(&data.currency, "data.currency", &mut problems);
                check_country(&data.bin_country, "data.binCountry", &mut problems);
            }
            EventPayload::DisputeOpened { data } => {
                require(&data.order_id, "data.order_id", &mut problems);
                check_amount(data.amt, "data.amt", &mut problems);
            }
        }

        if problems.is_empty() {
            Ok(ValidEvent { event, raw: value })
        } else {
            Err(ValidationError::Schema(problems))
        }
    }
}

fn check_envelope(event: &IngestEvent, expected: EventKind, problems: &mut Vec<String>) {
    if event.id.is_empty() {
        problems.push("id: must not be empty".to_string());
    }
    if event.correlation_id.is_empty() {
        problems.push("correlationId: must not be empty".to_string());
    }
    if event.specversion != "1.0" {
        problems.push(format!("specversion: expected \"1.0\", got \"{}\"", event.specversion));
    }
    let actual = event.payload.kind();
    if actual != expected {
        problems.push(format!(
            "type: {} not allowed on this topic (expected {})",
            actual.as_str(),
            expected.as_str()
        ));
    }
}

fn require(value: &str, field: &str, problems: &mut Vec<String>) {
    if value.is_empty() {
        problems.push(format!("{field}: must not be empty"));
    }
}

fn check_amount(value: f64, field: &str, problems: &mut Vec<String>) {
    if !(value > 0.0) {
        problems.push(format!("{field}: must be positive, got {value}"));
    }
}

fn check_currency(value: &str, field: &str, problems: &mut Vec<String>) {
    if value.len() != 3 {
        problems.push(format!("{field}: must be a 3-letter code, got \"{value}\""));
    }
}

fn check_country(value: &str, field: &str, problems: &mut Vec<String>) {
    if value.len() != 2 {
        problems.push(format!("{field}: must be a 2-letter code, got \"{value}\""));
    }
}

fn check_email(value: &str, field: &str, problems: &mut Vec<String>) {
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ => problems.push(format!("{field}: not a valid email address")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::DisputeReasonCode;
    use serde_json::json;

    fn validator() -> EventValidator {
        EventValidator {
            orders_topic: "orders.v1".to_string(),
            payments_topic: "payments.v1".to_string(),
            disputes_topic: "disputes.v1".to_string(),
        }
    }

    fn order_json() -> serde_json::Value {
        json!({
            "id": "evt-1",
            "source": "orders-service",
            "type": "order.created",
            "specversion": "1.0",
            "correlationId": "corr-1",
            "data": {
                "order_id": "ord-1",
                "merchant_id": "m-1",
                "customer_id": "c-1",
                "amt": 129.99,
                "currency": "USD",
                "email": "jo@shop.example.com",
                "billing_country": "US",
                "ip_address": "10.1.2.3",
                "device_fingerprint": "fp-abc"
            }
        })
    }

    #[test]
    fn accepts_a_valid_order_event() {
        let raw = order_json().to_string();
        let valid = validator().validate("orders.v1", &raw).unwrap();
        assert_eq!(valid.event.id, "evt-1");
        assert_eq!(valid.event.correlation_id, "corr-1");
        assert_eq!(valid.event.payload.kind(), EventKind::OrderCreated);
    }

    #[test]
    fn accepts_a_valid_dispute_event() {
        let raw = json!({
            "id": "evt-9",
            "source": "disputes-service",
            "type": "dispute.opened",
            "specversion": "1.0",
            "correlationId": "corr-9",
            "data": {
                "order_id": "ord-9",
                "reason_code": "NOT_RECEIVED",
                "amt": 42.0,
                "openedAt": "2026-08-01T00:00:00Z"
            }
        })
        .to_string();
        let valid = validator().validate("disputes.v1", &raw).unwrap();
        match &valid.event.payload {
            EventPayload::DisputeOpened { data } => {
                assert_eq!(data.reason_code, DisputeReasonCode::NotReceived);
            }
            other => panic!("wrong kind: {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_json() {
        let err = validator().validate("orders.v1", "{not json").unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
    }

    #[test]
    fn drops_unknown_topics() {
        let raw = order_json().to_string();
        let err = validator().validate("refunds.v1", &raw).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownTopic));
    }

    #[test]
    fn rejects_kind_on_wrong_topic() {
        let raw = order_json().to_string();
        let err = validator().validate("payments.v1", &raw).unwrap_err();
        match err {
            ValidationError::Schema(problems) => {
                assert!(problems.iter().any(|p| p.starts_with("type:")), "{problems:?}");
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn reports_field_level_diagnostics() {
        let mut event = order_json();
        event["data"]["amt"] = json!(-5.0);
        event["data"]["currency"] = json!("DOLLARS");
        event["data"]["email"] = json!("not-an-email");
        let err = validator().validate("orders.v1", &event.to_string()).unwrap_err();
        match err {
            ValidationError::Schema(problems) => {
                assert_eq!(problems.len(), 3, "{problems:?}");
                assert!(problems.iter().any(|p| p.contains("data.amt")));
                assert!(problems.iter().any(|p| p.contains("data.currency")));
                assert!(problems.iter().any(|p| p.contains("data.email")));
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_reason_code() {
        let raw = json!({
            "id": "evt-9",
            "source": "disputes-service",
            "type": "dispute.opened",
            "specversion": "1.0",
            "correlationId": "corr-9",
            "data": {
                "order_id": "ord-9",
                "reason_code": "BUYER_REMORSE",
                "amt": 42.0,
                "openedAt": "2026-08-01T00:00:00Z"
            }
        })
        .to_string();
        let err = validator().validate("disputes.v1", &raw).unwrap_err();
        assert!(matches!(err, ValidationError::Schema(_)));
    }
}
