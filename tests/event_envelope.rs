use risk_engine::domain::event::{DisputeReasonCode, EventKind, EventPayload, IngestEvent};
use serde_json::json;

#[test]
fn order_event_round_trips_wire_names() {
    let wire = json!({
        "id": "evt-100",
        "source": "orders-service",
        "type": "order.created",
        "specversion": "1.0",
        "time": "2026-08-01T10:00:00Z",
        "correlationId": "corr-100",
        "data": {
            "order_id": "ord-100",
            "txn_id": "txn-9",
            "merchant_id": "m-100",
            "customer_id": "c-100",
            "amt": 250.0,
            "currency": "EUR",
            "email": "a@b.example",
            "billing_country": "DE",
            "ip_address": "192.0.2.10",
            "device_fingerprint": "fp-x",
            "ts": 1754042400
        }
    });

    let event: IngestEvent = serde_json::from_value(wire.clone()).unwrap();
    assert_eq!(event.correlation_id, "corr-100");
    assert_eq!(event.payload.kind(), EventKind::OrderCreated);
    assert_eq!(event.payload.event_type(), "order.created");

    let back = serde_json::to_value(&event).unwrap();
    assert_eq!(back, wire);
}

#[test]
fn payment_event_uses_camel_case_data_fields() {
    let wire = json!({
        "id": "evt-200",
        "source": "payments-service",
        "type": "payment.authorized",
        "specversion": "1.0",
        "correlationId": "corr-100",
        "data": {
            "orderId": "ord-100",
            "paymentId": "pay-1",
            "amount": 250.0,
            "currency": "EUR",
            "binCountry": "FR",
            "createdAt": "2026-08-01T10:00:05Z"
        }
    });

    let event: IngestEvent = serde_json::from_value(wire.clone()).unwrap();
    match &event.payload {
        EventPayload::PaymentAuthorized { data } => {
            assert_eq!(data.order_id, "ord-100");
            assert_eq!(data.bin_country, "FR");
        }
        other => panic!("wrong kind: {other:?}"),
    }

    let back = serde_json::to_value(&event).unwrap();
    assert_eq!(back, wire);
}

#[test]
fn dispute_reason_codes_are_screaming_snake_case() {
    let wire = json!({
        "id": "evt-300",
        "source": "disputes-service",
        "type": "dispute.opened",
        "specversion": "1.0",
        "correlationId": "corr-100",
        "data": {
            "order_id": "ord-100",
            "reason_code": "FRAUD",
            "amt": 250.0,
            "openedAt": "2026-08-02T08:00:00Z"
        }
    });

    let event: IngestEvent = serde_json::from_value(wire.clone()).unwrap();
    match &event.payload {
        EventPayload::DisputeOpened { data } => {
            assert_eq!(data.reason_code, DisputeReasonCode::Fraud);
            assert_eq!(data.reason_code.as_str(), "FRAUD");
        }
        other => panic!("wrong kind: {other:?}"),
    }

    let back = serde_json::to_value(&event).unwrap();
    assert_eq!(back, wire);
}

#[test]
fn unknown_event_type_fails_to_parse() {
    let wire = json!({
        "id": "evt-400",
        "source": "refunds-service",
        "type": "refund.issued",
        "specversion": "1.0",
        "correlationId": "corr-100",
        "data": {}
    });

    assert!(serde_json::from_value::<IngestEvent>(wire).is_err());
}
