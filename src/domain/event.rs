use serde::{Deserialize, Serialize};
use serde_json::json;

/// Event-bus envelope shared by all three streams. Wire field names follow
/// the producers' CloudEvents-style contract and must not change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestEvent {
    pub id: String,
    pub source: String,
    pub specversion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(rename = "correlationId")]
    pub correlation_id: String,
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// Closed set of event kinds, discriminated by the envelope `type` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventPayload {
    #[serde(rename = "order.created")]
    OrderCreated { data: OrderData },
    #[serde(rename = "payment.authorized")]
    PaymentAuthorized { data: PaymentData },
    #[serde(rename = "dispute.opened")]
    DisputeOpened { data: DisputeData },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    OrderCreated,
    PaymentAuthorized,
    DisputeOpened,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::OrderCreated => "order.created",
            EventKind::PaymentAuthorized => "payment.authorized",
            EventKind::DisputeOpened => "dispute.opened",
        }
    }
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::OrderCreated { .. } => EventKind::OrderCreated,
            EventPayload::PaymentAuthorized { .. } => EventKind::PaymentAuthorized,
            EventPayload::DisputeOpened { .. } => EventKind::DisputeOpened,
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.kind().as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderData {
    pub order_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txn_id: Option<String>,
    pub merchant_id: String,
    pub customer_id: String,
    pub amt: f64,
    pub currency: String,
    pub email: String,
    pub billing_country: String,
    pub ip_address: String,
    pub device_fingerprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentData {
    pub order_id: String,
    pub payment_id: String,
    pub amount: f64,
    pub currency: String,
    pub bin_country: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeData {
    pub order_id: String,
    pub reason_code: DisputeReasonCode,
    pub amt: f64,
    #[serde(rename = "openedAt")]
    pub opened_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeReasonCode {
    Fraud,
    NotReceived,
    Duplicate,
}

impl DisputeReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeReasonCode::Fraud => "FRAUD",
            DisputeReasonCode::NotReceived => "NOT_RECEIVED",
            DisputeReasonCode::Duplicate => "DUPLICATE",
        }
    }
}

impl IngestEvent {
    /// Lean per-kind summary pushed with the `event.received` broadcast.
    pub fn summary(&self) -> serde_json::Value {
        match &self.payload {
            EventPayload::OrderCreated { data } => json!({
                "orderId": data.order_id,
                "merchantId": data.merchant_id,
                "customerId": data.customer_id,
                "amount": data.amt,
                "currency": data.currency,
                "email": data.email,
                "billingCountry": data.billing_country,
            }),
            EventPayload::PaymentAuthorized { data } => json!({
                "orderId": data.order_id,
                "paymentId": data.payment_id,
                "amount": data.amount,
                "binCountry": data.bin_country,
            }),
            EventPayload::DisputeOpened { data } => json!({
                "orderId": data.order_id,
                "reasonCode": data.reason_code,
                "amount": data.amt,
            }),
        }
    }
}
