use base64::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// The header a facilitator may use to return a settlement reference.
pub const PAYMENT_RESPONSE_HEADER: &str = "X-PAYMENT-RESPONSE";

/// The request body sent to `/create_payment`, `/verify` and `/settle`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// The amount to pay.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    /// The currency code, e.g. `USD`.
    pub currency: String,

    /// Free-form metadata, currently only a memo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PaymentMetadata>,

    /// The paying wallet, if one is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_address: Option<String>,

    /// The network identifier, if one is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

impl PaymentRequest {
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self { amount, currency: currency.into(), metadata: None, from_address: None, network: None }
    }

    /// Attach a memo. Empty memos are dropped.
    pub fn with_memo(mut self, memo: Option<&str>) -> Self {
        self.metadata = memo.filter(|m| !m.is_empty()).map(|memo| PaymentMetadata { memo: memo.to_string() });
        self
    }

    pub fn with_from_address(mut self, from_address: Option<String>) -> Self {
        self.from_address = from_address;
        self
    }

    pub fn with_network(mut self, network: Option<String>) -> Self {
        self.network = network;
        self
    }

    /// The memo carried in the metadata, if any.
    pub fn memo(&self) -> Option<&str> {
        self.metadata.as_ref().map(|m| m.memo.as_str())
    }

    pub(crate) fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Metadata attached to a payment request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentMetadata {
    /// A human readable memo.
    pub memo: String,
}

/// The outcome of a single facilitator call.
///
/// Every call produces one of these, including calls that never reached the facilitator: those carry
/// a `status_code` of 0 and an `error`. HTTP error statuses are kept as-is.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FacilitatorResponse {
    /// The HTTP status, or 0 if the request failed before a response was received.
    pub status_code: u16,

    /// The parsed JSON body, or `{"text": <raw body>}` if the body was not JSON.
    #[serde(default, alias = "payload")]
    pub body: Value,

    /// The response headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// The transport error or skip reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// The body that was sent, echoed back on failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,

    /// Additional context attached by the flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Map<String, Value>>,
}

impl FacilitatorResponse {
    /// A response for a call that never got an HTTP response.
    pub fn transport_error(error: impl Into<String>) -> Self {
        Self { error: Some(error.into()), ..Default::default() }
    }

    /// The marker left in a stage that was not attempted.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::transport_error(reason)
    }

    pub fn with_request_body(mut self, request_body: Option<Value>) -> Self {
        self.request_body = request_body;
        self
    }

    /// Whether the facilitator answered with a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Look up a header regardless of the case of its name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, value)| value.as_str())
    }

    /// The decoded `X-PAYMENT-RESPONSE` header, if present.
    pub fn payment_response(&self) -> Option<Value> {
        self.header(PAYMENT_RESPONSE_HEADER).map(decode_payment_response)
    }

    pub fn insert_diagnostic(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.diagnostics.get_or_insert_with(Map::new).insert(key.into(), value.into());
    }

    pub fn diagnostic(&self, key: &str) -> Option<&Value> {
        self.diagnostics.as_ref().and_then(|d| d.get(key))
    }
}

impl From<&FacilitatorResponse> for Value {
    fn from(response: &FacilitatorResponse) -> Self {
        serde_json::to_value(response).unwrap_or_default()
    }
}

/// The result of one create, verify and settle attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowResult {
    pub create: FacilitatorResponse,
    pub verify: FacilitatorResponse,
    pub settle: FacilitatorResponse,
}

impl FlowResult {
    /// Whether the payment was verified and settled, whatever happened at create.
    pub fn is_settled(&self) -> bool {
        self.verify.is_success() && self.settle.is_success()
    }
}

/// What a facilitator reported on `/list`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FacilitatorInfo {
    /// The HTTP status, or 0 if the facilitator could not be reached.
    pub status_code: u16,

    /// The parsed `/list` body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    /// The response headers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// The transport error, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FacilitatorInfo {
    /// Whether the facilitator is unreachable or failing with a server error.
    pub fn is_unusable(&self) -> bool {
        self.status_code == 0 || self.status_code >= 500
    }
}

impl From<FacilitatorResponse> for FacilitatorInfo {
    fn from(response: FacilitatorResponse) -> Self {
        if response.status_code == 0 {
            return Self { error: response.error, ..Default::default() };
        }
        Self { status_code: response.status_code, payload: Some(response.body), headers: response.headers, error: None }
    }
}

impl From<&FacilitatorInfo> for Value {
    fn from(info: &FacilitatorInfo) -> Self {
        serde_json::to_value(info).unwrap_or_default()
    }
}

/// Decode an `X-PAYMENT-RESPONSE` header value.
///
/// The value is tried as JSON, then as base64 encoded JSON. Anything else is returned as
/// `{"transaction": <raw value>}`.
pub fn decode_payment_response(header_value: &str) -> Value {
    let trimmed = header_value.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return value;
    }
    if let Ok(bytes) = BASE64_STANDARD.decode(trimmed)
        && let Ok(value) = serde_json::from_slice(&bytes)
    {
        return value;
    }
    json!({ "transaction": header_value })
}

/// Pick one of the payment requirements a 402 answer `accepts`.
///
/// Without a network every entry qualifies. Otherwise the first entry on that network wins, and the first
/// entry is used if none matches.
pub fn select_requirements<'a>(accepts: &'a [Value], network: Option<&str>) -> Option<&'a Value> {
    let first = accepts.first()?;
    let Some(network) = network else {
        return Some(first);
    };
    accepts
        .iter()
        .find(|requirement| requirement.get("network").and_then(Value::as_str) == Some(network))
        .or(Some(first))
}
