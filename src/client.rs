use async_trait::async_trait;
use reqwest::Method;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use tokio::sync::{OnceCell, RwLock};
use tracing::{info, warn};

pub use crate::{
    config::FlowConfig,
    models::{FacilitatorInfo, FacilitatorResponse, FlowResult, PaymentRequest},
};
use crate::{
    discovery,
    intent::{StructuredIntent, build_intent},
    signer::{IntentSigner, derive_address, sign_intent, signer_from_key},
    transport::{DefaultFacilitatorTransport, FacilitatorTransport},
};

pub const CREATE_ENDPOINT: &str = "create_payment";
pub const VERIFY_ENDPOINT: &str = "verify";
pub const SETTLE_ENDPOINT: &str = "settle";

/// The status given to a create stage that was served by `/verify`.
pub const VERIFIED_AS_CREATE: &str = "verified-as-create";

const CREATE_SKIPPED: &str = "create failed; skipping verify";
const VERIFY_SKIPPED: &str = "verify failed; skipping settle";

/// An interface to pay through an x402 facilitator.
///
/// None of these operations fail: every outcome, including unreachable facilitators, is reported in the
/// returned value.
#[async_trait]
pub trait PaymentFlowClient: Send + Sync {
    /// Probe `/list` on the active facilitator and refresh the cached info.
    async fn discover_facilitator(&self, timeout: Duration) -> FacilitatorInfo;

    /// POST a payment request to any facilitator endpoint.
    async fn paid_call(&self, endpoint: &str, request: &PaymentRequest, timeout: Duration) -> FacilitatorResponse;

    /// Create a payment intent, falling back to `/verify` when `/create_payment` is missing or rejects the
    /// request.
    async fn create_payment_session(
        &self,
        amount: Decimal,
        currency: &str,
        memo: Option<&str>,
    ) -> FacilitatorResponse;

    /// POST a signed typed-data intent to `/verify`.
    async fn verify_with_signature(&self, amount: Decimal, currency: &str, memo: Option<&str>) -> FacilitatorResponse;

    /// Run create, verify and settle in sequence.
    async fn complete_payment_flow(&self, amount: Decimal, currency: &str, memo: Option<&str>) -> FlowResult;

    /// Create a payment, using `/verify` instead if `/create_payment` does not exist.
    async fn single_payment(&self, amount: Decimal, currency: &str, memo: Option<&str>) -> FacilitatorResponse;
}

/// The default payment flow client.
///
/// The facilitator is probed on first use. If it is unreachable or answers with a server error, the mock
/// facilitator is used for the rest of the client's lifetime.
pub struct DefaultPaymentFlowClient {
    transport: Arc<dyn FacilitatorTransport>,
    signer: Option<Arc<dyn IntentSigner>>,
    wallet_address: Option<String>,
    config: FlowConfig,
    active_url: OnceCell<String>,
    facilitator_info: RwLock<Option<FacilitatorInfo>>,
}

impl DefaultPaymentFlowClient {
    pub fn new(config: FlowConfig) -> Result<Self, reqwest::Error> {
        let transport = DefaultFacilitatorTransport::new()?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Build a client that issues its calls through `transport`.
    pub fn with_transport(config: FlowConfig, transport: Arc<dyn FacilitatorTransport>) -> Self {
        let private_key = config.private_key.as_deref();
        let wallet_address = derive_address(private_key).map(|address| address.to_string());
        let signer = private_key
            .and_then(|key| signer_from_key(key).ok())
            .map(|signer| Arc::new(signer) as Arc<dyn IntentSigner>);
        Self {
            transport,
            signer,
            wallet_address,
            config,
            active_url: OnceCell::new(),
            facilitator_info: RwLock::new(None),
        }
    }

    /// Sign intents with `signer` and pay from its address.
    pub fn with_signer(mut self, signer: Arc<dyn IntentSigner>) -> Self {
        self.wallet_address = Some(signer.address().to_string());
        self.signer = Some(signer);
        self
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn wallet_address(&self) -> Option<&str> {
        self.wallet_address.as_deref()
    }

    /// The facilitator every call goes to, probing it first if needed.
    pub async fn facilitator_url(&self) -> &str {
        self.active_url().await
    }

    /// The last `/list` result, if a probe has run.
    pub async fn facilitator_info(&self) -> Option<FacilitatorInfo> {
        self.facilitator_info.read().await.clone()
    }

    async fn active_url(&self) -> &str {
        self.active_url
            .get_or_init(|| async {
                let resolution = discovery::resolve(
                    self.transport.as_ref(),
                    &self.config.facilitator_url,
                    &self.config.mock_facilitator_url,
                    self.config.probe_timeout,
                    self.config.discovery_timeout,
                )
                .await;
                if resolution.fell_back {
                    info!("Using fallback facilitator {} for this session", resolution.base_url);
                }
                *self.facilitator_info.write().await = Some(resolution.info);
                resolution.base_url
            })
            .await
    }

    fn build_request(&self, amount: Decimal, currency: &str, memo: Option<&str>) -> PaymentRequest {
        PaymentRequest::new(amount, currency)
            .with_memo(memo)
            .with_from_address(self.wallet_address.clone())
            .with_network(self.config.network.clone())
    }

    fn build_intent(&self, amount: Decimal, currency: &str, memo: Option<&str>) -> StructuredIntent {
        build_intent(
            self.wallet_address.as_deref(),
            amount,
            currency,
            memo,
            self.config.network.as_deref(),
            self.config.merchant_address.as_deref(),
        )
    }

    /// Try the signed verify after a plain verify failed.
    ///
    /// The signed result replaces `verify` only if it succeeded; otherwise both attempts are kept in the
    /// diagnostics of `verify`.
    async fn verify_with_signature_fallback(
        &self,
        mut verify: FacilitatorResponse,
        create: Option<&FacilitatorResponse>,
        amount: Decimal,
        currency: &str,
        memo: Option<&str>,
    ) -> FacilitatorResponse {
        info!("Simple verify returned {}; attempting verify_with_signature fallback", verify.status_code);
        let signed = self.verify_with_signature(amount, currency, memo).await;
        if signed.is_success() {
            return signed;
        }
        if let Some(create) = create {
            verify.insert_diagnostic("create_response", create);
        }
        verify.insert_diagnostic("signature_attempt", &signed);
        verify
    }
}

#[async_trait]
impl PaymentFlowClient for DefaultPaymentFlowClient {
    async fn discover_facilitator(&self, timeout: Duration) -> FacilitatorInfo {
        let base_url = self.active_url().await;
        let info = discovery::probe(self.transport.as_ref(), base_url, timeout).await;
        *self.facilitator_info.write().await = Some(info.clone());
        info
    }

    async fn paid_call(&self, endpoint: &str, request: &PaymentRequest, timeout: Duration) -> FacilitatorResponse {
        let base_url = self.active_url().await;
        let body = request.to_json();
        let mut response = self.transport.call(base_url, endpoint, Method::POST, Some(&body), timeout).await;
        if !response.is_success() && response.request_body.is_none() {
            response.request_body = Some(body);
        }
        response
    }

    async fn create_payment_session(
        &self,
        amount: Decimal,
        currency: &str,
        memo: Option<&str>,
    ) -> FacilitatorResponse {
        let timeout = self.config.timeout;
        let request = self.build_request(amount, currency, memo);
        let mut create = self.paid_call(CREATE_ENDPOINT, &request, timeout).await;

        match create.status_code {
            404 => {
                info!("Facilitator returned 404 for /{CREATE_ENDPOINT}; falling back to /{VERIFY_ENDPOINT}");
                let verify = self.paid_call(VERIFY_ENDPOINT, &request, timeout).await;
                if verify.is_success() { verified_as_create(verify) } else { verify }
            }
            400 => {
                warn!("create_payment returned 400: {}; attempting /{VERIFY_ENDPOINT} anyway", create.body);
                // Observed behavior: this verify result is not used to advance the flow.
                let verify = self.paid_call(VERIFY_ENDPOINT, &request, timeout).await;
                let info = self.discover_facilitator(self.config.discovery_timeout).await;
                create.insert_diagnostic("note", "create_payment returned 400; see response_text and request_body");
                create.insert_diagnostic("verify_attempt", &verify);
                create.insert_diagnostic("facilitator_list", &info);
                create
            }
            _ => create,
        }
    }

    async fn verify_with_signature(&self, amount: Decimal, currency: &str, memo: Option<&str>) -> FacilitatorResponse {
        let eip712 = self.build_intent(amount, currency, memo);
        let signature = sign_intent(&eip712, self.signer.as_deref());
        let request = SignedVerifyRequest {
            eip712,
            signature,
            from_address: self.wallet_address.clone(),
            network: self.config.network.clone(),
        };
        let body = serde_json::to_value(&request).unwrap_or_default();

        let base_url = self.active_url().await;
        let mut response =
            self.transport.call(base_url, VERIFY_ENDPOINT, Method::POST, Some(&body), self.config.timeout).await;
        response.request_body = Some(body);
        response
    }

    async fn complete_payment_flow(&self, amount: Decimal, currency: &str, memo: Option<&str>) -> FlowResult {
        let timeout = self.config.timeout;
        let request = self.build_request(amount, currency, memo);
        let create = self.create_payment_session(amount, currency, memo).await;

        let verify = if create.is_success() {
            let verify = self.paid_call(VERIFY_ENDPOINT, &request, timeout).await;
            if matches!(verify.status_code, 400 | 404) {
                self.verify_with_signature_fallback(verify, None, amount, currency, memo).await
            } else {
                verify
            }
        } else if matches!(create.status_code, 400 | 404) {
            info!("create returned status {}; attempting verify fallback", create.status_code);
            let mut verify = self.paid_call(VERIFY_ENDPOINT, &request, timeout).await;
            if verify.is_success() {
                verify.insert_diagnostic("create_response", &create);
                verify
            } else {
                self.verify_with_signature_fallback(verify, Some(&create), amount, currency, memo).await
            }
        } else {
            FacilitatorResponse::skipped(CREATE_SKIPPED)
        };

        let settle = if verify.is_success() {
            self.paid_call(SETTLE_ENDPOINT, &request, timeout).await
        } else if matches!(verify.status_code, 400 | 404) {
            info!("verify returned status {}; attempting settle as a last resort", verify.status_code);
            let mut settle = self.paid_call(SETTLE_ENDPOINT, &request, timeout).await;
            settle.insert_diagnostic("verify_response", &verify);
            settle
        } else {
            FacilitatorResponse::skipped(VERIFY_SKIPPED)
        };

        info!(
            "Payment flow finished: create={}, verify={}, settle={}",
            create.status_code, verify.status_code, settle.status_code
        );
        FlowResult { create, verify, settle }
    }

    async fn single_payment(&self, amount: Decimal, currency: &str, memo: Option<&str>) -> FacilitatorResponse {
        let timeout = self.config.timeout;
        let request = self.build_request(amount, currency, memo);
        let create = self.paid_call(CREATE_ENDPOINT, &request, timeout).await;
        if create.status_code == 404 {
            info!("Facilitator returned 404 for /{CREATE_ENDPOINT}; using /{VERIFY_ENDPOINT}");
            return self.paid_call(VERIFY_ENDPOINT, &request, timeout).await;
        }
        create
    }
}

/// The body of the signed `/verify` fallback.
#[derive(Serialize)]
struct SignedVerifyRequest {
    eip712: StructuredIntent,
    signature: Option<String>,
    from_address: Option<String>,
    network: Option<String>,
}

/// Relabel a successful `/verify` answer as the result of the create stage.
///
/// A missing or blank `id` (null, `""`, `0`, `false` or empty) is replaced by the whole body.
fn verified_as_create(verify: FacilitatorResponse) -> FacilitatorResponse {
    let body = &verify.body;
    let id = body.get("id").filter(|id| !is_blank(id)).cloned().unwrap_or_else(|| body.clone());
    let received = body.get("received").cloned().unwrap_or_else(|| body.clone());
    FacilitatorResponse {
        status_code: verify.status_code,
        body: json!({ "id": id, "status": VERIFIED_AS_CREATE, "received": received }),
        headers: verify.headers,
        ..Default::default()
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verified(body: Value) -> Value {
        verified_as_create(FacilitatorResponse { status_code: 200, body, ..Default::default() }).body
    }

    #[test]
    fn verify_id_becomes_create_id() {
        let body = verified(json!({ "id": "intent_1", "received": { "amount": 0.01 } }));
        assert_eq!(body, json!({ "id": "intent_1", "status": VERIFIED_AS_CREATE, "received": { "amount": 0.01 } }));
    }

    #[test]
    fn blank_id_is_replaced_by_body() {
        for id in [json!(null), json!(""), json!(0), json!(false)] {
            let answer = json!({ "id": id, "isValid": true });
            let body = verified(answer.clone());
            assert_eq!(body["id"], answer);
            assert_eq!(body["received"], answer);
        }
    }

    #[test]
    fn explicit_null_received_is_kept() {
        let body = verified(json!({ "id": "intent_1", "received": null }));
        assert_eq!(body["received"], Value::Null);
    }
}
