#![allow(dead_code)]

use alloy_primitives::{Address, B256, Signature};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use x402_flow_client::{
    FacilitatorResponse, FacilitatorTransport, IntentSigner, signer::signer_from_key, transport::make_url,
};

pub const PRIMARY: &str = "https://facilitator.example";
pub const MOCK: &str = "http://127.0.0.1:8000";

// Hardhat account #0, publicly known.
pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// A request seen by [`ScriptedTransport`].
#[derive(Clone, Debug)]
pub struct Call {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

/// A transport answering from a script instead of the network.
///
/// Each URL has a queue of responses. The last response of a queue is repeated once the others are
/// used up. Unscripted URLs answer 404.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<FacilitatorResponse>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, base_url: &str, endpoint: &str, response: FacilitatorResponse) -> Self {
        self.routes.lock().unwrap().entry(make_url(base_url, endpoint)).or_default().push_back(response);
        self
    }

    /// Script a healthy facilitator at `base_url` answering 200 on every endpoint.
    pub fn healthy(self, base_url: &str, settle_body: Value) -> Self {
        self.on(base_url, "list", ok(serde_json::json!({ "kinds": [] })))
            .on(base_url, "create_payment", ok(serde_json::json!({ "id": "pay_1", "status": "created" })))
            .on(base_url, "verify", ok(serde_json::json!({ "id": "pay_1", "status": "verified" })))
            .on(base_url, "settle", ok(settle_body))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, base_url: &str, endpoint: &str) -> Vec<Call> {
        let url = make_url(base_url, endpoint);
        self.calls().into_iter().filter(|call| call.url == url).collect()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.url).collect()
    }
}

#[async_trait]
impl FacilitatorTransport for ScriptedTransport {
    async fn call(
        &self,
        base_url: &str,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
        _timeout: Duration,
    ) -> FacilitatorResponse {
        let url = make_url(base_url, endpoint);
        self.calls.lock().unwrap().push(Call { method, url: url.clone(), body: body.cloned() });

        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => status(404, serde_json::json!({ "detail": "Not Found" })),
        }
    }
}

pub fn status(status_code: u16, body: Value) -> FacilitatorResponse {
    FacilitatorResponse { status_code, body, ..Default::default() }
}

pub fn ok(body: Value) -> FacilitatorResponse {
    status(200, body)
}

/// A signer that counts how often it is asked to sign.
pub struct CountingSigner {
    inner: PrivateKeySigner,
    signatures: AtomicUsize,
}

impl CountingSigner {
    pub fn new() -> Self {
        Self { inner: signer_from_key(TEST_KEY).unwrap(), signatures: AtomicUsize::new(0) }
    }

    pub fn signatures(&self) -> usize {
        self.signatures.load(Ordering::SeqCst)
    }
}

impl IntentSigner for CountingSigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    fn sign_hash(&self, hash: &B256) -> Result<Signature, alloy_signer::Error> {
        self.signatures.fetch_add(1, Ordering::SeqCst);
        self.inner.sign_hash_sync(hash)
    }
}
