//! The low-level HTTP call wrapper used for every facilitator request.

use async_trait::async_trait;
use reqwest::{Method, Response, header::HeaderMap};
use serde_json::{Value, json};
use std::{collections::BTreeMap, time::Duration};
use tracing::{debug, warn};

use crate::models::FacilitatorResponse;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Issues a single request against a facilitator.
///
/// Implementations never fail: transport problems are reported as a [`FacilitatorResponse`] with a
/// `status_code` of 0.
#[async_trait]
pub trait FacilitatorTransport: Send + Sync {
    /// Call `endpoint` on the facilitator at `base_url`, sending `body` as JSON if present.
    async fn call(
        &self,
        base_url: &str,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
        timeout: Duration,
    ) -> FacilitatorResponse;
}

/// The default transport that hits the facilitator over HTTP.
#[derive(Clone, Debug)]
pub struct DefaultFacilitatorTransport {
    client: reqwest::Client,
}

impl DefaultFacilitatorTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client })
    }

    /// Use an already configured `reqwest` client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn parse_response(response: Response, request_body: Option<&Value>) -> FacilitatorResponse {
        let status_code = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to read facilitator response body: {e}");
                return FacilitatorResponse::transport_error(e.to_string()).with_request_body(request_body.cloned());
            }
        };
        let body = serde_json::from_str(&text).unwrap_or_else(|_| json!({ "text": text }));
        let mut result = FacilitatorResponse { status_code, body, headers, ..Default::default() };
        if !result.is_success() {
            result.request_body = request_body.cloned();
            result.insert_diagnostic("response_text", text);
        }
        result
    }
}

/// Join a facilitator base URL and an endpoint with exactly one slash.
pub fn make_url(base_url: &str, endpoint: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    let endpoint = endpoint.trim_start_matches('/');
    format!("{base_url}/{endpoint}")
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
        .collect()
}

#[async_trait]
impl FacilitatorTransport for DefaultFacilitatorTransport {
    async fn call(
        &self,
        base_url: &str,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
        timeout: Duration,
    ) -> FacilitatorResponse {
        let url = make_url(base_url, endpoint);
        debug!("Calling facilitator: {method} {url}");

        let mut request = self.client.request(method, &url).timeout(timeout);
        if let Some(body) = body {
            request = request.json(body);
        }
        match request.send().await {
            Ok(response) => Self::parse_response(response, body).await,
            Err(e) => {
                warn!("Facilitator call to {url} failed: {e}");
                FacilitatorResponse::transport_error(e.to_string()).with_request_body(body.cloned())
            }
        }
    }
}
