//! Liveness probing of a facilitator through its `/list` endpoint.

use reqwest::Method;
use std::time::Duration;
use tracing::{info, warn};

use crate::{models::FacilitatorInfo, transport::FacilitatorTransport};

/// The endpoint used to check that a facilitator is alive.
pub const LIST_ENDPOINT: &str = "list";

/// Call `GET {base_url}/list` and summarize the answer.
pub async fn probe(transport: &dyn FacilitatorTransport, base_url: &str, timeout: Duration) -> FacilitatorInfo {
    transport.call(base_url, LIST_ENDPOINT, Method::GET, None, timeout).await.into()
}

/// The facilitator picked for a session and the last thing it reported.
#[derive(Clone, Debug)]
pub struct Resolution {
    /// The base URL every call in the session goes to.
    pub base_url: String,

    /// The most recent probe result.
    pub info: FacilitatorInfo,

    /// Whether the primary facilitator was swapped for the mock.
    pub fell_back: bool,
}

/// Probe the primary facilitator and swap in `mock_url` if it is unusable.
///
/// After a swap the mock is probed once more with `refresh_timeout`. That probe is informational: its
/// result is kept for diagnostics even when it fails.
pub async fn resolve(
    transport: &dyn FacilitatorTransport,
    primary_url: &str,
    mock_url: &str,
    probe_timeout: Duration,
    refresh_timeout: Duration,
) -> Resolution {
    let info = probe(transport, primary_url, probe_timeout).await;
    if !info.is_unusable() {
        return Resolution { base_url: primary_url.to_string(), info, fell_back: false };
    }

    warn!(
        "Facilitator {primary_url} unreachable or returned {}; falling back to {mock_url}",
        info.status_code
    );
    let info = probe(transport, mock_url, refresh_timeout).await;
    if info.is_unusable() {
        info!("Fallback facilitator {mock_url} did not answer /list either: {:?}", info.error);
    }
    Resolution { base_url: mock_url.to_string(), info, fell_back: true }
}
