//! The pass/block decision a resource server makes before serving a paid route.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::GatewayError;

/// The status a blocked request is answered with.
pub const PAYMENT_REQUIRED_STATUS: u16 = 402;

/// The header a client sets to mark a request as already paid.
pub const PAYMENT_MARKER_HEADER: &str = "X-MOCK-PAYED";

/// A route a payment gate applies to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoutePattern {
    /// Matches one path exactly.
    Exact(String),

    /// Matches every path starting with the prefix, written as `/prefix/*`.
    Prefix(String),
}

impl RoutePattern {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(expected) => path == expected,
            Self::Prefix(prefix) => path.starts_with(prefix.as_str()),
        }
    }
}

impl FromStr for RoutePattern {
    type Err = GatewayError;

    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(GatewayError::EmptyPattern);
        }
        if !pattern.starts_with('/') {
            return Err(GatewayError::RelativePattern(pattern.to_string()));
        }
        match pattern.strip_suffix("/*") {
            Some(prefix) => Ok(Self::Prefix(format!("{prefix}/"))),
            None => Ok(Self::Exact(pattern.to_string())),
        }
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(path) => write!(f, "{path}"),
            Self::Prefix(prefix) => write!(f, "{prefix}*"),
        }
    }
}

/// The JSON body of a 402 answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequiredBody {
    /// Always `payment_required`.
    pub error: String,
    pub required_price: String,
    pub pay_to: String,
    pub network: String,
    pub facilitator: Option<String>,
}

/// What a gate decided for a request.
#[derive(Clone, Debug, PartialEq)]
pub enum GateDecision {
    /// Serve the request.
    Pass,

    /// Answer with [`PAYMENT_REQUIRED_STATUS`] and this body.
    PaymentRequired(PaymentRequiredBody),
}

/// Protects the routes matching a pattern behind a price.
#[derive(Clone, Debug)]
pub struct PaymentGate {
    pattern: RoutePattern,
    price: String,
    pay_to: String,
    network: String,
    facilitator: Option<String>,
}

impl PaymentGate {
    pub fn new(
        pattern: &str,
        price: impl Into<String>,
        pay_to: impl Into<String>,
        network: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            pattern: pattern.parse()?,
            price: price.into(),
            pay_to: pay_to.into(),
            network: network.into(),
            facilitator: None,
        })
    }

    /// Advertise a facilitator in the 402 body.
    pub fn with_facilitator(mut self, url: impl Into<String>) -> Self {
        self.facilitator = Some(url.into());
        self
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    /// Decide whether a request for `path` may be served.
    ///
    /// `payment_marker` is the value of [`PAYMENT_MARKER_HEADER`]; `1`, `true` and `yes` mark the request
    /// as paid.
    pub fn evaluate(&self, path: &str, payment_marker: Option<&str>) -> GateDecision {
        if !self.pattern.matches(path) || is_paid(payment_marker) {
            return GateDecision::Pass;
        }
        GateDecision::PaymentRequired(self.payment_required())
    }

    pub fn payment_required(&self) -> PaymentRequiredBody {
        PaymentRequiredBody {
            error: "payment_required".to_string(),
            required_price: self.price.clone(),
            pay_to: self.pay_to.clone(),
            network: self.network.clone(),
            facilitator: self.facilitator.clone(),
        }
    }
}

fn is_paid(marker: Option<&str>) -> bool {
    marker.map(|m| m.trim().to_ascii_lowercase()).is_some_and(|m| matches!(m.as_str(), "1" | "true" | "yes"))
}
