//! A Rust client that pays for gated resources through an
//! [x402](https://www.x402.org) facilitator.
//!
//! A facilitator exposes `/list`, `/create_payment`, `/verify` and `/settle`. Facilitators differ in which
//! of these they implement, so the client negotiates: it falls back to a local mock facilitator when the
//! configured one is down, uses `/verify` when `/create_payment` is missing, and retries `/verify` with a
//! signed EIP-712 intent when a plain request is rejected. Every outcome is returned as data, never as an
//! error.
//!
//! # Getting Started
//!
//! The primary entry point is the [`PaymentFlowClient`] trait and its default
//! implementation, [`DefaultPaymentFlowClient`].
//!
//! ## Example: Running a Payment Flow
//!
//! ```no_run
//! use rust_decimal::Decimal;
//! use x402_flow_client::{DefaultPaymentFlowClient, FlowConfig, PaymentFlowClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 1. Read FACILITATOR_URL, X402_PRIVATE_KEY and friends
//!     let config = FlowConfig::from_env()?;
//!     let client = DefaultPaymentFlowClient::new(config)?;
//!
//!     // 2. Create, verify and settle a payment of 0.01 USD
//!     let result = client.complete_payment_flow(Decimal::new(1, 2), "USD", Some("coffee")).await;
//!
//!     // 3. Inspect the outcome of each stage
//!     let (create, verify, settle) = (&result.create, &result.verify, &result.settle);
//!     println!("create={} verify={} settle={}", create.status_code, verify.status_code, settle.status_code);
//!     if let Some(receipt) = result.settle.payment_response() {
//!         println!("Settlement: {receipt}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod gateway;
pub mod intent;
pub mod models;
pub mod signer;
pub mod transport;

pub use client::{DefaultPaymentFlowClient, PaymentFlowClient};
pub use config::FlowConfig;
pub use error::{ConfigError, GatewayError, SigningError};
pub use gateway::{GateDecision, PaymentGate, PaymentRequiredBody, RoutePattern};
pub use intent::{StructuredIntent, build_intent};
pub use models::{
    FacilitatorInfo, FacilitatorResponse, FlowResult, PaymentRequest, decode_payment_response, select_requirements,
};
pub use signer::{IntentSigner, derive_address, sign_intent};
pub use transport::{DefaultFacilitatorTransport, FacilitatorTransport};
