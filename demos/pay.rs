use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;
use x402_flow_client::{DefaultPaymentFlowClient, FlowConfig, GateDecision, PaymentFlowClient, PaymentGate};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    // FACILITATOR_URL, MOCK_FACILITATOR_URL, X402_PRIVATE_KEY and X402_NETWORK are all optional
    let config = FlowConfig::from_env()?;
    let client = DefaultPaymentFlowClient::new(config)?;
    println!("Facilitator: {}", client.facilitator_url().await);
    println!("Wallet: {}", client.wallet_address().unwrap_or("<none>"));
    println!("Network: {}", client.config().network.as_deref().unwrap_or("<unset>"));

    // What a resource server would answer before payment
    let gate = PaymentGate::new("/premium/*", "$0.01", "0x0123456789abcdef0123456789abcdef01234567", "base-sepolia")?
        .with_facilitator(client.facilitator_url().await);
    if let GateDecision::PaymentRequired(body) = gate.evaluate("/premium/content", None) {
        println!("Challenge for {}: {}", gate.pattern(), serde_json::to_string_pretty(&body)?);
    }

    let result = client.complete_payment_flow(Decimal::new(1, 2), "USD", Some("test-payment")).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    if let Some(receipt) = result.settle.payment_response() {
        println!("Settlement: {receipt}");
    }

    let single = client.single_payment(Decimal::new(1, 2), "USD", Some("tool-payment")).await;
    println!("Single payment: status={}", single.status_code);
    Ok(())
}
