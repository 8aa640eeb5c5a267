use reqwest::Method;
use rust_decimal::Decimal;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path},
};
use x402_flow_client::{
    DefaultFacilitatorTransport, DefaultPaymentFlowClient, FacilitatorTransport, FlowConfig, PaymentFlowClient,
};

const TIMEOUT: Duration = Duration::from_secs(5);

// Nothing listens on port 9 locally, so connections are refused.
const UNREACHABLE: &str = "http://127.0.0.1:9";

#[tokio::test]
async fn json_body_and_headers_are_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/verify"))
        .and(body_json(json!({ "amount": 0.01, "currency": "USD" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "tx_12345", "status": "success" }))
                .insert_header("X-PAYMENT-RESPONSE", "tx_12345"),
        )
        .mount(&server)
        .await;

    let transport = DefaultFacilitatorTransport::new().unwrap();
    let body = json!({ "amount": 0.01, "currency": "USD" });
    let response = transport.call(&server.uri(), "/verify", Method::POST, Some(&body), TIMEOUT).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body["status"], "success");
    assert_eq!(response.header("x-payment-response"), Some("tx_12345"));
    assert_eq!(response.payment_response(), Some(json!({ "transaction": "tx_12345" })));
    assert!(response.request_body.is_none());
    assert!(response.diagnostics.is_none());
}

#[tokio::test]
async fn non_json_body_is_wrapped_as_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .respond_with(ResponseTemplate::new(200).set_body_string("facilitator online"))
        .mount(&server)
        .await;

    let transport = DefaultFacilitatorTransport::new().unwrap();
    let response = transport.call(&server.uri(), "list", Method::GET, None, TIMEOUT).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, json!({ "text": "facilitator online" }));
}

#[tokio::test]
async fn http_errors_keep_their_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/settle"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let transport = DefaultFacilitatorTransport::new().unwrap();
    let body = json!({ "amount": 1, "currency": "USD" });
    let response = transport.call(&server.uri(), "settle", Method::POST, Some(&body), TIMEOUT).await;

    assert_eq!(response.status_code, 503);
    assert!(response.error.is_none());
    assert_eq!(response.request_body, Some(body));
    assert_eq!(response.diagnostic("response_text"), Some(&json!("upstream unavailable")));
}

#[tokio::test]
async fn refused_connection_is_a_zero_status() {
    let transport = DefaultFacilitatorTransport::new().unwrap();
    let body = json!({ "amount": 1, "currency": "USD" });
    let response = transport.call(UNREACHABLE, "create_payment", Method::POST, Some(&body), TIMEOUT).await;

    assert_eq!(response.status_code, 0);
    assert!(response.error.is_some());
    assert_eq!(response.request_body, Some(body));
}

#[tokio::test]
async fn timeout_is_a_zero_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let transport = DefaultFacilitatorTransport::new().unwrap();
    let response = transport.call(&server.uri(), "list", Method::GET, None, Duration::from_millis(100)).await;

    assert_eq!(response.status_code, 0);
    assert!(response.error.is_some());
}

#[tokio::test]
async fn custom_client_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .and(header("x-api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "kinds": [] })))
        .mount(&server)
        .await;

    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert("x-api-key", reqwest::header::HeaderValue::from_static("secret"));
    let client = reqwest::Client::builder().default_headers(headers).build().unwrap();
    let transport = DefaultFacilitatorTransport::with_client(client);
    let response = transport.call(&server.uri(), "list", Method::GET, None, TIMEOUT).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, json!({ "kinds": [] }));
}

#[tokio::test]
async fn flow_over_http_with_unreachable_primary() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "kinds": [] })))
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/create_payment"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "intent_1" })))
        .expect(2)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/settle"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
        .expect(1)
        .mount(&mock)
        .await;

    let config = FlowConfig::new(UNREACHABLE).with_mock_facilitator_url(mock.uri());
    let transport = Arc::new(DefaultFacilitatorTransport::new().unwrap());
    let client = DefaultPaymentFlowClient::with_transport(config, transport);

    let result = client.complete_payment_flow(Decimal::new(1, 2), "USD", Some("t")).await;

    assert_eq!(client.facilitator_url().await, mock.uri());
    assert_eq!(result.create.body["status"], "verified-as-create");
    assert_eq!(result.create.body["id"], "intent_1");
    assert_eq!(result.settle.status_code, 200);
    assert_eq!(result.settle.body["status"], "success");
}
