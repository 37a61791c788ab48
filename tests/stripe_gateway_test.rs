//! Stripe client against a mock HTTP server: request shapes, decoding
//! and provider-error mapping.

use marketplace_api::errors::ServiceError;
use marketplace_api::payments::stripe::StripeGateway;
use marketplace_api::payments::{CreateIntentRequest, PaymentGateway};
use serde_json::json;
use std::collections::BTreeMap;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn create_customer_decodes_provider_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/customers"))
        .and(body_string_contains("email=ada%40example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cus_123",
            "email": "ada@example.com"
        })))
        .mount(&server)
        .await;

    let gateway = StripeGateway::new(server.uri(), "sk_test_key");
    let customer = gateway
        .create_customer("Ada Lovelace", "ada@example.com")
        .await
        .unwrap();
    assert_eq!(customer.id, "cus_123");
}

#[tokio::test]
async fn payment_intent_carries_amount_and_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .and(body_string_contains("amount=2500"))
        .and(body_string_contains("metadata%5Boccasion%5D=birthday"))
        .and(body_string_contains(
            "automatic_payment_methods%5Ballow_redirects%5D=never",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pi_123",
            "client_secret": "pi_123_secret",
            "status": "requires_confirmation",
            "amount": 2500,
            "currency": "usd"
        })))
        .mount(&server)
        .await;

    let mut metadata = BTreeMap::new();
    metadata.insert("occasion".to_string(), "birthday".to_string());

    let gateway = StripeGateway::new(server.uri(), "sk_test_key");
    let intent = gateway
        .create_payment_intent(CreateIntentRequest {
            amount: 2500,
            currency: "usd".to_string(),
            customer_id: "cus_123".to_string(),
            metadata,
        })
        .await
        .unwrap();

    assert_eq!(intent.id, "pi_123");
    assert_eq!(intent.amount, 2500);
    assert_eq!(intent.client_secret.as_deref(), Some("pi_123_secret"));
}

#[tokio::test]
async fn confirm_posts_the_payment_method() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents/pi_123/confirm"))
        .and(body_string_contains("payment_method=pm_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pi_123",
            "client_secret": "pi_123_secret",
            "status": "succeeded",
            "amount": 2500,
            "currency": "usd"
        })))
        .mount(&server)
        .await;

    let gateway = StripeGateway::new(server.uri(), "sk_test_key");
    let confirmed = gateway
        .confirm_payment_intent("pi_123", "pm_test")
        .await
        .unwrap();
    assert_eq!(confirmed.status, "succeeded");
}

#[tokio::test]
async fn provider_errors_surface_their_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "error": { "message": "Your card was declined." }
        })))
        .mount(&server)
        .await;

    let gateway = StripeGateway::new(server.uri(), "sk_test_key");
    let err = gateway
        .create_payment_intent(CreateIntentRequest {
            amount: 100,
            currency: "usd".to_string(),
            customer_id: "cus_1".to_string(),
            metadata: BTreeMap::new(),
        })
        .await
        .unwrap_err();

    match err {
        ServiceError::PaymentFailed(message) => {
            assert_eq!(message, "Your card was declined.")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn subscription_items_decode_unit_amount() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/subscriptions"))
        .and(body_string_contains("items%5B0%5D%5Bprice%5D=price_abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "sub_123",
            "status": "active",
            "currency": "usd",
            "current_period_end": 1767225600,
            "items": {
                "data": [
                    { "id": "si_1", "price": { "unit_amount": 999 } }
                ]
            }
        })))
        .mount(&server)
        .await;

    let gateway = StripeGateway::new(server.uri(), "sk_test_key");
    let subscription = gateway
        .create_subscription("cus_123", "price_abc", BTreeMap::new())
        .await
        .unwrap();

    assert_eq!(subscription.id, "sub_123");
    assert_eq!(subscription.unit_amount, Some(999));
}
