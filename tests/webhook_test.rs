//! Webhook endpoint behavior: signature enforcement and the
//! unknown-reference no-op.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use marketplace_api::payments::stripe::sign_payload;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;

fn event_payload(reference: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": "evt_test_1",
        "type": "payment_intent.succeeded",
        "data": {
            "object": {
                "id": reference,
                "status": "succeeded",
                "amount": 2500,
                "currency": "usd"
            }
        }
    }))
    .unwrap()
}

#[tokio::test]
async fn webhook_without_signature_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/payment/stripe/webhook",
            None,
            Some(json!({"id": "evt_1"})),
        )
        .await;

    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert_eq!(body["received"], false);
}

#[tokio::test]
async fn webhook_with_bad_signature_is_rejected() {
    let app = TestApp::new().await;
    let payload = event_payload("pi_bogus");

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/payment/stripe/webhook")
        .header("stripe-signature", "t=1,v1=deadbeef")
        .body(axum::body::Body::from(payload))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert_eq!(body["received"], false);
}

#[tokio::test]
async fn webhook_for_unknown_reference_is_a_no_op() {
    let app = TestApp::new().await;
    let payload = event_payload("pi_never_seen");
    let now = chrono::Utc::now().timestamp();
    let header = sign_payload(&payload, &app.state.config.stripe_webhook_secret, now);

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/payment/stripe/webhook")
        .header("stripe-signature", header)
        .body(axum::body::Body::from(payload))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();

    // Acknowledged, but no order materializes out of thin air.
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["received"], true);

    let order_count = marketplace_api::entities::order::Entity::find()
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(order_count, 0);
}

#[tokio::test]
async fn webhook_with_unrecognized_event_type_is_acknowledged() {
    let app = TestApp::new().await;
    let payload = serde_json::to_vec(&json!({
        "id": "evt_test_2",
        "type": "customer.created",
        "data": { "object": { "id": "cus_1" } }
    }))
    .unwrap();
    let now = chrono::Utc::now().timestamp();
    let header = sign_payload(&payload, &app.state.config.stripe_webhook_secret, now);

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/payment/stripe/webhook")
        .header("stripe-signature", header)
        .body(axum::body::Body::from(payload))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["received"], true);
}
