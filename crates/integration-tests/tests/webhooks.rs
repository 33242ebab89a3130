//! Integration tests for the Stripe webhook endpoint.
//!
//! These tests require the marketplace server running with the same
//! `STRIPE_WEBHOOK_SECRET` as the test process.

use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

use marketplace_integration_tests::{base_url, client, webhook_verifier};
use marketplace_server::stripe::SIGNATURE_HEADER;

fn event(kind: &str, purchase_id: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": format!("evt_{}", Uuid::new_v4().simple()),
        "type": kind,
        "data": { "object": {
            "id": "cs_integration",
            "client_reference_id": purchase_id,
            "metadata": { "purchase_id": purchase_id }
        }}
    }))
    .expect("Failed to encode event")
}

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

#[tokio::test]
#[ignore = "Requires running marketplace server"]
async fn test_unsigned_delivery_is_rejected() {
    let resp = client()
        .post(format!("{}/webhooks/stripe", base_url()))
        .body(event("checkout.session.completed", &Uuid::new_v4().to_string()))
        .send()
        .await
        .expect("Failed to deliver webhook");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running marketplace server"]
async fn test_forged_signature_is_rejected() {
    let payload = event("checkout.session.completed", &Uuid::new_v4().to_string());

    let resp = client()
        .post(format!("{}/webhooks/stripe", base_url()))
        .header(SIGNATURE_HEADER, format!("t={},v1={}", now(), "0".repeat(64)))
        .body(payload)
        .send()
        .await
        .expect("Failed to deliver webhook");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running marketplace server and STRIPE_WEBHOOK_SECRET"]
async fn test_signed_unrelated_event_is_acknowledged() {
    let payload = event("customer.created", "");
    let signature = webhook_verifier()
        .sign(&payload, now())
        .expect("Failed to sign payload");

    let resp = client()
        .post(format!("{}/webhooks/stripe", base_url()))
        .header(SIGNATURE_HEADER, signature)
        .body(payload)
        .send()
        .await
        .expect("Failed to deliver webhook");

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Failed to parse response");
    assert_eq!(body["outcome"], "ignored");
}

#[tokio::test]
#[ignore = "Requires running marketplace server, database and STRIPE_WEBHOOK_SECRET"]
async fn test_completion_for_unknown_purchase_is_acknowledged() {
    let payload = event("checkout.session.completed", &Uuid::new_v4().to_string());
    let signature = webhook_verifier()
        .sign(&payload, now())
        .expect("Failed to sign payload");

    let resp = client()
        .post(format!("{}/webhooks/stripe", base_url()))
        .header(SIGNATURE_HEADER, signature)
        .body(payload)
        .send()
        .await
        .expect("Failed to deliver webhook");

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Failed to parse response");
    assert_eq!(body["outcome"], "unknown_purchase");
}
