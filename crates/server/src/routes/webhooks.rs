//! Payment processor webhook endpoint.
//!
//! The body is taken as raw bytes: the signature covers the exact payload,
//! so it must be verified before any JSON parsing.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::services::{DeliveryOutcome, WebhookError};
use crate::state::AppState;
use crate::stripe::SIGNATURE_HEADER;

/// Receive a Stripe event.
///
/// - 200 for every accepted delivery, including ones that change nothing
/// - 400 for a bad signature or an unparseable payload
/// - 500 on storage failure, so Stripe redelivers
pub async fn stripe(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match state.reconciler().handle_delivery(&body, signature).await {
        Ok(outcome) => {
            let outcome = match outcome {
                DeliveryOutcome::Completed(_) => "completed",
                DeliveryOutcome::AlreadyCompleted(_) => "already_completed",
                DeliveryOutcome::Ignored(_) => "ignored",
                DeliveryOutcome::MissingCorrelation => "missing_correlation",
                DeliveryOutcome::UnknownPurchase(_) => "unknown_purchase",
            };
            (
                StatusCode::OK,
                Json(json!({ "received": true, "outcome": outcome })),
            )
                .into_response()
        }
        Err(e @ (WebhookError::InvalidSignature(_) | WebhookError::MalformedPayload(_))) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
        Err(e @ WebhookError::Repository(_)) => {
            let event_id = sentry::capture_error(&e);
            tracing::error!(error = %e, sentry_event_id = %event_id, "Webhook processing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
                .into_response()
        }
    }
}
