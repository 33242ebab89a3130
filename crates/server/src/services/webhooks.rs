//! Payment notification reconciliation.
//!
//! Deliveries are at-least-once and may arrive in any order. Each purchase
//! moves `Pending -> Completed` at most once; replays and unrelated events
//! are acknowledged without writing.

use thiserror::Error;
use tracing::{info, instrument, warn};

use marketplace_core::PurchaseId;

use crate::db::{PurchaseLedger, RepositoryError};
use crate::models::Completion;
use crate::stripe::{
    CHECKOUT_SESSION_COMPLETED, CheckoutSessionObject, Event, SignatureError, WebhookVerifier,
};

/// Deliveries that must be rejected or retried.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Missing or wrong signature. Nothing was read or written.
    #[error("invalid webhook signature: {0}")]
    InvalidSignature(#[from] SignatureError),

    /// Signed, but not a JSON event.
    #[error("malformed webhook payload: {0}")]
    MalformedPayload(String),

    /// Storage failed; the processor should redeliver.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// What an accepted delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The purchase went from pending to completed.
    Completed(PurchaseId),
    /// Replay of an already processed completion.
    AlreadyCompleted(PurchaseId),
    /// Event kind the marketplace does not act on.
    Ignored(String),
    /// No usable purchase reference in the session.
    MissingCorrelation,
    /// Reference parsed but no such purchase exists.
    UnknownPurchase(PurchaseId),
}

/// Webhook reconciler.
pub struct WebhookReconciler<'a, L> {
    ledger: L,
    verifier: &'a WebhookVerifier,
}

impl<'a, L: PurchaseLedger> WebhookReconciler<'a, L> {
    #[must_use]
    pub const fn new(ledger: L, verifier: &'a WebhookVerifier) -> Self {
        Self { ledger, verifier }
    }

    /// Verify, parse and apply one delivery.
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` if `signature` is missing or does not verify
    /// - `MalformedPayload` if the signed body is not an event
    /// - `Repository` if the completion could not be stored
    #[instrument(skip_all)]
    pub async fn handle_delivery(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<DeliveryOutcome, WebhookError> {
        let signature = signature.ok_or(SignatureError::MissingHeader).inspect_err(|_| {
            warn!("Webhook delivery without signature header");
        })?;

        self.verifier.verify(payload, signature).inspect_err(|e| {
            warn!(error = %e, "Webhook signature rejected");
        })?;

        let event: Event = serde_json::from_slice(payload).map_err(|e| {
            warn!(error = %e, "Signed webhook payload is not an event");
            WebhookError::MalformedPayload(e.to_string())
        })?;

        self.apply(event).await
    }

    async fn apply(&self, event: Event) -> Result<DeliveryOutcome, WebhookError> {
        if event.kind != CHECKOUT_SESSION_COMPLETED {
            tracing::debug!(event_id = %event.id, kind = %event.kind, "Ignoring webhook event");
            return Ok(DeliveryOutcome::Ignored(event.kind));
        }

        let session = serde_json::from_value::<CheckoutSessionObject>(event.data.object).ok();
        let purchase_id = session
            .as_ref()
            .and_then(CheckoutSessionObject::purchase_reference)
            .and_then(|r| r.parse::<PurchaseId>().ok());
        let Some(purchase_id) = purchase_id else {
            warn!(event_id = %event.id, "Checkout completion without a usable purchase reference");
            return Ok(DeliveryOutcome::MissingCorrelation);
        };

        match self.ledger.mark_completed(purchase_id).await? {
            Completion::Completed(purchase) => {
                info!(purchase_id = %purchase.id, event_id = %event.id, "Purchase completed");
                Ok(DeliveryOutcome::Completed(purchase.id))
            }
            Completion::AlreadyCompleted(purchase) => {
                tracing::debug!(purchase_id = %purchase.id, "Completion replayed");
                Ok(DeliveryOutcome::AlreadyCompleted(purchase.id))
            }
            Completion::NotFound => {
                warn!(
                    purchase_id = %purchase_id,
                    event_id = %event.id,
                    "Completion for unknown purchase"
                );
                Ok(DeliveryOutcome::UnknownPurchase(purchase_id))
            }
        }
    }
}
