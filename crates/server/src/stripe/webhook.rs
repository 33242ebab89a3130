//! Stripe webhook signature verification and event types.
//!
//! Implements Stripe's scheme:
//! <https://docs.stripe.com/webhooks#verify-manually>
//!
//! The `Stripe-Signature` header carries `t=<unix seconds>` and one or more
//! `v1=<hex>` entries. Each `v1` is an HMAC-SHA256 of `"{t}.{raw body}"`
//! keyed with the endpoint's signing secret.

use std::collections::HashMap;
use std::time::Duration;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, instrument};

/// Header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// The only event kind that changes purchase state.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Reasons a delivery's signature is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("missing signature header")]
    MissingHeader,
    #[error("malformed signature header")]
    MalformedHeader,
    #[error("signature header has no timestamp")]
    MissingTimestamp,
    #[error("signature header has no v1 signature")]
    MissingSignature,
    #[error("timestamp outside tolerance")]
    TimestampOutOfTolerance,
    #[error("signature mismatch")]
    Mismatch,
    #[error("invalid signing secret")]
    InvalidSecret,
}

/// Verifies `Stripe-Signature` headers against the endpoint secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: SecretString,
    tolerance: Duration,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"[REDACTED]")
            .field("tolerance", &self.tolerance)
            .finish()
    }
}

impl WebhookVerifier {
    #[must_use]
    pub const fn new(secret: SecretString, tolerance: Duration) -> Self {
        Self { secret, tolerance }
    }

    /// Verify a delivery against the current system time.
    ///
    /// # Errors
    ///
    /// Returns `SignatureError` if the header is malformed, the timestamp is
    /// outside the tolerance, or no `v1` signature matches.
    pub fn verify(&self, payload: &[u8], header: &str) -> Result<(), SignatureError> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|_| SignatureError::TimestampOutOfTolerance)?
            .as_secs();
        let now = i64::try_from(now).map_err(|_| SignatureError::TimestampOutOfTolerance)?;

        self.verify_at(payload, header, now)
    }

    /// Verify a delivery as of `now` (unix seconds).
    ///
    /// # Errors
    ///
    /// See [`Self::verify`].
    #[instrument(skip_all)]
    pub fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<(), SignatureError> {
        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or(SignatureError::MalformedHeader)?;
            match key {
                "t" => timestamp = Some(value),
                "v1" => signatures.push(value),
                // v0 and future schemes are ignored
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
        if signatures.is_empty() {
            return Err(SignatureError::MissingSignature);
        }

        let ts: i64 = timestamp
            .parse()
            .map_err(|_| SignatureError::MalformedHeader)?;
        let tolerance = i64::try_from(self.tolerance.as_secs()).unwrap_or(i64::MAX);
        if now.saturating_sub(ts).saturating_abs() > tolerance {
            return Err(SignatureError::TimestampOutOfTolerance);
        }

        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| SignatureError::InvalidSecret)?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);

        // verify_slice compares in constant time
        let matched = signatures.iter().any(|candidate| {
            hex::decode(candidate).is_ok_and(|bytes| mac.clone().verify_slice(&bytes).is_ok())
        });

        if !matched {
            return Err(SignatureError::Mismatch);
        }

        debug!("Stripe signature verified");

        Ok(())
    }

    /// Build a header value for `payload` at `timestamp`.
    ///
    /// Used by tests and local tooling to produce deliveries that pass
    /// [`Self::verify_at`].
    ///
    /// # Errors
    ///
    /// Returns `SignatureError::InvalidSecret` if the secret cannot key the MAC.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> Result<String, SignatureError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| SignatureError::InvalidSecret)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(format!(
            "t={timestamp},v1={}",
            hex::encode(mac.finalize().into_bytes())
        ))
    }
}

/// A webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// The checkout session carried by `checkout.session.completed`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: Option<String>,
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSessionObject {
    /// The purchase reference: `metadata.purchase_id`, else
    /// `client_reference_id`.
    #[must_use]
    pub fn purchase_reference(&self) -> Option<&str> {
        self.metadata
            .get("purchase_id")
            .map(String::as_str)
            .or(self.client_reference_id.as_deref())
    }
}
