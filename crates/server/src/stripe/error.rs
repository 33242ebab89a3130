//! Stripe-related errors.

use thiserror::Error;

/// Errors that can occur when talking to the Stripe API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed before a response arrived.
    #[error("Stripe request failed: {0}")]
    Request(String),

    /// No response within the configured timeout.
    #[error("Stripe request timed out")]
    Timeout,

    /// Stripe answered with a non-success status.
    #[error("Stripe API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response body.
    #[error("Stripe response error: {0}")]
    Response(String),

    /// Client could not be configured.
    #[error("Stripe configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for StripeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Response(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}
