//! Stripe API response types.
//!
//! Only the fields the marketplace reads are modelled; everything else in
//! the response is ignored.

use serde::Deserialize;

/// A connected account (`/v1/accounts`).
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub charges_enabled: bool,
    #[serde(default)]
    pub details_submitted: bool,
}

/// A one-time onboarding link (`/v1/account_links`).
#[derive(Debug, Clone, Deserialize)]
pub struct AccountLink {
    pub url: String,
}

/// A hosted checkout session (`/v1/checkout/sessions`).
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Absent once the session has expired or completed.
    pub url: Option<String>,
}

/// Error envelope returned with non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message: Option<String>,
}
