//! Payment processor seams.
//!
//! Services talk to the processor only through these traits.
//! [`crate::stripe::StripeClient`] implements both for production; tests use
//! an in-memory fake.

use std::future::Future;

use thiserror::Error;
use url::Url;

use marketplace_core::{CurrencyCode, Email, PayoutAccountId, PurchaseId};

use crate::stripe::StripeError;

/// Errors from the payment processor.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Stripe(#[from] StripeError),

    /// The processor returned something unusable.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// The processor could not be reached or refused the call.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Onboarding state of a connected account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountStatus {
    pub charges_enabled: bool,
    pub details_submitted: bool,
}

impl AccountStatus {
    /// Whether the account can accept payments.
    #[must_use]
    pub const fn onboarding_complete(&self) -> bool {
        self.charges_enabled && self.details_submitted
    }
}

/// Everything needed to open a hosted checkout on a seller's account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    /// Seller's connected account; the session is created on it.
    pub account: PayoutAccountId,
    /// Correlation ID, sent as metadata and client reference.
    pub purchase_id: PurchaseId,
    pub product_name: String,
    pub product_description: String,
    /// Unit price in minor units.
    pub unit_amount: i64,
    pub currency: CurrencyCode,
    pub quantity: i32,
    pub success_url: Url,
    pub cancel_url: Url,
}

/// A checkout session created by the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSession {
    pub id: String,
    pub redirect_url: Url,
}

/// Connected accounts for sellers.
pub trait PayoutAccountProvider: Send + Sync {
    /// Create a standard connected account.
    fn create_account(
        &self,
        email: &Email,
        country: &str,
    ) -> impl Future<Output = Result<PayoutAccountId, ProviderError>> + Send;

    fn get_account(
        &self,
        account: &PayoutAccountId,
    ) -> impl Future<Output = Result<AccountStatus, ProviderError>> + Send;

    /// One-time link to the processor's hosted onboarding.
    fn create_onboarding_link(
        &self,
        account: &PayoutAccountId,
        refresh_url: &Url,
        return_url: &Url,
    ) -> impl Future<Output = Result<Url, ProviderError>> + Send;
}

/// Hosted checkout sessions.
pub trait CheckoutSessionProvider: Send + Sync {
    fn create_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> impl Future<Output = Result<CreatedSession, ProviderError>> + Send;
}
