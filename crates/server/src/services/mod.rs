//! Business logic services for the marketplace.
//!
//! # Services
//!
//! - `auth` - Registration and password login
//! - `accounts` - Seller payout accounts ([`AccountDirectory`])
//! - `catalog` - Product listings ([`CatalogService`])
//! - `checkout` - Purchase initiation ([`CheckoutService`])
//! - `webhooks` - Payment notifications ([`WebhookReconciler`])
//! - `provider` - Payment processor traits
//!
//! Services are built per request from the pool and shared clients in
//! [`crate::state::AppState`]. They are generic over the store and provider
//! traits so tests can run them against in-memory fakes.

pub mod accounts;
pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod provider;
pub mod webhooks;

use url::Url;

pub use accounts::{AccountDirectory, AccountError};
pub use catalog::{CatalogError, CatalogService, ProductDetail};
pub use checkout::{CheckoutError, CheckoutService, CheckoutStarted, validate_quantity};
pub use webhooks::{DeliveryOutcome, WebhookError, WebhookReconciler};

/// Absolute URL for `path` under the public base URL.
///
/// Keeps any path prefix on the base (`https://host/shop` + `/payouts/status`
/// gives `https://host/shop/payouts/status`).
#[must_use]
pub fn app_url(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let joined = format!(
        "{}/{}",
        base.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_app_url_at_root() {
        let base = Url::parse("https://market.test").unwrap();
        assert_eq!(
            app_url(&base, "/payouts/status").as_str(),
            "https://market.test/payouts/status"
        );
    }

    #[test]
    fn test_app_url_keeps_path_prefix() {
        let base = Url::parse("https://market.test/shop/").unwrap();
        assert_eq!(
            app_url(&base, "/checkout/cancel").as_str(),
            "https://market.test/shop/checkout/cancel"
        );
    }
}
