//! Checkout orchestration.
//!
//! Starting a checkout reserves inventory and records a pending purchase in
//! one atomic step, then opens a hosted checkout session on the seller's
//! connected account. The purchase UUID travels with the session so the
//! completion webhook can find it again.
//!
//! If the session cannot be created after the reservation committed, the
//! reservation stays in place: the error is logged with the purchase ID and
//! the stale-pending report (`mp-cli purchases stale`) surfaces it.

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use marketplace_core::{MoneyError, ProductId, PurchaseId, UserId};

use super::app_url;
use super::provider::{CheckoutSessionProvider, CheckoutSessionRequest, ProviderError};
use crate::db::{CatalogStore, PayoutAccountStore, PurchaseLedger, RepositoryError};

/// Errors from starting a checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("quantity must be a positive whole number")]
    InvalidQuantity,

    #[error("product not found")]
    ProductNotFound,

    #[error("you cannot buy your own product")]
    SelfPurchaseNotAllowed,

    #[error("the seller cannot receive payments yet")]
    SellerNotPayable,

    #[error("only {available} left, requested {requested}")]
    InsufficientInventory { requested: i32, available: i32 },

    #[error("payment processor error: {0}")]
    ExternalService(#[from] ProviderError),

    #[error("invalid purchase price: {0}")]
    Price(#[from] MoneyError),

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CheckoutError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::InsufficientInventory {
                requested,
                available,
            } => Self::InsufficientInventory {
                requested,
                available,
            },
            // Deleted between the existence check and the row lock
            RepositoryError::NotFound => Self::ProductNotFound,
            other => Self::Repository(other),
        }
    }
}

/// A checkout that is ready for the buyer to pay.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutStarted {
    pub purchase_id: PurchaseId,
    pub session_id: String,
    /// Hosted payment page to send the buyer to.
    pub checkout_url: Url,
}

/// Validate a requested purchase quantity.
///
/// # Errors
///
/// Returns `CheckoutError::InvalidQuantity` unless `1 <= quantity <= i32::MAX`.
pub fn validate_quantity(quantity: i64) -> Result<i32, CheckoutError> {
    i32::try_from(quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or(CheckoutError::InvalidQuantity)
}

/// Checkout orchestrator.
pub struct CheckoutService<'a, C, L, A, P> {
    catalog: C,
    ledger: L,
    accounts: A,
    provider: &'a P,
    base_url: &'a Url,
}

impl<'a, C, L, A, P> CheckoutService<'a, C, L, A, P>
where
    C: CatalogStore,
    L: PurchaseLedger,
    A: PayoutAccountStore,
    P: CheckoutSessionProvider,
{
    #[must_use]
    pub const fn new(
        catalog: C,
        ledger: L,
        accounts: A,
        provider: &'a P,
        base_url: &'a Url,
    ) -> Self {
        Self {
            catalog,
            ledger,
            accounts,
            provider,
            base_url,
        }
    }

    /// Reserve `quantity` units of `product_id` for `buyer` and open a
    /// checkout session for them.
    ///
    /// # Errors
    ///
    /// - `InvalidQuantity` before anything is read or written
    /// - `ProductNotFound`, `SelfPurchaseNotAllowed`, `SellerNotPayable`
    /// - `InsufficientInventory` with no side effects
    /// - `Price` if the unit price has no minor-unit form, before reserving
    /// - `ExternalService` if the session could not be created; the
    ///   reservation is kept
    #[instrument(skip(self), fields(buyer_id = %buyer, product_id = %product_id))]
    pub async fn initiate_checkout(
        &self,
        buyer: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CheckoutStarted, CheckoutError> {
        let quantity = validate_quantity(quantity)?;

        let product = self
            .catalog
            .get_product(product_id)
            .await?
            .ok_or(CheckoutError::ProductNotFound)?;
        if product.is_owned_by(buyer) {
            return Err(CheckoutError::SelfPurchaseNotAllowed);
        }

        let seller_account = self
            .accounts
            .get_by_user(product.owner_id)
            .await?
            .filter(|a| a.onboarding_complete)
            .ok_or(CheckoutError::SellerNotPayable)?;

        let mut unit_amount = product.price.to_minor_units()?;

        let purchase = self.ledger.reserve(buyer, product_id, quantity).await?;
        // Repriced between the read and the row lock.
        if purchase.unit_price != product.price {
            unit_amount = purchase.unit_price.to_minor_units().inspect_err(|e| {
                tracing::error!(
                    purchase_id = %purchase.id,
                    error = %e,
                    "Unrepresentable unit price; reservation kept"
                );
            })?;
        }

        let request = CheckoutSessionRequest {
            account: seller_account.account_id,
            purchase_id: purchase.id,
            product_name: purchase.product_name.clone(),
            product_description: product.description,
            unit_amount,
            currency: purchase.unit_price.currency(),
            quantity,
            success_url: self.return_url("/checkout/success", purchase.id),
            cancel_url: self.return_url("/checkout/cancel", purchase.id),
        };

        let session = self
            .provider
            .create_session(&request)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    purchase_id = %purchase.id,
                    error = %e,
                    "Checkout session creation failed; reservation kept"
                );
            })?;

        tracing::info!(
            purchase_id = %purchase.id,
            session_id = %session.id,
            quantity,
            "Checkout started"
        );

        Ok(CheckoutStarted {
            purchase_id: purchase.id,
            session_id: session.id,
            checkout_url: session.redirect_url,
        })
    }

    fn return_url(&self, path: &str, purchase_id: PurchaseId) -> Url {
        let mut url = app_url(self.base_url, path);
        url.query_pairs_mut()
            .append_pair("purchase_id", &purchase_id.to_string());
        url
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use marketplace_core::{CurrencyCode, PurchaseStatus};

    use super::*;
    use crate::testing::{FakeProvider, MemoryStore};

    const SELLER: UserId = UserId::new(1);
    const BUYER: UserId = UserId::new(2);
    const OTHER_BUYER: UserId = UserId::new(3);

    fn base_url() -> Url {
        Url::parse("https://market.test").unwrap()
    }

    type TestCheckout<'a> =
        CheckoutService<'a, MemoryStore, MemoryStore, MemoryStore, FakeProvider>;

    fn checkout_service<'a>(
        store: &MemoryStore,
        provider: &'a FakeProvider,
        base: &'a Url,
    ) -> TestCheckout<'a> {
        CheckoutService::new(store.clone(), store.clone(), store.clone(), provider, base)
    }

    fn store_with_payable_seller() -> MemoryStore {
        let store = MemoryStore::new();
        store.seed_account(SELLER, "acct_seller", true);
        store
    }

    #[tokio::test]
    async fn test_buy_three_of_five() {
        let store = store_with_payable_seller();
        let product = store.seed_product(SELLER, "10.00", CurrencyCode::USD, 5);
        let provider = FakeProvider::new();
        let base = base_url();
        let checkout = checkout_service(&store, &provider, &base);

        let started = checkout.initiate_checkout(BUYER, product.id, 3).await.unwrap();

        assert_eq!(store.quantity(product.id), Some(2));
        let purchase = store.purchase(started.purchase_id).unwrap();
        assert_eq!(purchase.status, PurchaseStatus::Pending);
        assert_eq!(purchase.quantity, 3);
        assert_eq!(purchase.buyer_id, BUYER);

        let sessions = provider.sessions();
        assert_eq!(sessions.len(), 1);
        let session = &sessions[0];
        assert_eq!(session.unit_amount, 1000);
        assert_eq!(session.currency, CurrencyCode::USD);
        assert_eq!(session.quantity, 3);
        assert_eq!(session.account.as_str(), "acct_seller");
        assert_eq!(session.purchase_id, started.purchase_id);
        assert_eq!(
            session.success_url.as_str(),
            format!(
                "https://market.test/checkout/success?purchase_id={}",
                started.purchase_id
            )
        );
        assert_eq!(
            session.cancel_url.as_str(),
            format!(
                "https://market.test/checkout/cancel?purchase_id={}",
                started.purchase_id
            )
        );
    }

    #[tokio::test]
    async fn test_second_buyer_blocked_by_insufficient_inventory() {
        let store = store_with_payable_seller();
        let product = store.seed_product(SELLER, "10.00", CurrencyCode::USD, 5);
        let provider = FakeProvider::new();
        let base = base_url();
        let checkout = checkout_service(&store, &provider, &base);

        checkout.initiate_checkout(BUYER, product.id, 3).await.unwrap();
        let second = checkout.initiate_checkout(OTHER_BUYER, product.id, 3).await;

        assert!(matches!(
            second,
            Err(CheckoutError::InsufficientInventory {
                requested: 3,
                available: 2
            })
        ));
        assert_eq!(store.quantity(product.id), Some(2));
        assert_eq!(store.purchase_count(), 1);
        assert_eq!(provider.sessions().len(), 1);
    }

    #[tokio::test]
    async fn test_self_purchase_rejected_without_side_effects() {
        let store = store_with_payable_seller();
        let product = store.seed_product(SELLER, "10.00", CurrencyCode::USD, 5);
        let provider = FakeProvider::new();
        let base = base_url();
        let checkout = checkout_service(&store, &provider, &base);

        let result = checkout.initiate_checkout(SELLER, product.id, 1).await;

        assert!(matches!(result, Err(CheckoutError::SelfPurchaseNotAllowed)));
        assert_eq!(store.quantity(product.id), Some(5));
        assert_eq!(store.purchase_count(), 0);
        assert!(provider.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_non_positive_quantity_rejected_before_any_mutation() {
        let store = store_with_payable_seller();
        let product = store.seed_product(SELLER, "10.00", CurrencyCode::USD, 5);
        let provider = FakeProvider::new();
        let base = base_url();
        let checkout = checkout_service(&store, &provider, &base);

        for quantity in [0, -1, -100, i64::from(i32::MAX) + 1] {
            let result = checkout.initiate_checkout(BUYER, product.id, quantity).await;
            assert!(matches!(result, Err(CheckoutError::InvalidQuantity)));
        }
        // Even for a product that does not exist
        assert!(matches!(
            checkout.initiate_checkout(BUYER, ProductId::new(999), 0).await,
            Err(CheckoutError::InvalidQuantity)
        ));

        assert_eq!(store.quantity(product.id), Some(5));
        assert_eq!(store.purchase_writes(), 0);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let store = store_with_payable_seller();
        let provider = FakeProvider::new();
        let base = base_url();
        let checkout = checkout_service(&store, &provider, &base);

        assert!(matches!(
            checkout.initiate_checkout(BUYER, ProductId::new(42), 1).await,
            Err(CheckoutError::ProductNotFound)
        ));
    }

    #[tokio::test]
    async fn test_seller_without_account_or_onboarding_is_not_payable() {
        let store = MemoryStore::new();
        let no_account = store.seed_product(SELLER, "10.00", CurrencyCode::USD, 5);
        let onboarding_seller = UserId::new(9);
        store.seed_account(onboarding_seller, "acct_pending", false);
        let not_onboarded = store.seed_product(onboarding_seller, "10.00", CurrencyCode::USD, 5);
        let provider = FakeProvider::new();
        let base = base_url();
        let checkout = checkout_service(&store, &provider, &base);

        for product in [&no_account, &not_onboarded] {
            let result = checkout.initiate_checkout(BUYER, product.id, 1).await;
            assert!(matches!(result, Err(CheckoutError::SellerNotPayable)));
            assert_eq!(store.quantity(product.id), Some(5));
        }
        assert_eq!(store.purchase_count(), 0);
    }

    #[tokio::test]
    async fn test_session_failure_keeps_reservation() {
        let store = store_with_payable_seller();
        let product = store.seed_product(SELLER, "10.00", CurrencyCode::USD, 5);
        let provider = FakeProvider::new();
        provider.set_failing(true);
        let base = base_url();
        let checkout = checkout_service(&store, &provider, &base);

        let result = checkout.initiate_checkout(BUYER, product.id, 2).await;

        assert!(matches!(result, Err(CheckoutError::ExternalService(_))));
        assert_eq!(store.quantity(product.id), Some(3));
        assert_eq!(store.purchase_count(), 1);
    }

    #[tokio::test]
    async fn test_zero_decimal_currency_unit_amount() {
        let store = store_with_payable_seller();
        let product = store.seed_product(SELLER, "1500", CurrencyCode::JPY, 1);
        let provider = FakeProvider::new();
        let base = base_url();
        let checkout = checkout_service(&store, &provider, &base);

        checkout.initiate_checkout(BUYER, product.id, 1).await.unwrap();

        assert_eq!(provider.sessions()[0].unit_amount, 1500);
    }

    #[tokio::test]
    async fn test_unrepresentable_price_reserves_nothing() {
        let store = store_with_payable_seller();
        // 10^20 dollars is 10^22 cents, past i64
        let product = store.seed_product(SELLER, "100000000000000000000", CurrencyCode::USD, 4);
        let provider = FakeProvider::new();
        let base = base_url();
        let checkout = checkout_service(&store, &provider, &base);

        let result = checkout.initiate_checkout(BUYER, product.id, 1).await;

        assert!(matches!(result, Err(CheckoutError::Price(MoneyError::Overflow))));
        assert_eq!(store.quantity(product.id), Some(4));
        assert_eq!(store.purchase_writes(), 0);
        assert!(provider.sessions().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_purchases_never_oversell() {
        let store = store_with_payable_seller();
        let product = store.seed_product(SELLER, "10.00", CurrencyCode::USD, 7);
        let provider = Arc::new(FakeProvider::new());
        let base = Arc::new(base_url());

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let store = store.clone();
                let provider = Arc::clone(&provider);
                let base = Arc::clone(&base);
                tokio::spawn(async move {
                    let checkout = checkout_service(&store, &*provider, &base);
                    checkout
                        .initiate_checkout(UserId::new(100 + i), product.id, 2)
                        .await
                })
            })
            .collect();

        let mut succeeded = 0;
        for result in futures::future::join_all(handles).await {
            match result.unwrap() {
                Ok(_) => succeeded += 1,
                Err(CheckoutError::InsufficientInventory { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        // floor(7 / 2) = 3 purchases fit
        assert_eq!(succeeded, 3);
        assert_eq!(store.quantity(product.id), Some(1));
        assert_eq!(store.purchase_count(), 3);
    }

    #[test]
    fn test_validate_quantity() {
        assert_eq!(validate_quantity(1).unwrap(), 1);
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-5).is_err());
        assert!(validate_quantity(i64::MAX).is_err());
    }
}
