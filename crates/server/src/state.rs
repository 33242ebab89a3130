//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::MarketplaceConfig;
use crate::db::{PayoutAccountRepository, ProductRepository, PurchaseRepository};
use crate::services::{AccountDirectory, CatalogService, CheckoutService, WebhookReconciler};
use crate::stripe::{StripeClient, StripeError, WebhookVerifier};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Services are assembled per request from the
/// pool and the shared payment client.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: MarketplaceConfig,
    pool: PgPool,
    stripe: StripeClient,
    webhook_verifier: WebhookVerifier,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the Stripe HTTP client cannot be built.
    pub fn new(config: MarketplaceConfig, pool: PgPool) -> Result<Self, StripeError> {
        let stripe = StripeClient::new(&config.stripe)?;
        let webhook_verifier = WebhookVerifier::new(
            config.stripe.webhook_secret.clone(),
            config.stripe.webhook_tolerance,
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                stripe,
                webhook_verifier,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &MarketplaceConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn stripe(&self) -> &StripeClient {
        &self.inner.stripe
    }

    #[must_use]
    pub fn webhook_verifier(&self) -> &WebhookVerifier {
        &self.inner.webhook_verifier
    }

    /// Catalog service backed by Postgres.
    #[must_use]
    pub fn catalog(&self) -> CatalogService<ProductRepository<'_>> {
        CatalogService::new(ProductRepository::new(self.pool()))
    }

    /// Payout account directory backed by Postgres and Stripe Connect.
    #[must_use]
    pub fn accounts(&self) -> AccountDirectory<'_, PayoutAccountRepository<'_>, StripeClient> {
        AccountDirectory::new(
            PayoutAccountRepository::new(self.pool()),
            self.stripe(),
            &self.config().stripe.account_country,
            &self.config().base_url,
        )
    }

    /// Checkout orchestrator backed by Postgres and Stripe Checkout.
    #[must_use]
    pub fn checkout(
        &self,
    ) -> CheckoutService<
        '_,
        ProductRepository<'_>,
        PurchaseRepository<'_>,
        PayoutAccountRepository<'_>,
        StripeClient,
    > {
        let pool = self.pool();
        CheckoutService::new(
            ProductRepository::new(pool),
            PurchaseRepository::new(pool),
            PayoutAccountRepository::new(pool),
            self.stripe(),
            &self.config().base_url,
        )
    }

    /// Webhook reconciler using the configured signing secret.
    #[must_use]
    pub fn reconciler(&self) -> WebhookReconciler<'_, PurchaseRepository<'_>> {
        WebhookReconciler::new(PurchaseRepository::new(self.pool()), self.webhook_verifier())
    }
}
