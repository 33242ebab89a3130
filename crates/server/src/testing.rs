//! In-memory stores and a fake payment provider for service tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rust_decimal::Decimal;
use url::Url;

use marketplace_core::{
    CurrencyCode, Email, Money, PayoutAccountId, ProductId, PurchaseId, PurchaseStatus, UserId,
};

use crate::db::{CatalogStore, PayoutAccountStore, PurchaseLedger, RepositoryError};
use crate::models::{Completion, NewProduct, PayoutAccount, Product, Purchase};
use crate::services::provider::{
    AccountStatus, CheckoutSessionProvider, CheckoutSessionRequest, CreatedSession,
    PayoutAccountProvider, ProviderError,
};

#[derive(Debug, Default)]
struct Inner {
    products: BTreeMap<ProductId, Product>,
    next_product_id: i32,
    purchases: HashMap<PurchaseId, Purchase>,
    accounts: HashMap<UserId, PayoutAccount>,
    purchase_writes: usize,
}

/// One shared in-memory database implementing every store trait.
///
/// Clones share state, so a clone can be moved into each spawned task.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a listing directly.
    pub fn seed_product(&self, owner: UserId, price: &str, currency: CurrencyCode, quantity: i32) -> Product {
        let mut inner = self.inner();
        inner.next_product_id += 1;
        let now = Utc::now();
        let amount: Decimal = price.parse().unwrap_or_default();
        let product = Product {
            id: ProductId::new(inner.next_product_id),
            owner_id: owner,
            name: format!("Product {}", inner.next_product_id),
            description: "Seeded for tests".to_string(),
            price: Money::new(amount, currency).unwrap_or_else(|e| panic!("bad seed price: {e}")),
            quantity,
            created_at: now,
            updated_at: now,
        };
        inner.products.insert(product.id, product.clone());
        product
    }

    /// Give `user` a payout account with the given cached onboarding state.
    pub fn seed_account(&self, user: UserId, account_id: &str, onboarding_complete: bool) {
        let now = Utc::now();
        let account = PayoutAccount {
            user_id: user,
            account_id: PayoutAccountId::parse(account_id)
                .unwrap_or_else(|e| panic!("bad seed account: {e}")),
            onboarding_complete,
            created_at: now,
            updated_at: now,
        };
        self.inner().accounts.insert(user, account);
    }

    pub fn quantity(&self, id: ProductId) -> Option<i32> {
        self.inner().products.get(&id).map(|p| p.quantity)
    }

    pub fn purchase(&self, id: PurchaseId) -> Option<Purchase> {
        self.inner().purchases.get(&id).cloned()
    }

    pub fn purchase_count(&self) -> usize {
        self.inner().purchases.len()
    }

    /// Number of writes (inserts and completions) made to purchases.
    pub fn purchase_writes(&self) -> usize {
        self.inner().purchase_writes
    }

    pub fn account(&self, user: UserId) -> Option<PayoutAccount> {
        self.inner().accounts.get(&user).cloned()
    }
}

fn decrement(product: &mut Product, amount: i32) -> Result<(), RepositoryError> {
    if amount <= 0 {
        return Err(RepositoryError::InvalidAmount(amount));
    }
    if amount > product.quantity {
        return Err(RepositoryError::InsufficientInventory {
            requested: amount,
            available: product.quantity,
        });
    }
    product.quantity -= amount;
    product.updated_at = Utc::now();
    Ok(())
}

impl CatalogStore for MemoryStore {
    async fn create_product(
        &self,
        owner: UserId,
        product: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        let mut inner = self.inner();
        inner.next_product_id += 1;
        let now = Utc::now();
        let created = Product {
            id: ProductId::new(inner.next_product_id),
            owner_id: owner,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            quantity: product.quantity,
            created_at: now,
            updated_at: now,
        };
        inner.products.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.inner().products.get(&id).cloned())
    }

    async fn update_product(
        &self,
        owner: UserId,
        id: ProductId,
        product: &NewProduct,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut inner = self.inner();
        let Some(existing) = inner.products.get_mut(&id).filter(|p| p.owner_id == owner) else {
            return Ok(None);
        };
        existing.name.clone_from(&product.name);
        existing.description.clone_from(&product.description);
        existing.price = product.price;
        existing.quantity = product.quantity;
        existing.updated_at = Utc::now();
        Ok(Some(existing.clone()))
    }

    async fn delete_product(&self, owner: UserId, id: ProductId) -> Result<bool, RepositoryError> {
        let mut inner = self.inner();
        if inner.products.get(&id).is_some_and(|p| p.owner_id == owner) {
            inner.products.remove(&id);
            for purchase in inner.purchases.values_mut() {
                if purchase.product_id == Some(id) {
                    purchase.product_id = None;
                }
            }
            return Ok(true);
        }
        Ok(false)
    }

    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Product>, RepositoryError> {
        Ok(self
            .inner()
            .products
            .values()
            .filter(|p| p.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn list_excluding_owner(&self, owner: UserId) -> Result<Vec<Product>, RepositoryError> {
        Ok(self
            .inner()
            .products
            .values()
            .filter(|p| p.owner_id != owner)
            .cloned()
            .collect())
    }

    async fn decrement_quantity(
        &self,
        id: ProductId,
        amount: i32,
    ) -> Result<Product, RepositoryError> {
        let mut inner = self.inner();
        let product = inner.products.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        decrement(product, amount)?;
        Ok(product.clone())
    }
}

impl PurchaseLedger for MemoryStore {
    async fn reserve(
        &self,
        buyer: UserId,
        product: ProductId,
        quantity: i32,
    ) -> Result<Purchase, RepositoryError> {
        // One guard covers the check, the decrement and the insert.
        let mut inner = self.inner();
        let locked = inner.products.get_mut(&product).ok_or(RepositoryError::NotFound)?;
        decrement(locked, quantity)?;

        let purchase = Purchase {
            id: PurchaseId::generate(),
            buyer_id: buyer,
            product_id: Some(locked.id),
            product_name: locked.name.clone(),
            unit_price: locked.price,
            quantity,
            status: PurchaseStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
        };
        inner.purchases.insert(purchase.id, purchase.clone());
        inner.purchase_writes += 1;
        Ok(purchase)
    }

    async fn get_purchase(&self, id: PurchaseId) -> Result<Option<Purchase>, RepositoryError> {
        Ok(self.inner().purchases.get(&id).cloned())
    }

    async fn mark_completed(&self, id: PurchaseId) -> Result<Completion, RepositoryError> {
        let mut inner = self.inner();
        let Some(purchase) = inner.purchases.get_mut(&id) else {
            return Ok(Completion::NotFound);
        };
        if purchase.is_completed() {
            return Ok(Completion::AlreadyCompleted(purchase.clone()));
        }
        purchase.status = purchase.status.complete();
        purchase.completed_at = Some(Utc::now());
        let completed = purchase.clone();
        inner.purchase_writes += 1;
        Ok(Completion::Completed(completed))
    }

    async fn list_by_buyer(&self, buyer: UserId) -> Result<Vec<Purchase>, RepositoryError> {
        let mut purchases: Vec<Purchase> = self
            .inner()
            .purchases
            .values()
            .filter(|p| p.buyer_id == buyer)
            .cloned()
            .collect();
        purchases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(purchases)
    }
}

impl PayoutAccountStore for MemoryStore {
    async fn get_by_user(&self, user: UserId) -> Result<Option<PayoutAccount>, RepositoryError> {
        Ok(self.inner().accounts.get(&user).cloned())
    }

    async fn insert(
        &self,
        user: UserId,
        account_id: &PayoutAccountId,
    ) -> Result<PayoutAccount, RepositoryError> {
        let mut inner = self.inner();
        if inner.accounts.contains_key(&user) {
            return Err(RepositoryError::Conflict("payout account already exists".to_string()));
        }
        let now = Utc::now();
        let account = PayoutAccount {
            user_id: user,
            account_id: account_id.clone(),
            onboarding_complete: false,
            created_at: now,
            updated_at: now,
        };
        inner.accounts.insert(user, account.clone());
        Ok(account)
    }

    async fn set_onboarding_complete(
        &self,
        user: UserId,
        complete: bool,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner();
        let account = inner.accounts.get_mut(&user).ok_or(RepositoryError::NotFound)?;
        account.onboarding_complete = complete;
        account.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Default)]
struct FakeState {
    accounts: HashMap<String, AccountStatus>,
    accounts_created: usize,
    sessions: Vec<CheckoutSessionRequest>,
    failing: bool,
}

/// Payment provider double that records calls.
#[derive(Debug, Clone, Default)]
pub struct FakeProvider {
    state: Arc<Mutex<FakeState>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every subsequent call fail.
    pub fn set_failing(&self, failing: bool) {
        self.state().failing = failing;
    }

    /// Report `account` as fully onboarded.
    pub fn complete_onboarding(&self, account: &PayoutAccountId) {
        self.state().accounts.insert(
            account.as_str().to_string(),
            AccountStatus {
                charges_enabled: true,
                details_submitted: true,
            },
        );
    }

    pub fn accounts_created(&self) -> usize {
        self.state().accounts_created
    }

    pub fn sessions(&self) -> Vec<CheckoutSessionRequest> {
        self.state().sessions.clone()
    }

    fn check_available(&self) -> Result<(), ProviderError> {
        if self.state().failing {
            return Err(ProviderError::Unavailable("fake provider is down".to_string()));
        }
        Ok(())
    }
}

impl PayoutAccountProvider for FakeProvider {
    async fn create_account(
        &self,
        _email: &Email,
        _country: &str,
    ) -> Result<PayoutAccountId, ProviderError> {
        self.check_available()?;
        let mut state = self.state();
        state.accounts_created += 1;
        let id = format!("acct_fake{}", state.accounts_created);
        state.accounts.insert(
            id.clone(),
            AccountStatus {
                charges_enabled: false,
                details_submitted: false,
            },
        );
        PayoutAccountId::parse(&id).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    async fn get_account(&self, account: &PayoutAccountId) -> Result<AccountStatus, ProviderError> {
        self.check_available()?;
        self.state()
            .accounts
            .get(account.as_str())
            .copied()
            .ok_or_else(|| ProviderError::InvalidResponse(format!("no such account {account}")))
    }

    async fn create_onboarding_link(
        &self,
        account: &PayoutAccountId,
        _refresh_url: &Url,
        _return_url: &Url,
    ) -> Result<Url, ProviderError> {
        self.check_available()?;
        Url::parse(&format!("https://connect.fake/setup/{account}"))
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

impl CheckoutSessionProvider for FakeProvider {
    async fn create_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CreatedSession, ProviderError> {
        self.check_available()?;
        let mut state = self.state();
        state.sessions.push(request.clone());
        let id = format!("cs_fake_{}", state.sessions.len());
        let redirect_url = Url::parse(&format!("https://checkout.fake/pay/{id}"))
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(CreatedSession { id, redirect_url })
    }
}

/// Webhook signing secret used by [`app_state`].
pub const TEST_WEBHOOK_SECRET: &str = "whsec_router_tests_only";

/// Application state for router tests.
///
/// The pool connects lazily and points nowhere, so only routes that never
/// reach the database can be exercised with it.
#[allow(clippy::unwrap_used)]
pub fn app_state() -> crate::state::AppState {
    use std::time::Duration;

    use secrecy::SecretString;

    use crate::config::{MarketplaceConfig, SentryConfig, StripeConfig};

    let database_url = "postgres://marketplace@127.0.0.1:1/marketplace_test";
    let config = MarketplaceConfig {
        database_url: SecretString::from(database_url.to_string()),
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port: 3000,
        base_url: Url::parse("https://market.test").unwrap(),
        session_secret: SecretString::from("k8Jq2mXv9Lp4Rt7Wz1Nc6Hb3Gf5Ds0Ay".to_string()),
        stripe: StripeConfig {
            api_base: Url::parse("http://127.0.0.1:9").unwrap(),
            secret_key: SecretString::from("sk_test_router".to_string()),
            webhook_secret: SecretString::from(TEST_WEBHOOK_SECRET.to_string()),
            account_country: "BG".to_string(),
            timeout: Duration::from_secs(1),
            webhook_tolerance: Duration::from_secs(300),
        },
        sentry: SentryConfig::default(),
    };
    let pool = sqlx::postgres::PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(200))
        .connect_lazy(database_url)
        .unwrap();

    crate::state::AppState::new(config, pool).unwrap()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SELLER: UserId = UserId::new(1);

    #[tokio::test]
    async fn test_decrement_quantity() {
        let store = MemoryStore::new();
        let product = store.seed_product(SELLER, "10.00", CurrencyCode::USD, 5);

        let updated = store.decrement_quantity(product.id, 2).await.unwrap();

        assert_eq!(updated.quantity, 3);
        assert_eq!(store.quantity(product.id), Some(3));
    }

    #[tokio::test]
    async fn test_decrement_quantity_beyond_stock_changes_nothing() {
        let store = MemoryStore::new();
        let product = store.seed_product(SELLER, "10.00", CurrencyCode::USD, 2);

        let result = store.decrement_quantity(product.id, 3).await;

        assert!(matches!(
            result,
            Err(RepositoryError::InsufficientInventory {
                requested: 3,
                available: 2
            })
        ));
        assert_eq!(store.quantity(product.id), Some(2));
    }

    #[tokio::test]
    async fn test_decrement_quantity_rejects_non_positive_amount() {
        let store = MemoryStore::new();
        let product = store.seed_product(SELLER, "10.00", CurrencyCode::USD, 2);

        for amount in [0, -5] {
            let result = store.decrement_quantity(product.id, amount).await;
            assert!(matches!(result, Err(RepositoryError::InvalidAmount(a)) if a == amount));
        }
        assert_eq!(store.quantity(product.id), Some(2));
    }

    #[tokio::test]
    async fn test_decrement_quantity_unknown_product() {
        let store = MemoryStore::new();

        let result = store.decrement_quantity(ProductId::new(99), 1).await;

        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }
}
