//! Database operations for the marketplace `PostgreSQL` database.
//!
//! ## Tables (schema `marketplace`)
//!
//! - `users` / `user_passwords` - Site accounts
//! - `payout_accounts` - User to payment processor connected account mapping
//! - `products` - Listings, with a non-negative `quantity` check
//! - `purchases` - Purchase records keyed by the checkout correlation UUID
//!
//! Sessions live in `tower_sessions.session`.
//!
//! # Stores
//!
//! Services depend on the [`CatalogStore`], [`PurchaseLedger`] and
//! [`PayoutAccountStore`] traits. The `PostgreSQL` repositories in this module
//! implement them for production.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p marketplace-cli -- migrate
//! ```

pub mod payout_accounts;
pub mod products;
pub mod purchases;
pub mod users;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use marketplace_core::{PayoutAccountId, ProductId, PurchaseId, UserId};

use crate::models::{Completion, NewProduct, PayoutAccount, Product, Purchase};

pub use payout_accounts::PayoutAccountRepository;
pub use products::ProductRepository;
pub use purchases::PurchaseRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Not enough units left to decrement.
    #[error("insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: i32, available: i32 },

    /// Decrement by zero or a negative amount.
    #[error("invalid decrement amount: {0}")]
    InvalidAmount(i32),
}

/// Product storage, scoped to the owning seller for writes.
pub trait CatalogStore: Send + Sync {
    /// Insert a new listing owned by `owner`.
    fn create_product(
        &self,
        owner: UserId,
        product: &NewProduct,
    ) -> impl Future<Output = Result<Product, RepositoryError>> + Send;

    fn get_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send;

    /// Replace a listing's fields. `None` when the product does not exist or
    /// is not owned by `owner`.
    fn update_product(
        &self,
        owner: UserId,
        id: ProductId,
        product: &NewProduct,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send;

    /// Delete a listing. `false` when the product does not exist or is not
    /// owned by `owner`.
    fn delete_product(
        &self,
        owner: UserId,
        id: ProductId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Listings owned by `owner`.
    fn list_by_owner(
        &self,
        owner: UserId,
    ) -> impl Future<Output = Result<Vec<Product>, RepositoryError>> + Send;

    /// Listings owned by anyone except `owner`.
    fn list_excluding_owner(
        &self,
        owner: UserId,
    ) -> impl Future<Output = Result<Vec<Product>, RepositoryError>> + Send;

    /// Atomically subtract `amount` units.
    ///
    /// Fails with `InvalidAmount` unless `amount` is positive, and with
    /// `InsufficientInventory` when it exceeds the available quantity.
    /// Neither failure changes anything.
    fn decrement_quantity(
        &self,
        id: ProductId,
        amount: i32,
    ) -> impl Future<Output = Result<Product, RepositoryError>> + Send;
}

/// Purchase storage.
pub trait PurchaseLedger: Send + Sync {
    /// Decrement the product's inventory and record a pending purchase as a
    /// single atomic unit.
    ///
    /// The purchase captures the product's name, price and currency as read
    /// under the same lock as the decrement. On `InsufficientInventory` or
    /// `NotFound` nothing is written.
    fn reserve(
        &self,
        buyer: UserId,
        product: ProductId,
        quantity: i32,
    ) -> impl Future<Output = Result<Purchase, RepositoryError>> + Send;

    fn get_purchase(
        &self,
        id: PurchaseId,
    ) -> impl Future<Output = Result<Option<Purchase>, RepositoryError>> + Send;

    /// Flip the completion flag. Writes only when the purchase is pending.
    fn mark_completed(
        &self,
        id: PurchaseId,
    ) -> impl Future<Output = Result<Completion, RepositoryError>> + Send;

    /// Purchases made by `buyer`, newest first.
    fn list_by_buyer(
        &self,
        buyer: UserId,
    ) -> impl Future<Output = Result<Vec<Purchase>, RepositoryError>> + Send;
}

/// Payout account mapping storage.
pub trait PayoutAccountStore: Send + Sync {
    fn get_by_user(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Option<PayoutAccount>, RepositoryError>> + Send;

    /// Record the mapping. `Conflict` if the user already has one.
    fn insert(
        &self,
        user: UserId,
        account_id: &PayoutAccountId,
    ) -> impl Future<Output = Result<PayoutAccount, RepositoryError>> + Send;

    /// Cache the onboarding state last reported by the processor.
    fn set_onboarding_complete(
        &self,
        user: UserId,
        complete: bool,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-constraint violation to `RepositoryError::Conflict`.
pub(crate) fn map_unique_violation(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}
