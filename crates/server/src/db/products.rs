//! Product repository.
//!
//! Reads and writes listings in `marketplace.products`. Inventory changes go
//! through a row lock (`SELECT ... FOR UPDATE`) so concurrent buyers of the
//! same product serialize on it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use marketplace_core::{CurrencyCode, Money, ProductId, UserId};

use super::{CatalogStore, RepositoryError};
use crate::models::{NewProduct, Product};

const PRODUCT_COLUMNS: &str =
    "id, owner_id, name, description, price, currency, quantity, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    owner_id: i32,
    name: String,
    description: String,
    price: Decimal,
    currency: String,
    quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(r: ProductRow) -> Result<Self, Self::Error> {
        let currency: CurrencyCode = r.currency.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid currency for product {}: {e}", r.id))
        })?;
        let price = Money::new(r.price, currency).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for product {}: {e}", r.id))
        })?;

        Ok(Self {
            id: ProductId::new(r.id),
            owner_id: UserId::new(r.owner_id),
            name: r.name,
            description: r.description,
            price,
            quantity: r.quantity,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Lock a product row for the rest of the current transaction.
pub(super) async fn lock_for_update(
    conn: &mut PgConnection,
    id: ProductId,
) -> Result<Option<Product>, RepositoryError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM marketplace.products WHERE id = $1 FOR UPDATE"
    ))
    .bind(id.as_i32())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Product::try_from).transpose()
}

/// Subtract `amount` from a product the caller has already locked.
///
/// Rejects the change without writing if `amount` is not positive or the
/// quantity would go below zero.
pub(super) async fn apply_decrement(
    conn: &mut PgConnection,
    product: &Product,
    amount: i32,
) -> Result<Product, RepositoryError> {
    if amount <= 0 {
        return Err(RepositoryError::InvalidAmount(amount));
    }
    if amount > product.quantity {
        return Err(RepositoryError::InsufficientInventory {
            requested: amount,
            available: product.quantity,
        });
    }

    let row = sqlx::query_as::<_, ProductRow>(&format!(
        r"
        UPDATE marketplace.products
        SET quantity = quantity - $2, updated_at = NOW()
        WHERE id = $1
        RETURNING {PRODUCT_COLUMNS}
        "
    ))
    .bind(product.id.as_i32())
    .bind(amount)
    .fetch_one(&mut *conn)
    .await?;

    Product::try_from(row)
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_list(&self, sql: &str, owner: UserId) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(sql)
            .bind(owner.as_i32())
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(Product::try_from).collect()
    }
}

impl CatalogStore for ProductRepository<'_> {
    async fn create_product(
        &self,
        owner: UserId,
        product: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO marketplace.products (owner_id, name, description, price, currency, quantity)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(owner.as_i32())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.amount())
        .bind(product.price.currency().code())
        .bind(product.quantity)
        .fetch_one(self.pool)
        .await?;

        Product::try_from(row)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM marketplace.products WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    async fn update_product(
        &self,
        owner: UserId,
        id: ProductId,
        product: &NewProduct,
    ) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE marketplace.products
            SET name = $3, description = $4, price = $5, currency = $6, quantity = $7,
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id.as_i32())
        .bind(owner.as_i32())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.amount())
        .bind(product.price.currency().code())
        .bind(product.quantity)
        .fetch_optional(self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    async fn delete_product(&self, owner: UserId, id: ProductId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM marketplace.products WHERE id = $1 AND owner_id = $2")
                .bind(id.as_i32())
                .bind(owner.as_i32())
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Product>, RepositoryError> {
        self.fetch_list(
            &format!(
                "SELECT {PRODUCT_COLUMNS} FROM marketplace.products \
                 WHERE owner_id = $1 ORDER BY created_at DESC, id DESC"
            ),
            owner,
        )
        .await
    }

    async fn list_excluding_owner(&self, owner: UserId) -> Result<Vec<Product>, RepositoryError> {
        self.fetch_list(
            &format!(
                "SELECT {PRODUCT_COLUMNS} FROM marketplace.products \
                 WHERE owner_id <> $1 ORDER BY created_at DESC, id DESC"
            ),
            owner,
        )
        .await
    }

    async fn decrement_quantity(
        &self,
        id: ProductId,
        amount: i32,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let product = lock_for_update(&mut tx, id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let updated = apply_decrement(&mut tx, &product, amount).await?;

        tx.commit().await?;

        Ok(updated)
    }
}
