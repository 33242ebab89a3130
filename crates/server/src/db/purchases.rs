//! Purchase repository.
//!
//! Reservation (inventory decrement plus pending purchase) runs in a single
//! transaction holding the product row lock. Completion is a conditional
//! update, so a redelivered webhook never writes twice.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use marketplace_core::{
    CurrencyCode, Money, ProductId, PurchaseId, PurchaseStatus, UserId,
};

use super::products::{apply_decrement, lock_for_update};
use super::{PurchaseLedger, RepositoryError};
use crate::models::{Completion, Purchase};

const PURCHASE_COLUMNS: &str = "id, buyer_id, product_id, product_name, unit_price, currency, \
                                quantity, completed, created_at, completed_at";

#[derive(Debug, sqlx::FromRow)]
struct PurchaseRow {
    id: Uuid,
    buyer_id: i32,
    product_id: Option<i32>,
    product_name: String,
    unit_price: Decimal,
    currency: String,
    quantity: i32,
    completed: bool,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<PurchaseRow> for Purchase {
    type Error = RepositoryError;

    fn try_from(r: PurchaseRow) -> Result<Self, Self::Error> {
        let currency: CurrencyCode = r.currency.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid currency for purchase {}: {e}", r.id))
        })?;
        let unit_price = Money::new(r.unit_price, currency).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for purchase {}: {e}", r.id))
        })?;

        Ok(Self {
            id: PurchaseId::from_uuid(r.id),
            buyer_id: UserId::new(r.buyer_id),
            product_id: r.product_id.map(ProductId::new),
            product_name: r.product_name,
            unit_price,
            quantity: r.quantity,
            status: PurchaseStatus::from_completed(r.completed),
            created_at: r.created_at,
            completed_at: r.completed_at,
        })
    }
}

/// Repository for purchase database operations.
pub struct PurchaseRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PurchaseRepository<'a> {
    /// Create a new purchase repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Pending purchases created before `cutoff`, oldest first.
    ///
    /// These are reservations whose checkout never completed. Their units
    /// stay decremented until someone acts on them.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Purchase>, RepositoryError> {
        let rows = sqlx::query_as::<_, PurchaseRow>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM marketplace.purchases \
             WHERE NOT completed AND created_at < $1 ORDER BY created_at ASC"
        ))
        .bind(cutoff)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Purchase::try_from).collect()
    }
}

impl PurchaseLedger for PurchaseRepository<'_> {
    async fn reserve(
        &self,
        buyer: UserId,
        product: ProductId,
        quantity: i32,
    ) -> Result<Purchase, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let locked = lock_for_update(&mut tx, product)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let updated = apply_decrement(&mut tx, &locked, quantity).await?;

        let row = sqlx::query_as::<_, PurchaseRow>(&format!(
            r"
            INSERT INTO marketplace.purchases
                (id, buyer_id, product_id, product_name, unit_price, currency, quantity)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PURCHASE_COLUMNS}
            "
        ))
        .bind(PurchaseId::generate().as_uuid())
        .bind(buyer.as_i32())
        .bind(updated.id.as_i32())
        .bind(&updated.name)
        .bind(updated.price.amount())
        .bind(updated.price.currency().code())
        .bind(quantity)
        .fetch_one(&mut *tx)
        .await?;

        let purchase = Purchase::try_from(row)?;

        tx.commit().await?;

        tracing::debug!(
            purchase_id = %purchase.id,
            product_id = %product,
            remaining = updated.quantity,
            "Reserved inventory"
        );

        Ok(purchase)
    }

    async fn get_purchase(&self, id: PurchaseId) -> Result<Option<Purchase>, RepositoryError> {
        let row = sqlx::query_as::<_, PurchaseRow>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM marketplace.purchases WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        row.map(Purchase::try_from).transpose()
    }

    async fn mark_completed(&self, id: PurchaseId) -> Result<Completion, RepositoryError> {
        let row = sqlx::query_as::<_, PurchaseRow>(&format!(
            r"
            UPDATE marketplace.purchases
            SET completed = TRUE, completed_at = NOW()
            WHERE id = $1 AND completed = FALSE
            RETURNING {PURCHASE_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(Completion::Completed(Purchase::try_from(row)?));
        }

        // No pending row matched: either already completed or unknown.
        Ok(match self.get_purchase(id).await? {
            Some(existing) => Completion::AlreadyCompleted(existing),
            None => Completion::NotFound,
        })
    }

    async fn list_by_buyer(&self, buyer: UserId) -> Result<Vec<Purchase>, RepositoryError> {
        let rows = sqlx::query_as::<_, PurchaseRow>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM marketplace.purchases \
             WHERE buyer_id = $1 ORDER BY created_at DESC"
        ))
        .bind(buyer.as_i32())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Purchase::try_from).collect()
    }
}
