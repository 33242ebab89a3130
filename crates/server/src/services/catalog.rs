//! Product catalog operations.
//!
//! Writes are scoped to the owner: editing or deleting someone else's
//! listing is indistinguishable from the listing not existing.

use serde::Serialize;
use thiserror::Error;

use marketplace_core::{ProductId, UserId};

use crate::db::{CatalogStore, RepositoryError};
use crate::models::{Product, ProductInput, ValidationError};

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("product not found")]
    NotFound,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A listing as seen by a particular viewer.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    /// Whether the viewer may start a checkout for this listing.
    pub can_buy: bool,
    pub is_owner: bool,
}

/// Catalog service.
pub struct CatalogService<C> {
    store: C,
}

impl<C: CatalogStore> CatalogService<C> {
    #[must_use]
    pub const fn new(store: C) -> Self {
        Self { store }
    }

    /// Create a listing owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for bad input.
    pub async fn create(&self, owner: UserId, input: ProductInput) -> Result<Product, CatalogError> {
        let product = input.validate()?;
        let created = self.store.create_product(owner, &product).await?;
        tracing::info!(product_id = %created.id, owner_id = %owner, "Product created");
        Ok(created)
    }

    /// Replace the fields of one of `owner`'s listings.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the listing does not exist or is
    /// not owned by `owner`.
    pub async fn update(
        &self,
        owner: UserId,
        id: ProductId,
        input: ProductInput,
    ) -> Result<Product, CatalogError> {
        let product = input.validate()?;
        self.store
            .update_product(owner, id, &product)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// Delete one of `owner`'s listings. Past purchases keep their snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the listing does not exist or is
    /// not owned by `owner`.
    pub async fn delete(&self, owner: UserId, id: ProductId) -> Result<(), CatalogError> {
        if self.store.delete_product(owner, id).await? {
            tracing::info!(product_id = %id, owner_id = %owner, "Product deleted");
            Ok(())
        } else {
            Err(CatalogError::NotFound)
        }
    }

    /// A listing with the viewer's permissions.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the listing does not exist.
    pub async fn detail(
        &self,
        viewer: Option<UserId>,
        id: ProductId,
    ) -> Result<ProductDetail, CatalogError> {
        let product = self.store.get_product(id).await?.ok_or(CatalogError::NotFound)?;
        let is_owner = viewer.is_some_and(|v| product.is_owned_by(v));
        let can_buy = viewer.is_some() && !is_owner && product.quantity > 0;

        Ok(ProductDetail {
            product,
            can_buy,
            is_owner,
        })
    }

    /// Listings owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn mine(&self, owner: UserId) -> Result<Vec<Product>, CatalogError> {
        Ok(self.store.list_by_owner(owner).await?)
    }

    /// Listings `viewer` could buy from.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn others(&self, viewer: UserId) -> Result<Vec<Product>, CatalogError> {
        Ok(self.store.list_excluding_owner(viewer).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::*;
    use crate::testing::MemoryStore;

    const ALICE: UserId = UserId::new(1);
    const BOB: UserId = UserId::new(2);

    fn input(name: &str, quantity: i32) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            description: String::new(),
            price: Decimal::from_str("10.00").unwrap(),
            currency: "USD".to_string(),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_mine_and_others_partition_listings() {
        let catalog = CatalogService::new(MemoryStore::new());
        let a = catalog.create(ALICE, input("Lamp", 1)).await.unwrap();
        let b = catalog.create(BOB, input("Chair", 1)).await.unwrap();

        let mine: Vec<_> = catalog.mine(ALICE).await.unwrap().into_iter().map(|p| p.id).collect();
        let others: Vec<_> = catalog.others(ALICE).await.unwrap().into_iter().map(|p| p.id).collect();

        assert_eq!(mine, vec![a.id]);
        assert_eq!(others, vec![b.id]);
    }

    #[tokio::test]
    async fn test_non_owner_edit_and_delete_look_like_not_found() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(store.clone());
        let product = catalog.create(ALICE, input("Lamp", 4)).await.unwrap();

        assert!(matches!(
            catalog.update(BOB, product.id, input("Stolen", 9)).await,
            Err(CatalogError::NotFound)
        ));
        assert!(matches!(
            catalog.delete(BOB, product.id).await,
            Err(CatalogError::NotFound)
        ));
        assert_eq!(store.quantity(product.id), Some(4));

        let updated = catalog.update(ALICE, product.id, input("Desk lamp", 3)).await.unwrap();
        assert_eq!(updated.name, "Desk lamp");
        catalog.delete(ALICE, product.id).await.unwrap();
        assert_eq!(store.quantity(product.id), None);
    }

    #[tokio::test]
    async fn test_detail_can_buy() {
        let catalog = CatalogService::new(MemoryStore::new());
        let in_stock = catalog.create(ALICE, input("Lamp", 2)).await.unwrap();
        let sold_out = catalog.create(ALICE, input("Vase", 0)).await.unwrap();

        assert!(catalog.detail(Some(BOB), in_stock.id).await.unwrap().can_buy);
        assert!(!catalog.detail(Some(ALICE), in_stock.id).await.unwrap().can_buy);
        assert!(!catalog.detail(None, in_stock.id).await.unwrap().can_buy);
        assert!(!catalog.detail(Some(BOB), sold_out.id).await.unwrap().can_buy);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let catalog = CatalogService::new(MemoryStore::new());
        assert!(matches!(
            catalog.create(ALICE, input("", 1)).await,
            Err(CatalogError::Validation(ValidationError::EmptyName))
        ));
    }
}
