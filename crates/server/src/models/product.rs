//! Product listings and their input validation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use marketplace_core::{CurrencyCode, CurrencyError, Money, MoneyError, ProductId, UserId};

const MAX_NAME_LENGTH: usize = 200;
const MAX_DESCRIPTION_LENGTH: usize = 5000;
// Largest value a NUMERIC(12, 2) price column holds.
const MAX_PRICE_CENTS: i64 = 999_999_999_999;

/// A product listed by a seller.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub owner_id: UserId,
    pub name: String,
    pub description: String,
    pub price: Money,
    /// Units still available. Never negative.
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether `user` owns this listing.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner_id == user
    }
}

/// Rejected user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name cannot be empty")]
    EmptyName,
    #[error("name must be at most 200 characters")]
    NameTooLong,
    #[error("description must be at most 5000 characters")]
    DescriptionTooLong,
    #[error(transparent)]
    Currency(#[from] CurrencyError),
    #[error("invalid price: {0}")]
    Price(#[from] MoneyError),
    #[error("price must be at most 9999999999.99")]
    PriceTooLarge,
    #[error("quantity cannot be negative")]
    NegativeQuantity,
}

/// Raw create/edit payload for a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub currency: String,
    pub quantity: i32,
}

/// A validated product payload, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub quantity: i32,
}

impl ProductInput {
    /// Validate the payload for both create and edit.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(self) -> Result<NewProduct, ValidationError> {
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(ValidationError::NameTooLong);
        }

        let description = self.description.trim().to_owned();
        if description.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(ValidationError::DescriptionTooLong);
        }

        let currency: CurrencyCode = self.currency.parse()?;
        let price = Money::new(self.price, currency)?;
        if price.amount() > Decimal::new(MAX_PRICE_CENTS, 2) {
            return Err(ValidationError::PriceTooLarge);
        }

        if self.quantity < 0 {
            return Err(ValidationError::NegativeQuantity);
        }

        Ok(NewProduct {
            name,
            description,
            price,
            quantity: self.quantity,
        })
    }
}
