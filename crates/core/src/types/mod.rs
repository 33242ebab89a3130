//! Core types for the marketplace.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod account;
pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use account::{PayoutAccountId, PayoutAccountIdError};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, CurrencyError, Money, MoneyError};
pub use status::PurchaseStatus;
