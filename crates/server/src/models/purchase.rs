//! Purchase records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use marketplace_core::{Money, ProductId, PurchaseId, PurchaseStatus, UserId};

/// A buyer's purchase of a product.
///
/// Name, unit price and currency are captured when the purchase is reserved
/// and do not follow later edits to the product. The product reference is
/// cleared if the seller deletes the listing.
#[derive(Debug, Clone, Serialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub buyer_id: UserId,
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: i32,
    pub status: PurchaseStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Purchase {
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.status.is_completed()
    }
}

/// Outcome of marking a purchase completed.
#[derive(Debug, Clone)]
pub enum Completion {
    /// The purchase was pending and is now completed.
    Completed(Purchase),
    /// The purchase was already completed; nothing was written.
    AlreadyCompleted(Purchase),
    /// No purchase has this ID.
    NotFound,
}
