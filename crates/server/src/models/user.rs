//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use marketplace_core::{Email, UserId};

/// A registered marketplace user.
///
/// The same user can be a seller (owns products) and a buyer (owns
/// purchases). The password hash lives in its own table and never leaves the
/// repository layer.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}
