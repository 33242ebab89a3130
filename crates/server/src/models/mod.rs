//! Domain models for the marketplace server.
//!
//! These types represent validated domain objects, separate from the row
//! types used by the repositories in [`crate::db`].

pub mod payout_account;
pub mod product;
pub mod purchase;
pub mod session;
pub mod user;

pub use payout_account::{PayoutAccount, PayoutStatus};
pub use product::{NewProduct, Product, ProductInput, ValidationError};
pub use purchase::{Completion, Purchase};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
