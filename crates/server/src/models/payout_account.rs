//! Seller payout account types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use marketplace_core::{PayoutAccountId, UserId};

/// Local mapping from a user to their connected account at the payment
/// processor.
#[derive(Debug, Clone, Serialize)]
pub struct PayoutAccount {
    pub user_id: UserId,
    pub account_id: PayoutAccountId,
    /// Last onboarding state reported by the processor (charges enabled and
    /// details submitted).
    pub onboarding_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Whether a user can receive payouts.
///
/// A failed status check is an error, never a `NotRegistered`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "account_id", rename_all = "snake_case")]
pub enum PayoutStatus {
    NotRegistered,
    OnboardingIncomplete(PayoutAccountId),
    Ready(PayoutAccountId),
}
