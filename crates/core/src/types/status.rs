//! Purchase lifecycle status.

use serde::{Deserialize, Serialize};

/// Lifecycle of a purchase.
///
/// ```text
/// Pending --(checkout.session.completed)--> Completed
/// ```
///
/// `Completed` is terminal. The database stores this as a boolean
/// `completed` column; the enum is the typed view of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    #[default]
    Pending,
    Completed,
}

impl PurchaseStatus {
    /// Map the stored completion flag to a status.
    #[must_use]
    pub const fn from_completed(completed: bool) -> Self {
        if completed {
            Self::Completed
        } else {
            Self::Pending
        }
    }

    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Apply a completion notification.
    ///
    /// Completing is idempotent and there is no transition out of
    /// `Completed`.
    #[must_use]
    pub const fn complete(self) -> Self {
        Self::Completed
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_completed_flag() {
        assert_eq!(PurchaseStatus::from_completed(false), PurchaseStatus::Pending);
        assert_eq!(PurchaseStatus::from_completed(true), PurchaseStatus::Completed);
    }

    #[test]
    fn test_complete_is_idempotent_and_terminal() {
        let once = PurchaseStatus::Pending.complete();
        let twice = once.complete();
        assert_eq!(once, PurchaseStatus::Completed);
        assert_eq!(twice, PurchaseStatus::Completed);
        assert!(twice.is_completed());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&PurchaseStatus::Completed).ok().as_deref(),
            Some("\"completed\"")
        );
    }
}
