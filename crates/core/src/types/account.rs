//! External payout account identifiers.

use core::fmt;

use serde::{Deserialize, Serialize};

/// The payout account identifier is not in the processor's format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid payout account id: {0:?}")]
pub struct PayoutAccountIdError(pub String);

/// Opaque identifier of a seller's connected account at the payment
/// processor (for example `acct_1Nv0FGQ9RKHgCVdK`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PayoutAccountId(String);

impl PayoutAccountId {
    const MAX_LENGTH: usize = 255;

    /// Wrap an identifier returned by the processor.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is empty, too long or contains
    /// characters other than ASCII alphanumerics and `_`.
    pub fn parse(s: &str) -> Result<Self, PayoutAccountIdError> {
        let valid = !s.is_empty()
            && s.len() <= Self::MAX_LENGTH
            && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
        if valid {
            Ok(Self(s.to_owned()))
        } else {
            Err(PayoutAccountIdError(s.to_owned()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PayoutAccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PayoutAccountId {
    type Error = PayoutAccountIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PayoutAccountId> for String {
    fn from(id: PayoutAccountId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_processor_ids() {
        let id = PayoutAccountId::parse("acct_1Nv0FGQ9RKHgCVdK");
        assert_eq!(id.map(|i| i.to_string()).ok().as_deref(), Some("acct_1Nv0FGQ9RKHgCVdK"));
    }

    #[test]
    fn test_parse_rejects_junk() {
        assert!(PayoutAccountId::parse("").is_err());
        assert!(PayoutAccountId::parse("acct 123").is_err());
        assert!(PayoutAccountId::parse("acct/../x").is_err());
    }
}
