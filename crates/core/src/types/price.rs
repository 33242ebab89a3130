//! Money with ISO 4217 currency codes.
//!
//! Prices are stored in major units (`10.00` USD) with decimal arithmetic. The
//! payment processor expects integer minor units (`1000` cents), so every
//! currency carries its minor-unit exponent and [`Money::to_minor_units`]
//! converts exactly or fails.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Unsupported or malformed currency code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported currency code: {0}")]
pub struct CurrencyError(pub String);

/// Errors from money validation and conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("amount cannot be negative")]
    Negative,
    #[error("{currency} amounts allow at most {max_scale} decimal places")]
    TooPrecise { currency: CurrencyCode, max_scale: u32 },
    #[error("amount is too large")]
    Overflow,
}

/// ISO 4217 currency codes accepted for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    BGN,
    CAD,
    AUD,
    JPY,
}

impl CurrencyCode {
    /// Upper-case ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::BGN => "BGN",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
            Self::JPY => "JPY",
        }
    }

    /// Number of decimal places in the minor unit.
    #[must_use]
    pub const fn minor_unit_exponent(self) -> u32 {
        match self {
            Self::JPY => 0,
            _ => 2,
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CurrencyCode {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "BGN" => Ok(Self::BGN),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            "JPY" => Ok(Self::JPY),
            other => Err(CurrencyError(other.to_owned())),
        }
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CurrencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.code().to_owned()
    }
}

/// A non-negative amount in a specific currency.
///
/// Only built through [`Money::new`], so it serializes but never deserializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Money {
    amount: Decimal,
    currency: CurrencyCode,
}

impl Money {
    /// Validate an amount against its currency.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Negative` for negative amounts and
    /// `MoneyError::TooPrecise` when the amount has more decimal places than
    /// the currency's minor unit (e.g. `1.005` USD or `1.5` JPY).
    pub fn new(amount: Decimal, currency: CurrencyCode) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }
        let max_scale = currency.minor_unit_exponent();
        let normalized = amount.normalize();
        if normalized.scale() > max_scale {
            return Err(MoneyError::TooPrecise {
                currency,
                max_scale,
            });
        }
        Ok(Self {
            amount: normalized,
            currency,
        })
    }

    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Amount in integer minor units (cents for USD, yen for JPY).
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` if the result does not fit in an `i64`.
    pub fn to_minor_units(&self) -> Result<i64, MoneyError> {
        let factor = Decimal::from(10_i64.pow(self.currency.minor_unit_exponent()));
        self.amount
            .checked_mul(factor)
            .and_then(|minor| minor.trunc().to_i64())
            .ok_or(MoneyError::Overflow)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = self.currency.minor_unit_exponent();
        let mut amount = self.amount;
        amount.rescale(scale);
        write!(f, "{amount} {}", self.currency)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for CurrencyCode {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for CurrencyCode {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(s.parse()?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for CurrencyCode {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.code(), buf)
    }
}
