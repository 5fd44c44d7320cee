//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are stored as integer minor units (cents) and exposed as
//! [`Decimal`] amounts in standard units. Parsing rejects anything that
//! cannot round-trip losslessly through minor units.

use core::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when parsing a [`Price`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum PriceError {
    /// The amount is negative.
    #[error("price cannot be negative")]
    Negative,
    /// The amount has more than two decimal places.
    #[error("price must have at most two decimal places")]
    TooPrecise,
    /// The amount does not fit in 64-bit minor units.
    #[error("price is out of range")]
    OutOfRange,
}

/// A non-negative monetary amount held as cents.
///
/// Serializes as a decimal string in standard units (e.g. `"19.99"`) and
/// deserializes from either a JSON string or number.
///
/// ```
/// use rust_decimal::Decimal;
/// use verdant_core::Price;
///
/// let price = Price::parse(Decimal::new(1999, 2)).unwrap();
/// assert_eq!(price.cents(), 1999);
/// assert_eq!(price.to_string(), "19.99");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Price {
    cents: i64,
}

impl Price {
    /// Parse a `Price` from a decimal amount in standard units.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative, has more than two decimal
    /// places, or overflows 64-bit minor units.
    pub fn parse(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }

        let normalized = amount.normalize();
        if normalized.scale() > 2 {
            return Err(PriceError::TooPrecise);
        }

        let cents = normalized
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|c| c.to_i64())
            .ok_or(PriceError::OutOfRange)?;

        Ok(Self { cents })
    }

    /// Create a `Price` from minor units (cents).
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// The amount in minor units (cents).
    #[must_use]
    pub const fn cents(&self) -> i64 {
        self.cents
    }

    /// The amount in standard units, always at two decimal places.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        Decimal::new(self.cents, 2)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.amount())
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Serialize::serialize(&self.amount(), serializer)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize<'de>>::deserialize(deserializer)?;
        Self::parse(amount).map_err(serde::de::Error::custom)
    }
}
