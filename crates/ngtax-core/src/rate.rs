//! # Rate Newtype
//!
//! Every statutory rate is a fraction in `[0, 1]` (`0.075`, never `7.5`).
//! [`Rate`] makes an out-of-range value unrepresentable: construction,
//! deserialization, and parsing all go through the same bound check.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ValidationError;

/// A validated tax rate, stored as an exact decimal fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Rate(Decimal);

/// A decimal that cannot be used as a [`Rate`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rate must be a fraction in [0, 1], got {0}")]
pub struct RateOutOfRange(pub Decimal);

impl RateOutOfRange {
    /// Attach the field name, producing the caller-facing error.
    pub fn for_field(self, field: &str) -> ValidationError {
        ValidationError::RateOutOfRange {
            field: field.to_string(),
            value: self.0,
        }
    }
}

impl Rate {
    /// The zero rate.
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    /// Validate and wrap a decimal fraction.
    pub fn new(value: Decimal) -> Result<Self, RateOutOfRange> {
        if value < Decimal::ZERO || value > Decimal::ONE {
            return Err(RateOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Build a rate from an integer mantissa and decimal scale,
    /// e.g. `Rate::from_parts(75, 3)` is 7.5%.
    pub fn from_parts(mantissa: i64, scale: u32) -> Result<Self, RateOutOfRange> {
        Self::new(Decimal::new(mantissa, scale))
    }

    /// The underlying fraction.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// `base × rate`, exact. Cannot overflow: the rate is at most 1.
    pub fn apply(&self, base: Decimal) -> Decimal {
        base * self.0
    }
}

impl TryFrom<Decimal> for Rate {
    type Error = RateOutOfRange;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rate> for Decimal {
    fn from(rate: Rate) -> Self {
        rate.0
    }
}

impl FromStr for Rate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|e| ValidationError::Invalid {
            field: "rate".to_string(),
            reason: e.to_string(),
        })?;
        Rate::new(value).map_err(|e| e.for_field("rate"))
    }
}

impl std::fmt::Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
