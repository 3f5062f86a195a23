//! # Monetary Amounts
//!
//! Amounts are plain [`Decimal`] values capped at [`MAX_AMOUNT`]
//! (one quadrillion naira). The cap applies to calculator inputs and to
//! every amount or threshold in a rate table, so sums of a handful of
//! amounts stay far inside `Decimal`'s range.
//!
//! Calculators still add through [`checked_add`] and [`checked_sum`]: an
//! overflow becomes a [`ValidationError`] naming the result field instead
//! of a panic.

use rust_decimal::Decimal;

use crate::error::ValidationError;

/// Largest amount accepted anywhere in the engine: 10^15.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// `a + b`, or a validation error on `field` if the sum overflows.
pub fn checked_add(field: &str, a: Decimal, b: Decimal) -> Result<Decimal, ValidationError> {
    a.checked_add(b).ok_or_else(|| overflow(field))
}

/// Sum of `values`, or a validation error on `field` if it overflows.
pub fn checked_sum<I>(field: &str, values: I) -> Result<Decimal, ValidationError>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .ok_or_else(|| overflow(field))
}

fn overflow(field: &str) -> ValidationError {
    ValidationError::Invalid {
        field: field.to_string(),
        reason: "result exceeds the representable range".to_string(),
    }
}
