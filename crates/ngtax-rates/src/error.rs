//! Errors raised while resolving or applying an override.

use ngtax_core::{NgTaxError, UnknownFieldError, ValidationError};
use thiserror::Error;

/// Why an override was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverrideError {
    /// The path does not name a field of the rate table.
    #[error(transparent)]
    UnknownField(#[from] UnknownFieldError),

    /// The value is out of range, mistyped, or breaks a table invariant.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl OverrideError {
    /// The path or field the error refers to.
    pub fn field(&self) -> &str {
        match self {
            Self::UnknownField(e) => &e.path,
            Self::Validation(e) => e.field(),
        }
    }
}

impl From<OverrideError> for NgTaxError {
    fn from(err: OverrideError) -> Self {
        match err {
            OverrideError::UnknownField(e) => NgTaxError::UnknownField(e),
            OverrideError::Validation(e) => NgTaxError::Validation(e),
        }
    }
}
