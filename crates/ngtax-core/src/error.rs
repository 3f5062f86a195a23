//! # Error Hierarchy
//!
//! Structured error types for the rate engine, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! The variants follow the way each failure is handled:
//!
//! - [`ValidationError`] is returned to the caller and never retried.
//! - [`UnknownFieldError`] is returned by the admin surface and skipped
//!   (with a warning) when it arrives from the remote authority.
//! - [`RefreshTransportError`] stays inside the refresh cache. Calculations
//!   never observe it.
//! - [`ConfigIntegrityError`] is recovered by the merge resolver, which
//!   drops the offending override and keeps the base value.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::amount::MAX_AMOUNT;

/// Top-level error type for the rate engine.
#[derive(Error, Debug)]
pub enum NgTaxError {
    /// A value was rejected by domain validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// An override addressed a field the rate table does not have.
    #[error(transparent)]
    UnknownField(#[from] UnknownFieldError),

    /// The rate table violates a structural invariant.
    #[error("configuration integrity error: {0}")]
    Integrity(#[from] ConfigIntegrityError),

    /// The remote rate authority could not be reached or answered badly.
    #[error("refresh transport error: {0}")]
    Transport(#[from] RefreshTransportError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A value failed range, sign, or type validation.
///
/// Every variant names the field so the caller can point at the exact input
/// that was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A monetary amount or threshold was negative.
    #[error("{field} must be non-negative, got {value}")]
    Negative {
        /// Field path or input name.
        field: String,
        /// The rejected value.
        value: Decimal,
    },

    /// An amount exceeded [`MAX_AMOUNT`](crate::MAX_AMOUNT) in magnitude.
    #[error("{field} must not exceed {limit} in magnitude, got {value}")]
    TooLarge {
        /// Field path or input name.
        field: String,
        /// The rejected value.
        value: Decimal,
        /// The cap.
        limit: Decimal,
    },

    /// A rate fell outside the closed interval `[0, 1]`.
    #[error("{field} must be a fraction in [0, 1], got {value}")]
    RateOutOfRange {
        /// Field path or input name.
        field: String,
        /// The rejected value.
        value: Decimal,
    },

    /// The value had the wrong JSON shape for the field.
    #[error("{field} has the wrong type: expected {expected}")]
    WrongType {
        /// Field path or input name.
        field: String,
        /// Human-readable description of the accepted shape.
        expected: &'static str,
    },

    /// The value is well-typed but otherwise unacceptable.
    #[error("{field} is invalid: {reason}")]
    Invalid {
        /// Field path or input name.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Applying the value would break a structural invariant of the table.
    #[error("{field} would break the rate table: {source}")]
    Integrity {
        /// Field path of the override.
        field: String,
        /// The invariant that would be violated.
        #[source]
        source: ConfigIntegrityError,
    },
}

impl ValidationError {
    /// The field path or input name this error refers to.
    pub fn field(&self) -> &str {
        match self {
            Self::Negative { field, .. }
            | Self::TooLarge { field, .. }
            | Self::RateOutOfRange { field, .. }
            | Self::WrongType { field, .. }
            | Self::Invalid { field, .. }
            | Self::Integrity { field, .. } => field,
        }
    }

    /// Reject `value` if it is negative.
    pub fn ensure_non_negative(field: &str, value: Decimal) -> Result<Decimal, Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(Self::Negative {
                field: field.to_string(),
                value,
            });
        }
        Ok(value)
    }

    /// Reject `value` if it is negative or above [`MAX_AMOUNT`].
    pub fn ensure_amount(field: &str, value: Decimal) -> Result<Decimal, Self> {
        Self::ensure_non_negative(field, value)?;
        Self::ensure_magnitude(field, value)
    }

    /// Reject `value` if its magnitude exceeds [`MAX_AMOUNT`]. Signed inputs
    /// such as profits, where a loss is meaningful, go through this check.
    pub fn ensure_magnitude(field: &str, value: Decimal) -> Result<Decimal, Self> {
        if value.abs() > MAX_AMOUNT {
            return Err(Self::TooLarge {
                field: field.to_string(),
                value,
                limit: MAX_AMOUNT,
            });
        }
        Ok(value)
    }
}

/// An override path that does not resolve to a field of the rate table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown field path: \"{path}\"")]
pub struct UnknownFieldError {
    /// The path exactly as it was supplied.
    pub path: String,
}

impl UnknownFieldError {
    /// Build an error for `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Structural invariant violations of a rate table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigIntegrityError {
    /// The PIT schedule has no bands at all.
    #[error("PIT schedule has no bands")]
    NoBands,

    /// The first PIT band does not start at zero.
    #[error("first PIT band must start at 0, starts at {lower}")]
    FirstBandNotZero {
        /// Lower bound of band 0.
        lower: Decimal,
    },

    /// A band's upper bound does not exceed its lower bound.
    #[error("PIT band {index} has upper bound {upper} not above lower bound {lower}")]
    EmptyBand {
        /// Band index.
        index: usize,
        /// Lower bound.
        lower: Decimal,
        /// Upper bound.
        upper: Decimal,
    },

    /// Adjacent bands leave a gap or overlap.
    #[error("PIT band {index} starts at {found}, previous band ends at {expected}")]
    BandGap {
        /// Index of the band whose lower bound is wrong.
        index: usize,
        /// The previous band's upper bound.
        expected: Decimal,
        /// The lower bound actually found.
        found: Decimal,
    },

    /// A band other than the last has no upper bound.
    #[error("PIT band {index} is unbounded but is not the last band")]
    UnboundedBandNotLast {
        /// Band index.
        index: usize,
    },

    /// The last band has an upper bound, leaving income above it untaxed.
    #[error("last PIT band must be unbounded, ends at {upper}")]
    LastBandBounded {
        /// Upper bound of the last band.
        upper: Decimal,
    },

    /// A threshold or amount in the table is negative.
    #[error("{field} must be non-negative, got {value}")]
    NegativeAmount {
        /// Field path.
        field: String,
        /// The offending value.
        value: Decimal,
    },

    /// An amount or threshold in the table exceeds the engine-wide cap.
    #[error("{field} must not exceed {limit}, got {value}")]
    AmountTooLarge {
        /// Field path.
        field: String,
        /// The offending value.
        value: Decimal,
        /// The cap.
        limit: Decimal,
    },

    /// A rate in the table is outside `[0, 1]`.
    #[error("{field} must be a fraction in [0, 1], got {value}")]
    RateOutOfRange {
        /// Field path.
        field: String,
        /// The offending value.
        value: Decimal,
    },

    /// Two thresholds are out of order.
    #[error("{lower_field} ({lower}) must not exceed {upper_field} ({upper})")]
    ThresholdOrder {
        /// Field path of the smaller threshold.
        lower_field: String,
        /// Its value.
        lower: Decimal,
        /// Field path of the larger threshold.
        upper_field: String,
        /// Its value.
        upper: Decimal,
    },
}

/// Failures talking to the remote rate authority.
///
/// `Clone` so a failure can be recorded in refresh state and replayed by
/// test doubles.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshTransportError {
    /// The fetch did not complete within the configured timeout.
    #[error("rate authority did not respond within {timeout_ms}ms")]
    Timeout {
        /// The timeout that elapsed.
        timeout_ms: u64,
    },

    /// The request could not be sent or the connection failed.
    #[error("HTTP request to {endpoint} failed: {message}")]
    Http {
        /// The endpoint that was called.
        endpoint: String,
        /// Transport-level description.
        message: String,
    },

    /// The authority answered with a non-success status.
    #[error("rate authority {endpoint} returned {status}: {body}")]
    Status {
        /// The endpoint that was called.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response body (truncated by the caller).
        body: String,
    },

    /// The payload could not be decoded.
    #[error("malformed payload from {endpoint}: {message}")]
    Malformed {
        /// The endpoint that was called.
        endpoint: String,
        /// Decoder message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_names_field() {
        let err = ValidationError::RateOutOfRange {
            field: "pitBands[0].rate".to_string(),
            value: Decimal::new(15, 1),
        };
        let msg = format!("{err}");
        assert!(msg.contains("pitBands[0].rate"));
        assert!(msg.contains("1.5"));
        assert_eq!(err.field(), "pitBands[0].rate");
    }

    #[test]
    fn integrity_cause_is_exposed_as_source() {
        use std::error::Error as _;
        let err = ValidationError::Integrity {
            field: "pitBands[1].lowerBound".to_string(),
            source: ConfigIntegrityError::BandGap {
                index: 1,
                expected: Decimal::new(300_000, 0),
                found: Decimal::new(250_000, 0),
            },
        };
        assert!(format!("{err}").contains("pitBands[1].lowerBound"));
        let source = err.source().map(|s| s.to_string()).unwrap_or_default();
        assert!(source.contains("250000"));
    }

    #[test]
    fn ensure_non_negative_accepts_zero() {
        assert!(ValidationError::ensure_non_negative("grossIncome", Decimal::ZERO).is_ok());
        let err = ValidationError::ensure_non_negative("grossIncome", Decimal::new(-1, 0))
            .unwrap_err();
        assert_eq!(err.field(), "grossIncome");
    }

    #[test]
    fn unknown_field_display_quotes_path() {
        let err = NgTaxError::from(UnknownFieldError::new("pitBands[9].rate"));
        assert_eq!(format!("{err}"), "unknown field path: \"pitBands[9].rate\"");
    }

    #[test]
    fn transport_timeout_display() {
        let err = NgTaxError::Transport(RefreshTransportError::Timeout { timeout_ms: 5000 });
        let msg = format!("{err}");
        assert!(msg.contains("refresh transport error"));
        assert!(msg.contains("5000ms"));
    }

    #[test]
    fn status_error_carries_body() {
        let err = RefreshTransportError::Status {
            endpoint: "http://authority/v1/rate-overrides".to_string(),
            status: 503,
            body: "maintenance".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("503"));
        assert!(msg.contains("maintenance"));
    }

    #[test]
    fn threshold_order_display() {
        let err = ConfigIntegrityError::ThresholdOrder {
            lower_field: "cit.smallCompanyThreshold".to_string(),
            lower: Decimal::new(200_000_000, 0),
            upper_field: "cit.mediumCompanyThreshold".to_string(),
            upper: Decimal::new(100_000_000, 0),
        };
        let msg = format!("{err}");
        assert!(msg.contains("cit.smallCompanyThreshold"));
        assert!(msg.contains("cit.mediumCompanyThreshold"));
    }
}
