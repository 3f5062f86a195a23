#![deny(missing_docs)]

//! # ngtax-core — Foundational Types for the Nigerian Tax Rate Engine
//!
//! Every other crate in the workspace depends on this one. It has no internal
//! crate dependencies.
//!
//! ## Design Principles
//!
//! 1. **Rates are validated fractions.** A [`Rate`] is always within
//!    `[0, 1]`. Monetary amounts are exact [`rust_decimal::Decimal`] values;
//!    floating point never touches money, and no amount exceeds
//!    [`MAX_AMOUNT`].
//!
//! 2. **[`NgTaxError`] hierarchy.** Structured errors with `thiserror`, one
//!    type per handling strategy (see [`error`]).

pub mod amount;
pub mod error;
pub mod id;
pub mod rate;

pub use amount::{checked_add, checked_sum, MAX_AMOUNT};
pub use error::{
    ConfigIntegrityError, NgTaxError, RefreshTransportError, UnknownFieldError, ValidationError,
};
pub use id::OverrideId;
pub use rate::{Rate, RateOutOfRange};

pub use rust_decimal::Decimal;
