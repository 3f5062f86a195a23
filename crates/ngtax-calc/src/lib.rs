#![deny(missing_docs)]

//! # ngtax-calc — Progressive Tax Calculators
//!
//! Pure functions from a rate table and user-supplied figures to an itemized
//! result. Each result carries the rates it used, so a response can be
//! audited against the configuration it was computed with.
//!
//! Calculators take `&RateTable`. An
//! [`EffectiveConfig`](ngtax_rates::EffectiveConfig) dereferences to one, so
//! the same function serves base-only and overridden configurations.
//!
//! Invalid inputs (negative income, negative amounts, amounts above
//! [`MAX_AMOUNT`](ngtax_core::MAX_AMOUNT)) are rejected with a
//! [`ValidationError`](ngtax_core::ValidationError) naming the field. Totals
//! are accumulated with checked addition, so no input can panic a
//! calculator.

pub mod cgt;
pub mod cit;
pub mod levy;
pub mod pit;
pub mod vat;

pub use cgt::{compute_cgt, compute_cgt_batch, CgtBatchResult, CgtResult, Disposal};
pub use cit::{compute_cit, CitInput, CitResult, CompanySize};
pub use levy::{compute_levies, LevyInput, LevyKind, LevyLine, LevyResult};
pub use pit::{
    compute_pit, consolidated_relief, progressive_tax, BandTax, CraBreakdown, PitInput,
    PitResult, ProgressiveTax,
};
pub use vat::{compute_vat, VatInput, VatResult, VatTreatment};
