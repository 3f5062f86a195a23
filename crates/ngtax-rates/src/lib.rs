#![deny(missing_docs)]

//! # ngtax-rates — Statutory Rate Table and Merge Resolver
//!
//! - [`table`]: the [`RateTable`] and the compiled-in Nigerian base schedule.
//! - [`path`]: canonical override paths ([`FieldPath`]) and their kinds.
//! - [`value`]: typed override values and JSON coercion.
//! - [`provenance`]: override entries, sources and snapshots.
//! - [`merge`]: base + snapshot → [`EffectiveConfig`].
//!
//! Everything here is pure and synchronous. Concurrency (the override store
//! and the remote refresh cache) lives in `ngtax-overrides`.

pub mod error;
pub mod merge;
pub mod path;
pub mod provenance;
pub mod table;
pub mod value;

pub use error::OverrideError;
pub use merge::{merge, AppliedOverride, DroppedOverride, EffectiveConfig};
pub use path::{FieldKind, FieldPath};
pub use provenance::{OverrideEntry, OverrideSnapshot, OverrideSource};
pub use table::{
    load_base_rates, normalize_industry, try_load_base_rates, CitConfig, CraCombination,
    CraConfig, ItfLevy, LevyRates, NaseniLevy, NsitfLevy, PitBand, PoliceLevy, RateTable,
    BASE_RATES_LABEL,
};
pub use value::OverrideValue;
