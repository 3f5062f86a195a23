#![deny(missing_docs)]

//! # ngtax-overrides — Runtime Overrides and Engine Facade
//!
//! - [`store`]: the thread-safe [`OverrideStore`] with versioned history.
//! - [`authority`]: the [`RateAuthority`] trait the refresh cache pulls from.
//! - [`refresh`]: the TTL / back-off / single-flight [`RefreshCache`].
//! - [`config`]: environment-driven [`EngineConfig`].
//! - [`engine`]: the [`TaxEngine`] facade used by the server and the CLI.
//!
//! ## Concurrency
//!
//! Writers are serialized by a mutex and publish an immutable snapshot by
//! swapping an `Arc`. Readers clone that `Arc` and merge outside any lock.
//! The only suspending operation is the remote fetch, which is bounded by a
//! timeout and never holds a store lock.

pub mod authority;
pub mod config;
pub mod engine;
pub mod refresh;
pub mod store;

pub use authority::{RateAuthority, RemoteDelta, RemoteOverrides, StaticRateAuthority};
pub use config::{ConfigError, EngineConfig};
pub use engine::{
    Assessment, EngineMetadata, OverridesView, RatesUsed, RatesVersionSummary, TaxEngine,
};
pub use refresh::{
    backoff_delay, RefreshCache, RefreshOutcome, RefreshPolicy, RefreshState, RefreshStatus,
    SkippedDelta,
};
pub use store::{ApplyOutcome, OverrideStore, DEFAULT_HISTORY_CAP};
