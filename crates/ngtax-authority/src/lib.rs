//! # ngtax-authority — Remote Rate Authority Client
//!
//! Typed HTTP access to the service that publishes rate override deltas.
//! The client implements [`ngtax_overrides::RateAuthority`]; the refresh
//! cache in `ngtax-overrides` owns scheduling, timeouts and back-off.
//!
//! ## Endpoint
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | GET    | `/v1/rate-overrides` | [`ngtax_overrides::RemoteOverrides`] |

pub mod client;
pub mod config;

pub use client::HttpRateAuthority;
pub use config::{AuthorityConfig, AuthorityConfigError};
