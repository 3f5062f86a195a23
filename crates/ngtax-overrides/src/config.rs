//! Engine configuration.
//!
//! Defaults suit a production deployment. Override via environment
//! variables or explicit construction for tests.

use std::time::Duration;

use ngtax_rates::BASE_RATES_LABEL;

use crate::refresh::RefreshPolicy;
use crate::store::DEFAULT_HISTORY_CAP;

/// Configuration for a [`TaxEngine`](crate::TaxEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum history entries retained by the override store.
    pub history_cap: usize,
    /// Refresh cache timings.
    pub refresh: RefreshPolicy,
    /// Label reported for the compiled-in base table.
    pub base_label: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_cap: DEFAULT_HISTORY_CAP,
            refresh: RefreshPolicy::default(),
            base_label: BASE_RATES_LABEL.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `NGTAX_HISTORY_CAP` (default: 256)
    /// - `NGTAX_REFRESH_TTL_SECS` (default: 900)
    /// - `NGTAX_FETCH_TIMEOUT_MS` (default: 5000)
    /// - `NGTAX_BACKOFF_BASE_SECS` (default: 30)
    /// - `NGTAX_BACKOFF_CEILING_SECS` (default: 1800)
    /// - `NGTAX_BASE_LABEL` (default: the compiled-in table label)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = RefreshPolicy::default();
        let history_cap = parse_var(&lookup, "NGTAX_HISTORY_CAP")?.unwrap_or(DEFAULT_HISTORY_CAP);
        if history_cap == 0 {
            return Err(ConfigError::InvalidValue {
                var: "NGTAX_HISTORY_CAP".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let secs = |var: &str, default: Duration| -> Result<Duration, ConfigError> {
            Ok(parse_var(&lookup, var)?
                .map(Duration::from_secs)
                .unwrap_or(default))
        };
        let refresh = RefreshPolicy {
            ttl: secs("NGTAX_REFRESH_TTL_SECS", defaults.ttl)?,
            fetch_timeout: parse_var(&lookup, "NGTAX_FETCH_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.fetch_timeout),
            backoff_base: secs("NGTAX_BACKOFF_BASE_SECS", defaults.backoff_base)?,
            backoff_ceiling: secs("NGTAX_BACKOFF_CEILING_SECS", defaults.backoff_ceiling)?,
        };
        if refresh.backoff_ceiling < refresh.backoff_base {
            return Err(ConfigError::InvalidValue {
                var: "NGTAX_BACKOFF_CEILING_SECS".to_string(),
                reason: "must not be below NGTAX_BACKOFF_BASE_SECS".to_string(),
            });
        }

        Ok(Self {
            history_cap,
            refresh,
            base_label: lookup("NGTAX_BASE_LABEL")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| BASE_RATES_LABEL.to_string()),
        })
    }
}

fn parse_var<F, T>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                var: var.to_string(),
                reason: e.to_string(),
            }),
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set but cannot be used.
    #[error("invalid value for {var}: {reason}")]
    InvalidValue {
        /// Variable name.
        var: String,
        /// Parse or range failure.
        reason: String,
    },
}
