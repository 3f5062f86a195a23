//! # Remote Rate Authority Interface
//!
//! The refresh cache pulls override deltas from a [`RateAuthority`].
//! Production deployments use the HTTP client in `ngtax-authority`;
//! development and tests use [`StaticRateAuthority`], which serves a fixed,
//! swappable response.
//!
//! ## Payload
//!
//! ```json
//! {
//!   "sourceTimestamp": "2026-01-15T00:00:00Z",
//!   "deltas": [
//!     { "path": "vatRate", "value": 0.1 },
//!     { "path": "pitBands[0].rate", "value": "0.05",
//!       "sourceTimestamp": "2026-01-14T09:30:00Z", "version": 4 }
//!   ]
//! }
//! ```
//!
//! A delta without its own `sourceTimestamp` inherits the payload's.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ngtax_core::RefreshTransportError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// One `(path, value)` change published by the authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDelta {
    /// Override path, e.g. `pitBands[2].rate`.
    pub path: String,
    /// Raw value; coerced by the store.
    pub value: serde_json::Value,
    /// When the authority published this delta.
    #[serde(default)]
    pub source_timestamp: Option<DateTime<Utc>>,
    /// Authority-assigned version, when it tracks one.
    #[serde(default)]
    pub version: Option<u64>,
}

/// A full response from the authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteOverrides {
    /// Publication time of the payload as a whole.
    pub source_timestamp: DateTime<Utc>,
    /// The deltas.
    #[serde(default)]
    pub deltas: Vec<RemoteDelta>,
}

impl RemoteOverrides {
    /// An empty payload stamped now.
    pub fn empty() -> Self {
        Self {
            source_timestamp: Utc::now(),
            deltas: Vec::new(),
        }
    }

    /// The effective source timestamp of `delta`.
    pub fn timestamp_of(&self, delta: &RemoteDelta) -> DateTime<Utc> {
        delta.source_timestamp.unwrap_or(self.source_timestamp)
    }
}

/// Source of remote override deltas.
///
/// Implementations must be safe to call concurrently; the refresh cache
/// guarantees at most one call in flight per cache, not per authority.
#[async_trait]
pub trait RateAuthority: Send + Sync {
    /// Fetch the current set of deltas.
    async fn fetch_overrides(&self) -> Result<RemoteOverrides, RefreshTransportError>;

    /// Human-readable name of the implementation, used in logs and metadata.
    fn authority_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Static authority
// ---------------------------------------------------------------------------

/// An authority that returns a configured response.
///
/// The response can be swapped at runtime and an artificial latency added,
/// which is how refresh behaviour (timeouts, single flight, back-off) is
/// exercised without a network.
#[derive(Debug)]
pub struct StaticRateAuthority {
    response: Mutex<Result<RemoteOverrides, RefreshTransportError>>,
    latency: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl StaticRateAuthority {
    /// Always answer with `payload`.
    pub fn new(payload: RemoteOverrides) -> Self {
        Self {
            response: Mutex::new(Ok(payload)),
            latency: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always fail with `error`.
    pub fn failing(error: RefreshTransportError) -> Self {
        let authority = Self::new(RemoteOverrides::empty());
        authority.set_response(Err(error));
        authority
    }

    /// Replace the response returned by subsequent fetches.
    pub fn set_response(&self, response: Result<RemoteOverrides, RefreshTransportError>) {
        *self.response.lock() = response;
    }

    /// Delay every fetch by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Number of fetches started so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateAuthority for StaticRateAuthority {
    async fn fetch_overrides(&self) -> Result<RemoteOverrides, RefreshTransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.response.lock().clone()
    }

    fn authority_name(&self) -> &str {
        "StaticRateAuthority"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_deserializes_with_inherited_timestamp() {
        let payload: RemoteOverrides = serde_json::from_value(json!({
            "sourceTimestamp": "2026-01-15T00:00:00Z",
            "deltas": [
                {"path": "vatRate", "value": 0.1},
                {"path": "cgtRate", "value": "0.12", "sourceTimestamp": "2026-01-10T00:00:00Z", "version": 3}
            ]
        }))
        .unwrap();
        assert_eq!(payload.deltas.len(), 2);
        assert_eq!(payload.timestamp_of(&payload.deltas[0]), payload.source_timestamp);
        assert_ne!(payload.timestamp_of(&payload.deltas[1]), payload.source_timestamp);
        assert_eq!(payload.deltas[1].version, Some(3));
    }

    #[tokio::test]
    async fn static_authority_counts_calls() {
        let authority = StaticRateAuthority::new(RemoteOverrides::empty());
        authority.fetch_overrides().await.unwrap();
        authority.fetch_overrides().await.unwrap();
        assert_eq!(authority.calls(), 2);
        assert_eq!(authority.authority_name(), "StaticRateAuthority");
    }

    #[tokio::test]
    async fn failing_authority_returns_error() {
        let authority = StaticRateAuthority::failing(RefreshTransportError::Timeout {
            timeout_ms: 10,
        });
        assert!(authority.fetch_overrides().await.is_err());
    }
}
