//! # Remote Refresh Cache
//!
//! Keeps the override store in step with the remote rate authority without
//! letting network trouble reach a calculation.
//!
//! ## State machine
//!
//! | Status       | Condition                                   | Action               |
//! |--------------|---------------------------------------------|----------------------|
//! | `Fresh`      | `now − lastSuccessAt < ttl`                 | no network           |
//! | `Stale`      | not fresh, `now ≥ nextEligibleFetchAt`      | fetch                |
//! | `BackingOff` | not fresh, `now < nextEligibleFetchAt`      | serve existing       |
//! | `NeverFetched` | no attempt yet                            | fetch                |
//!
//! A failed fetch (transport error, bad status, malformed payload, timeout)
//! increments `consecutiveFailureCount` and schedules the next attempt
//! `min(base × 2^(failures−1), ceiling)` later. The published snapshot is
//! untouched, so readers keep the last good configuration.
//!
//! ## Single flight
//!
//! At most one fetch runs per cache. A trigger that finds a fetch in flight
//! returns immediately with [`RefreshOutcome::InFlight`] and the caller
//! serves the existing snapshot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ngtax_core::RefreshTransportError;
use ngtax_rates::{OverrideError, OverrideSource};
use parking_lot::Mutex;
use serde::Serialize;

use crate::authority::{RateAuthority, RemoteOverrides};
use crate::store::{ApplyOutcome, OverrideStore};

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Timing parameters for the refresh cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// How long a successful fetch stays fresh.
    pub ttl: Duration,
    /// Upper bound on a single fetch.
    pub fetch_timeout: Duration,
    /// Delay after the first consecutive failure.
    pub backoff_base: Duration,
    /// Maximum delay between attempts.
    pub backoff_ceiling: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(15 * 60),
            fetch_timeout: Duration::from_secs(5),
            backoff_base: Duration::from_secs(30),
            backoff_ceiling: Duration::from_secs(30 * 60),
        }
    }
}

/// Delay before the next attempt after `failures` consecutive failures.
pub fn backoff_delay(policy: &RefreshPolicy, failures: u32) -> Duration {
    if failures == 0 {
        return Duration::ZERO;
    }
    let exponent = (failures - 1).min(31);
    policy
        .backoff_base
        .checked_mul(1u32 << exponent)
        .unwrap_or(policy.backoff_ceiling)
        .min(policy.backoff_ceiling)
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::days(365 * 100))
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Summary of where the cache is in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RefreshStatus {
    /// No fetch has been attempted.
    NeverFetched,
    /// The last success is within the TTL.
    Fresh,
    /// Past the TTL and eligible to fetch.
    Stale,
    /// Past the TTL but waiting out a back-off window.
    BackingOff,
    /// No remote authority is configured.
    Disabled,
}

impl RefreshStatus {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NeverFetched => "neverFetched",
            Self::Fresh => "fresh",
            Self::Stale => "stale",
            Self::BackingOff => "backingOff",
            Self::Disabled => "disabled",
        }
    }
}

impl std::fmt::Display for RefreshStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bookkeeping owned by the refresh cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshState {
    /// When the last attempt started.
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// When the last successful fetch completed.
    pub last_success_at: Option<DateTime<Utc>>,
    /// Failures since the last success.
    pub consecutive_failure_count: u32,
    /// Earliest time the next attempt may start.
    pub next_eligible_fetch_at: Option<DateTime<Utc>>,
    /// Message of the most recent failure, cleared on success.
    pub last_error: Option<String>,
}

impl RefreshState {
    /// Where the cache stands at `now`.
    pub fn status(&self, now: DateTime<Utc>, policy: &RefreshPolicy) -> RefreshStatus {
        if let Some(success) = self.last_success_at {
            if now - success < to_chrono(policy.ttl) {
                return RefreshStatus::Fresh;
            }
        }
        if self.next_eligible_fetch_at.is_some_and(|next| now < next) {
            return RefreshStatus::BackingOff;
        }
        if self.last_fetched_at.is_none() {
            RefreshStatus::NeverFetched
        } else {
            RefreshStatus::Stale
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// A remote delta that was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedDelta {
    /// Path as sent by the authority.
    pub path: String,
    /// Why it was skipped.
    pub reason: String,
}

/// What a refresh trigger did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum RefreshOutcome {
    /// Still within the TTL; no network call.
    Fresh,
    /// In a back-off window; no network call.
    #[serde(rename_all = "camelCase")]
    BackingOff {
        /// When the next attempt becomes eligible.
        retry_at: DateTime<Utc>,
    },
    /// Another fetch is in flight; the existing snapshot is served.
    InFlight,
    /// The fetch succeeded.
    #[serde(rename_all = "camelCase")]
    Refreshed {
        /// Deltas applied to the store.
        applied: usize,
        /// Deltas already seen or superseded.
        unchanged: usize,
        /// Deltas rejected by validation.
        skipped: Vec<SkippedDelta>,
    },
    /// The fetch failed; the existing snapshot stays authoritative.
    #[serde(rename_all = "camelCase")]
    Failed {
        /// Transport error message.
        error: String,
        /// Consecutive failures including this one.
        consecutive_failures: u32,
        /// When the next attempt becomes eligible.
        retry_at: DateTime<Utc>,
    },
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// TTL / back-off cache in front of a [`RateAuthority`].
pub struct RefreshCache {
    authority: Arc<dyn RateAuthority>,
    policy: RefreshPolicy,
    state: Mutex<RefreshState>,
    /// Source timestamp of the last delta accepted per raw path.
    seen: Mutex<HashMap<String, DateTime<Utc>>>,
    in_flight: tokio::sync::Mutex<()>,
}

impl RefreshCache {
    /// Create a cache that has never fetched.
    pub fn new(authority: Arc<dyn RateAuthority>, policy: RefreshPolicy) -> Self {
        Self {
            authority,
            policy,
            state: Mutex::new(RefreshState::default()),
            seen: Mutex::new(HashMap::new()),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    /// The configured policy.
    pub fn policy(&self) -> &RefreshPolicy {
        &self.policy
    }

    /// Name of the authority behind this cache.
    pub fn authority_name(&self) -> &str {
        self.authority.authority_name()
    }

    /// A copy of the current state.
    pub fn state(&self) -> RefreshState {
        self.state.lock().clone()
    }

    /// Current status.
    pub fn status(&self) -> RefreshStatus {
        self.state.lock().status(Utc::now(), &self.policy)
    }

    /// Fetch if the cache is stale and not backing off.
    pub async fn refresh_if_stale(&self, store: &OverrideStore) -> RefreshOutcome {
        if let Some(outcome) = self.skip_reason() {
            return outcome;
        }
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::debug!("rate authority fetch already in flight; serving existing overrides");
            return RefreshOutcome::InFlight;
        };
        // A fetch may have completed between the check and the lock.
        if let Some(outcome) = self.skip_reason() {
            return outcome;
        }
        self.fetch(store).await
    }

    /// Fetch now, ignoring TTL and back-off. Still single-flight and bounded
    /// by the fetch timeout.
    pub async fn force_refresh(&self, store: &OverrideStore) -> RefreshOutcome {
        let Ok(_guard) = self.in_flight.try_lock() else {
            return RefreshOutcome::InFlight;
        };
        self.fetch(store).await
    }

    fn skip_reason(&self) -> Option<RefreshOutcome> {
        let state = self.state.lock();
        match state.status(Utc::now(), &self.policy) {
            RefreshStatus::Fresh => Some(RefreshOutcome::Fresh),
            RefreshStatus::BackingOff => Some(RefreshOutcome::BackingOff {
                retry_at: state.next_eligible_fetch_at.unwrap_or_else(Utc::now),
            }),
            _ => None,
        }
    }

    async fn fetch(&self, store: &OverrideStore) -> RefreshOutcome {
        self.state.lock().last_fetched_at = Some(Utc::now());
        let timeout = self.policy.fetch_timeout;
        let result = match tokio::time::timeout(timeout, self.authority.fetch_overrides()).await {
            Ok(result) => result,
            Err(_) => Err(RefreshTransportError::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };
        match result {
            Ok(payload) => self.on_success(store, &payload),
            Err(error) => self.on_failure(&error),
        }
    }

    fn on_success(&self, store: &OverrideStore, payload: &RemoteOverrides) -> RefreshOutcome {
        let mut applied = 0;
        let mut unchanged = 0;
        let mut skipped = Vec::new();
        {
            let mut seen = self.seen.lock();
            for delta in &payload.deltas {
                let timestamp = payload.timestamp_of(delta);
                if seen.get(&delta.path).is_some_and(|last| *last >= timestamp) {
                    unchanged += 1;
                    continue;
                }
                let result: Result<bool, OverrideError> = match delta.version {
                    Some(version) => store
                        .apply_versioned(
                            &delta.path,
                            &delta.value,
                            OverrideSource::Remote,
                            None,
                            version,
                        )
                        .map(|outcome| matches!(outcome, ApplyOutcome::Applied { .. })),
                    None => store
                        .apply_override(&delta.path, &delta.value, OverrideSource::Remote, None)
                        .map(|_| true),
                };
                seen.insert(delta.path.clone(), timestamp);
                match result {
                    Ok(true) => applied += 1,
                    Ok(false) => unchanged += 1,
                    Err(e) => {
                        tracing::warn!(
                            path = %delta.path,
                            error = %e,
                            "skipping remote override delta"
                        );
                        skipped.push(SkippedDelta {
                            path: delta.path.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        let mut state = self.state.lock();
        state.last_success_at = Some(Utc::now());
        state.consecutive_failure_count = 0;
        state.next_eligible_fetch_at = None;
        state.last_error = None;
        tracing::info!(
            authority = self.authority.authority_name(),
            applied,
            unchanged,
            skipped = skipped.len(),
            "rate authority refresh completed"
        );
        RefreshOutcome::Refreshed {
            applied,
            unchanged,
            skipped,
        }
    }

    fn on_failure(&self, error: &RefreshTransportError) -> RefreshOutcome {
        let mut state = self.state.lock();
        state.consecutive_failure_count = state.consecutive_failure_count.saturating_add(1);
        let failures = state.consecutive_failure_count;
        let delay = backoff_delay(&self.policy, failures);
        let retry_at = Utc::now() + to_chrono(delay);
        state.next_eligible_fetch_at = Some(retry_at);
        state.last_error = Some(error.to_string());
        tracing::warn!(
            authority = self.authority.authority_name(),
            error = %error,
            failures,
            retry_in_secs = delay.as_secs(),
            "rate authority refresh failed; serving existing overrides"
        );
        RefreshOutcome::Failed {
            error: error.to_string(),
            consecutive_failures: failures,
            retry_at,
        }
    }
}

impl std::fmt::Debug for RefreshCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCache")
            .field("authority", &self.authority.authority_name())
            .field("policy", &self.policy)
            .field("state", &*self.state.lock())
            .finish()
    }
}
