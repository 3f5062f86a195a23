//! # Tax Engine Facade
//!
//! [`TaxEngine`] owns the override store and the optional refresh cache and
//! is the single object the HTTP server and the CLI talk to. It is shared
//! through an `Arc`; every method takes `&self`.
//!
//! Reads go through [`TaxEngine::get_effective_config`], which first gives
//! the refresh cache a chance to run (bounded by the fetch timeout) and then
//! returns the merged configuration for the current snapshot. The merge is
//! cached by snapshot sequence, so repeated reads between writes share one
//! `Arc<EffectiveConfig>`.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ngtax_calc::{
    compute_cgt, compute_cgt_batch, compute_cit, compute_levies, compute_pit, compute_vat,
    CgtBatchResult, CgtResult, CitInput, CitResult, Disposal, LevyInput, LevyResult, PitInput,
    PitResult, VatInput, VatResult,
};
use ngtax_core::{UnknownFieldError, ValidationError};
use ngtax_rates::{
    load_base_rates, merge, EffectiveConfig, OverrideEntry, OverrideError, OverrideSnapshot,
    OverrideSource, RateTable,
};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::authority::RateAuthority;
use crate::config::EngineConfig;
use crate::refresh::{RefreshCache, RefreshOutcome, RefreshStatus};
use crate::store::OverrideStore;

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Identifies exactly which configuration a result was computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatesVersionSummary {
    /// Label of the compiled-in base table.
    pub base_label: String,
    /// Number of overridden fields.
    pub override_count: usize,
    /// Highest per-path version in the snapshot.
    pub highest_version: u64,
    /// Commit sequence of the snapshot.
    pub snapshot_sequence: u64,
    /// Overrides the merge had to drop.
    pub dropped_override_count: usize,
    /// SHA-256 of the merged table.
    pub fingerprint: String,
}

impl RatesVersionSummary {
    fn new(base_label: &str, snapshot: &OverrideSnapshot, config: &EffectiveConfig) -> Self {
        Self {
            base_label: base_label.to_string(),
            override_count: snapshot.len(),
            highest_version: snapshot.highest_version(),
            snapshot_sequence: config.snapshot_sequence(),
            dropped_override_count: config.dropped_overrides().len(),
            fingerprint: config.fingerprint().to_string(),
        }
    }
}

/// Engine metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineMetadata {
    /// What the current effective configuration is made of.
    pub rates_version_summary: RatesVersionSummary,
    /// Last successful remote refresh.
    pub last_refresh_at: Option<DateTime<Utc>>,
    /// Refresh cache status.
    pub refresh_status: RefreshStatus,
    /// Failures since the last successful refresh.
    pub consecutive_failure_count: u32,
    /// Earliest time of the next remote fetch while backing off.
    pub next_eligible_fetch_at: Option<DateTime<Utc>>,
    /// Name of the remote authority, when one is configured.
    pub authority: Option<String>,
}

/// Result of an administrative override write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverridesView {
    /// Metadata after the write.
    pub metadata: EngineMetadata,
    /// Entries created by this write.
    pub applied: Vec<OverrideEntry>,
    /// Every authoritative override after the write.
    pub overrides: Vec<OverrideEntry>,
}

/// The part of the configuration a calculation used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatesUsed {
    /// Commit sequence of the snapshot.
    pub snapshot_sequence: u64,
    /// SHA-256 of the merged table.
    pub fingerprint: String,
    /// Number of overrides in effect.
    pub override_count: usize,
}

impl RatesUsed {
    /// Identify `config`.
    pub fn of(config: &EffectiveConfig) -> Self {
        Self {
            snapshot_sequence: config.snapshot_sequence(),
            fingerprint: config.fingerprint().to_string(),
            override_count: config.applied_overrides().len(),
        }
    }
}

/// A calculator result tagged with the configuration that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment<T> {
    /// The calculation.
    #[serde(flatten)]
    pub result: T,
    /// The configuration it used.
    pub rates_used: RatesUsed,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Owns the rate configuration for one process.
pub struct TaxEngine {
    store: OverrideStore,
    refresh: Option<RefreshCache>,
    merged: Mutex<Option<Arc<EffectiveConfig>>>,
    base_label: String,
}

impl TaxEngine {
    /// An engine over `base` with no remote authority.
    pub fn new(base: RateTable, config: EngineConfig) -> Self {
        Self {
            store: OverrideStore::new(Arc::new(base), config.history_cap),
            refresh: None,
            merged: Mutex::new(None),
            base_label: config.base_label,
        }
    }

    /// An engine over the compiled-in base table.
    pub fn with_base_rates(config: EngineConfig) -> Self {
        Self::new(load_base_rates(), config)
    }

    /// An engine that refreshes overrides from `authority`.
    pub fn with_authority(
        base: RateTable,
        config: EngineConfig,
        authority: Arc<dyn RateAuthority>,
    ) -> Self {
        let refresh = RefreshCache::new(authority, config.refresh);
        let mut engine = Self::new(base, config);
        engine.refresh = Some(refresh);
        engine
    }

    /// The override store.
    pub fn store(&self) -> &OverrideStore {
        &self.store
    }

    /// The refresh cache, when a remote authority is configured.
    pub fn refresh_cache(&self) -> Option<&RefreshCache> {
        self.refresh.as_ref()
    }

    /// Effective configuration, refreshing from the authority first if the
    /// cache is stale.
    pub async fn get_effective_config(&self) -> Arc<EffectiveConfig> {
        if let Some(cache) = &self.refresh {
            cache.refresh_if_stale(&self.store).await;
        }
        self.current_config()
    }

    /// Effective configuration for the current snapshot, without touching
    /// the network.
    pub fn current_config(&self) -> Arc<EffectiveConfig> {
        self.config_for(&self.store.snapshot())
    }

    fn config_for(&self, snapshot: &OverrideSnapshot) -> Arc<EffectiveConfig> {
        let mut cached = self.merged.lock();
        if let Some(config) = cached.as_ref() {
            if config.snapshot_sequence() == snapshot.sequence() {
                return Arc::clone(config);
            }
        }
        let config = Arc::new(merge(self.store.base(), snapshot));
        // Never replace a newer merge with an older one.
        if cached
            .as_ref()
            .map_or(true, |c| c.snapshot_sequence() < snapshot.sequence())
        {
            *cached = Some(Arc::clone(&config));
        }
        config
    }

    /// Version summary and refresh state.
    pub fn get_metadata(&self) -> EngineMetadata {
        let snapshot = self.store.snapshot();
        let config = self.config_for(&snapshot);
        let summary = RatesVersionSummary::new(&self.base_label, &snapshot, &config);
        match &self.refresh {
            Some(cache) => {
                let state = cache.state();
                EngineMetadata {
                    rates_version_summary: summary,
                    last_refresh_at: state.last_success_at,
                    refresh_status: cache.status(),
                    consecutive_failure_count: state.consecutive_failure_count,
                    next_eligible_fetch_at: state.next_eligible_fetch_at,
                    authority: Some(cache.authority_name().to_string()),
                }
            }
            None => EngineMetadata {
                rates_version_summary: summary,
                last_refresh_at: None,
                refresh_status: RefreshStatus::Disabled,
                consecutive_failure_count: 0,
                next_eligible_fetch_at: None,
                authority: None,
            },
        }
    }

    /// The currently published override snapshot.
    pub fn get_override_snapshot(&self) -> Arc<OverrideSnapshot> {
        self.store.snapshot()
    }

    /// Apply an administrative `path → value` mapping atomically.
    pub fn apply_overrides(
        &self,
        payload: &BTreeMap<String, Value>,
        source: OverrideSource,
        actor: Option<&str>,
    ) -> Result<OverridesView, OverrideError> {
        let applied = self.store.apply_batch(payload, source, actor)?;
        Ok(OverridesView {
            metadata: self.get_metadata(),
            applied,
            overrides: self.store.snapshot().entries().cloned().collect(),
        })
    }

    /// Audit history for one path, oldest first.
    pub fn history_for(&self, path: &str) -> Result<Vec<OverrideEntry>, UnknownFieldError> {
        self.store.history_for(path)
    }

    /// Audit history for every path, oldest first.
    pub fn history(&self) -> Vec<OverrideEntry> {
        self.store.history()
    }

    /// Fetch from the authority now. `None` when refresh is disabled.
    pub async fn force_refresh(&self) -> Option<RefreshOutcome> {
        match &self.refresh {
            Some(cache) => Some(cache.force_refresh(&self.store).await),
            None => None,
        }
    }

    // -- calculators --------------------------------------------------------

    /// Personal income tax.
    pub async fn pit(&self, input: &PitInput) -> Result<Assessment<PitResult>, ValidationError> {
        self.assess(|rates| compute_pit(rates, input)).await
    }

    /// Company income tax.
    pub async fn cit(&self, input: &CitInput) -> Result<Assessment<CitResult>, ValidationError> {
        self.assess(|rates| compute_cit(rates, input)).await
    }

    /// Capital gains tax on one disposal.
    pub async fn cgt(&self, disposal: &Disposal) -> Result<Assessment<CgtResult>, ValidationError> {
        self.assess(|rates| compute_cgt(rates, disposal)).await
    }

    /// Capital gains tax on several disposals.
    pub async fn cgt_batch(
        &self,
        disposals: &[Disposal],
    ) -> Result<Assessment<CgtBatchResult>, ValidationError> {
        self.assess(|rates| compute_cgt_batch(rates, disposals)).await
    }

    /// Value added tax.
    pub async fn vat(&self, input: &VatInput) -> Result<Assessment<VatResult>, ValidationError> {
        self.assess(|rates| compute_vat(rates, input)).await
    }

    /// Statutory levies.
    pub async fn levies(
        &self,
        input: &LevyInput,
    ) -> Result<Assessment<LevyResult>, ValidationError> {
        self.assess(|rates| compute_levies(rates, input)).await
    }

    async fn assess<T, F>(&self, calculate: F) -> Result<Assessment<T>, ValidationError>
    where
        F: FnOnce(&RateTable) -> Result<T, ValidationError>,
    {
        let config = self.get_effective_config().await;
        Ok(Assessment {
            result: calculate(config.rates())?,
            rates_used: RatesUsed::of(&config),
        })
    }
}

impl std::fmt::Debug for TaxEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaxEngine")
            .field("base_label", &self.base_label)
            .field("store", &self.store)
            .field("refresh", &self.refresh)
            .finish()
    }
}
