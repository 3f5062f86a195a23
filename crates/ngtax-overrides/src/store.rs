//! # Override Store
//!
//! The single authoritative record of runtime overrides, owned by the
//! [`TaxEngine`](crate::TaxEngine).
//!
//! ## Concurrency
//!
//! Writers are serialized by a `parking_lot::Mutex`. Each write validates
//! against the currently published snapshot, builds the next snapshot, and
//! publishes it by swapping an `Arc` under a short `RwLock` write. Readers
//! clone the published `Arc` and never see a partially applied write.
//! Neither lock is held across an `.await`.
//!
//! ## Validation
//!
//! A write is rejected, leaving the store unchanged, when:
//! - the path does not resolve ([`UnknownFieldError`]),
//! - the value has the wrong type or range ([`ValidationError`]),
//! - the table with the value applied breaks a structural invariant
//!   ([`ValidationError::Integrity`]).

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use ngtax_core::{OverrideId, UnknownFieldError, ValidationError};
use ngtax_rates::{
    merge, FieldPath, OverrideEntry, OverrideError, OverrideSnapshot, OverrideSource,
    OverrideValue, RateTable,
};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

/// Default number of history entries retained.
pub const DEFAULT_HISTORY_CAP: usize = 256;

/// Result of a write that carries its own version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The write was applied with this version.
    Applied {
        /// The version now current for the path.
        version: u64,
    },
    /// The supplied version was not newer than the current one; nothing
    /// changed.
    Stale {
        /// The version already current for the path.
        current_version: u64,
    },
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// FIFO-bounded override history. The oldest entry is evicted first.
struct OverrideHistory {
    entries: VecDeque<OverrideEntry>,
    cap: usize,
}

impl OverrideHistory {
    fn new(cap: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(cap.min(1024)),
            cap: cap.max(1),
        }
    }

    fn push(&mut self, entry: OverrideEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.cap {
            if let Some(evicted) = self.entries.pop_front() {
                tracing::debug!(
                    path = %evicted.path,
                    version = evicted.version,
                    "evicting override from history"
                );
            }
        }
    }
}

struct WriterState {
    history: OverrideHistory,
    last_sequence: u64,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// A staged, validated change waiting to be committed.
struct Staged {
    path: FieldPath,
    value: OverrideValue,
    version: u64,
}

/// Thread-safe override store.
pub struct OverrideStore {
    base: Arc<RateTable>,
    writer: Mutex<WriterState>,
    published: RwLock<Arc<OverrideSnapshot>>,
}

impl OverrideStore {
    /// Create an empty store over `base`.
    pub fn new(base: Arc<RateTable>, history_cap: usize) -> Self {
        Self {
            base,
            writer: Mutex::new(WriterState {
                history: OverrideHistory::new(history_cap),
                last_sequence: 0,
            }),
            published: RwLock::new(Arc::new(OverrideSnapshot::empty())),
        }
    }

    /// The base table overrides are applied to.
    pub fn base(&self) -> &Arc<RateTable> {
        &self.base
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<OverrideSnapshot> {
        self.published.read().clone()
    }

    /// Apply one override and return the version assigned to it.
    pub fn apply_override(
        &self,
        path: &str,
        value: &Value,
        source: OverrideSource,
        actor: Option<&str>,
    ) -> Result<u64, OverrideError> {
        let mut writer = self.writer.lock();
        let current = self.snapshot();
        let (path, value) = self.stage(&current, path, value)?;
        let version = current.version_of(&path) + 1;
        self.commit(
            &mut writer,
            &current,
            vec![Staged {
                path,
                value,
                version,
            }],
            source,
            actor,
        );
        Ok(version)
    }

    /// Apply one override carrying an explicit version.
    ///
    /// A version at or below the path's current version is reported as
    /// [`ApplyOutcome::Stale`] and changes nothing.
    pub fn apply_versioned(
        &self,
        path: &str,
        value: &Value,
        source: OverrideSource,
        actor: Option<&str>,
        version: u64,
    ) -> Result<ApplyOutcome, OverrideError> {
        let mut writer = self.writer.lock();
        let current = self.snapshot();
        let parsed: FieldPath = path.parse()?;
        let current_version = current.version_of(&parsed);
        if version <= current_version {
            tracing::debug!(
                path = %parsed,
                version,
                current_version,
                "ignoring stale versioned override"
            );
            return Ok(ApplyOutcome::Stale { current_version });
        }

        let (path, value) = self.stage(&current, path, value)?;
        self.commit(
            &mut writer,
            &current,
            vec![Staged {
                path,
                value,
                version,
            }],
            source,
            actor,
        );
        Ok(ApplyOutcome::Applied { version })
    }

    /// Apply a set of overrides atomically.
    ///
    /// Every value is checked individually and the combined table is
    /// validated once, so coordinated edits (moving a band boundary on two
    /// adjacent bands) are accepted together. Either every entry is committed
    /// under one sequence number or none is.
    pub fn apply_batch(
        &self,
        payload: &BTreeMap<String, Value>,
        source: OverrideSource,
        actor: Option<&str>,
    ) -> Result<Vec<OverrideEntry>, OverrideError> {
        if payload.is_empty() {
            return Ok(Vec::new());
        }

        let mut writer = self.writer.lock();
        let current = self.snapshot();
        let mut candidate = merge(&self.base, &current).rates().clone();
        let mut seen = BTreeSet::new();
        let mut staged = Vec::with_capacity(payload.len());

        for (raw_path, raw_value) in payload {
            let path: FieldPath = raw_path.parse()?;
            if !seen.insert(path) {
                return Err(ValidationError::Invalid {
                    field: path.to_string(),
                    reason: "path appears more than once in the batch".to_string(),
                }
                .into());
            }
            let value = OverrideValue::coerce(&path, raw_value)?;
            value.apply_to(&mut candidate, &path)?;
            staged.push(Staged {
                path,
                version: current.version_of(&path) + 1,
                value,
            });
        }

        candidate.validate().map_err(|cause| ValidationError::Integrity {
            field: staged
                .iter()
                .map(|s| s.path.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            source: cause,
        })?;

        Ok(self.commit(&mut writer, &current, staged, source, actor))
    }

    /// History for one path, oldest first.
    pub fn history_for(&self, path: &str) -> Result<Vec<OverrideEntry>, UnknownFieldError> {
        let path: FieldPath = path.parse()?;
        let writer = self.writer.lock();
        Ok(writer
            .history
            .entries
            .iter()
            .filter(|e| e.path == path)
            .cloned()
            .collect())
    }

    /// Full retained history, oldest first.
    pub fn history(&self) -> Vec<OverrideEntry> {
        self.writer.lock().history.entries.iter().cloned().collect()
    }

    /// Parse, coerce and check a single override against `current`.
    fn stage(
        &self,
        current: &OverrideSnapshot,
        raw_path: &str,
        raw_value: &Value,
    ) -> Result<(FieldPath, OverrideValue), OverrideError> {
        let path: FieldPath = raw_path.parse()?;
        let value = OverrideValue::coerce(&path, raw_value)?;
        let mut candidate = merge(&self.base, current).rates().clone();
        value.apply_to(&mut candidate, &path)?;
        candidate
            .validate()
            .map_err(|cause| ValidationError::Integrity {
                field: path.to_string(),
                source: cause,
            })?;
        Ok((path, value))
    }

    /// Record staged changes and publish the next snapshot.
    fn commit(
        &self,
        writer: &mut WriterState,
        current: &OverrideSnapshot,
        staged: Vec<Staged>,
        source: OverrideSource,
        actor: Option<&str>,
    ) -> Vec<OverrideEntry> {
        writer.last_sequence += 1;
        let sequence = writer.last_sequence;
        let applied_at = Utc::now();
        let entries: Vec<OverrideEntry> = staged
            .into_iter()
            .map(|s| OverrideEntry {
                id: OverrideId::new(),
                path: s.path,
                value: s.value,
                source,
                applied_at,
                actor: actor.map(str::to_string),
                version: s.version,
                sequence,
            })
            .collect();

        let next = current.with_entries(entries.iter().cloned());
        *self.published.write() = Arc::new(next);

        for entry in &entries {
            tracing::info!(
                path = %entry.path,
                version = entry.version,
                source = %entry.source,
                actor = entry.actor.as_deref().unwrap_or("-"),
                sequence,
                "override applied"
            );
            writer.history.push(entry.clone());
        }
        entries
    }
}

impl std::fmt::Debug for OverrideStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("OverrideStore")
            .field("overrides", &snapshot.len())
            .field("sequence", &snapshot.sequence())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngtax_core::Rate;
    use ngtax_rates::load_base_rates;
    use serde_json::json;

    fn store(cap: usize) -> OverrideStore {
        OverrideStore::new(Arc::new(load_base_rates()), cap)
    }

    #[test]
    fn versions_increase_per_path() {
        let store = store(16);
        let v1 = store
            .apply_override("vatRate", &json!(0.08), OverrideSource::Api, Some("ops"))
            .unwrap();
        let v2 = store
            .apply_override("vatRate", &json!(0.09), OverrideSource::Remote, None)
            .unwrap();
        let other = store
            .apply_override("cgtRate", &json!(0.12), OverrideSource::Api, None)
            .unwrap();
        assert_eq!((v1, v2, other), (1, 2, 1));

        let snapshot = store.snapshot();
        let entry = snapshot.get(&FieldPath::VatRate).unwrap();
        assert_eq!(entry.version, 2);
        assert_eq!(entry.source, OverrideSource::Remote);
        assert_eq!(snapshot.sequence(), 3);
    }

    #[test]
    fn unknown_path_is_rejected_without_change() {
        let store = store(16);
        let err = store
            .apply_override("vat", &json!(0.1), OverrideSource::Api, None)
            .unwrap_err();
        assert!(matches!(err, OverrideError::UnknownField(_)));
        let err = store
            .apply_override("pitBands[6].rate", &json!(0.1), OverrideSource::Api, None)
            .unwrap_err();
        assert!(matches!(err, OverrideError::UnknownField(_)));
        assert!(store.snapshot().is_empty());
        assert!(store.history().is_empty());
    }

    #[test]
    fn out_of_range_value_is_rejected_without_change() {
        let store = store(16);
        let err = store
            .apply_override("pitBands[0].rate", &json!(1.5), OverrideSource::Api, None)
            .unwrap_err();
        assert!(matches!(
            err,
            OverrideError::Validation(ValidationError::RateOutOfRange { .. })
        ));
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn contiguity_breaking_write_is_rejected() {
        let store = store(16);
        let err = store
            .apply_override(
                "pitBands[1].lowerBound",
                &json!(250000),
                OverrideSource::Api,
                None,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            OverrideError::Validation(ValidationError::Integrity { .. })
        ));
        assert_eq!(err.field(), "pitBands[1].lowerBound");
    }

    #[test]
    fn batch_accepts_coordinated_band_edit() {
        let store = store(16);
        let payload = BTreeMap::from([
            ("pitBands[0].upperBound".to_string(), json!(400000)),
            ("pitBands[1].lowerBound".to_string(), json!(400000)),
        ]);
        let entries = store
            .apply_batch(&payload, OverrideSource::Api, Some("admin"))
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sequence, entries[1].sequence);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let store = store(16);
        let payload = BTreeMap::from([
            ("vatRate".to_string(), json!(0.1)),
            ("cgtRate".to_string(), json!(7)),
        ]);
        let err = store
            .apply_batch(&payload, OverrideSource::Api, None)
            .unwrap_err();
        assert_eq!(err.field(), "cgtRate");
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn batch_rejects_aliased_paths() {
        let store = store(16);
        let payload = BTreeMap::from([
            ("pitBands[01].rate".to_string(), json!(0.1)),
            ("pitBands[1].rate".to_string(), json!(0.12)),
        ]);
        assert!(store.apply_batch(&payload, OverrideSource::Api, None).is_err());
    }

    #[test]
    fn stale_versioned_write_is_ignored() {
        let store = store(16);
        let outcome = store
            .apply_versioned("vatRate", &json!(0.08), OverrideSource::Remote, None, 5)
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Applied { version: 5 });

        let before = store.snapshot();
        let outcome = store
            .apply_versioned("vatRate", &json!(0.09), OverrideSource::Remote, None, 5)
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Stale { current_version: 5 });
        assert_eq!(*store.snapshot(), *before);
        assert_eq!(store.history_for("vatRate").unwrap().len(), 1);
    }

    #[test]
    fn history_is_fifo_bounded() {
        let store = store(3);
        for bps in 1..=5 {
            store
                .apply_override(
                    "vatRate",
                    &json!(format!("0.0{bps}")),
                    OverrideSource::Manual,
                    None,
                )
                .unwrap();
        }
        let history = store.history_for("vatRate").unwrap();
        let versions: Vec<u64> = history.iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![3, 4, 5]);
        assert_eq!(
            store.snapshot().get(&FieldPath::VatRate).unwrap().value,
            OverrideValue::Rate(Rate::from_parts(5, 2).unwrap())
        );
    }

    #[test]
    fn history_for_rejects_malformed_path() {
        let store = store(3);
        assert!(store.history_for("nope").is_err());
        assert!(store.history_for("cgtRate").unwrap().is_empty());
    }

    #[test]
    fn readers_never_observe_partial_batches() {
        let store = Arc::new(store(64));
        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for step in 0..50u32 {
                    let boundary = 300_000 + step * 1_000;
                    let payload = BTreeMap::from([
                        ("pitBands[0].upperBound".to_string(), json!(boundary)),
                        ("pitBands[1].lowerBound".to_string(), json!(boundary)),
                    ]);
                    store
                        .apply_batch(&payload, OverrideSource::Api, None)
                        .unwrap();
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let mut last_sequence = 0;
                    for _ in 0..200 {
                        let snapshot = store.snapshot();
                        assert!(snapshot.sequence() >= last_sequence);
                        last_sequence = snapshot.sequence();
                        let effective = merge(store.base(), &snapshot);
                        assert!(effective.dropped_overrides().is_empty());
                    }
                })
            })
            .collect();
        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(store.snapshot().sequence(), 50);
    }
}
