//! # Override Provenance
//!
//! Every override is recorded as an [`OverrideEntry`] carrying who set it,
//! where it came from, when, and its per-path version. Entries are
//! superseded, never deleted.
//!
//! An [`OverrideSnapshot`] is the highest-version entry for each path at one
//! instant. Snapshots are immutable values: a write produces a new snapshot
//! via [`OverrideSnapshot::with_entries`] and the old one stays valid for any
//! reader still holding it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ngtax_core::OverrideId;
use serde::{Deserialize, Serialize};

use crate::path::FieldPath;
use crate::value::OverrideValue;

/// Where an override came from.
///
/// Sources have no precedence over each other; the highest version wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideSource {
    /// Pulled from the remote rate authority by the refresh cache.
    Remote,
    /// Submitted through the administrative API.
    Api,
    /// Loaded by an operator (CLI override file).
    Manual,
}

impl OverrideSource {
    /// Wire name of the source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Api => "api",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for OverrideSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One applied override with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideEntry {
    /// Audit identifier.
    pub id: OverrideId,
    /// The field this entry overrides.
    pub path: FieldPath,
    /// The typed value.
    pub value: OverrideValue,
    /// Where the override came from.
    pub source: OverrideSource,
    /// When the store accepted it.
    pub applied_at: DateTime<Utc>,
    /// Who submitted it, when known.
    pub actor: Option<String>,
    /// Monotonic version for this path, starting at 1.
    pub version: u64,
    /// Store-wide commit number. Entries written in one batch share it.
    pub sequence: u64,
}

impl OverrideEntry {
    /// Whether this entry should replace `other` for the same path.
    pub fn supersedes(&self, other: &OverrideEntry) -> bool {
        (self.version, self.sequence) > (other.version, other.sequence)
    }
}

/// The authoritative override for each path at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideSnapshot {
    sequence: u64,
    entries: BTreeMap<FieldPath, OverrideEntry>,
}

impl OverrideSnapshot {
    /// A snapshot with no overrides.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Derive a snapshot from a set of entries, keeping the highest version
    /// per path.
    pub fn from_entries(entries: impl IntoIterator<Item = OverrideEntry>) -> Self {
        Self::empty().with_entries(entries)
    }

    /// A new snapshot with `entries` folded in. Entries that do not supersede
    /// the current one for their path are ignored.
    pub fn with_entries(&self, entries: impl IntoIterator<Item = OverrideEntry>) -> Self {
        let mut next = self.clone();
        for entry in entries {
            next.sequence = next.sequence.max(entry.sequence);
            match next.entries.get(&entry.path) {
                Some(current) if !entry.supersedes(current) => {}
                _ => {
                    next.entries.insert(entry.path, entry);
                }
            }
        }
        next
    }

    /// The authoritative entry for `path`, if overridden.
    pub fn get(&self, path: &FieldPath) -> Option<&OverrideEntry> {
        self.entries.get(path)
    }

    /// Current version for `path`; 0 when not overridden.
    pub fn version_of(&self, path: &FieldPath) -> u64 {
        self.entries.get(path).map_or(0, |e| e.version)
    }

    /// Entries ordered by path.
    pub fn entries(&self) -> impl Iterator<Item = &OverrideEntry> {
        self.entries.values()
    }

    /// Number of overridden paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is overridden.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The highest commit sequence folded into this snapshot.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// The highest per-path version in the snapshot.
    pub fn highest_version(&self) -> u64 {
        self.entries.values().map(|e| e.version).max().unwrap_or(0)
    }
}
