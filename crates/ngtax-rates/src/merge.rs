//! # Merge Resolver
//!
//! Combines the base [`RateTable`] with an [`OverrideSnapshot`] into an
//! immutable [`EffectiveConfig`].
//!
//! Overrides are applied in commit order. A commit group (entries written
//! together in one batch) is applied as a unit; if the result breaks a table
//! invariant the group's entries are retried one by one and only those that
//! keep the table valid survive. A dropped override leaves the field at its
//! previous value and is reported as a warning. Merging never fails.

use std::collections::BTreeMap;
use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::path::FieldPath;
use crate::provenance::{OverrideEntry, OverrideSnapshot, OverrideSource};
use crate::table::RateTable;

/// An override that made it into the effective configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedOverride {
    /// Overridden field.
    pub path: FieldPath,
    /// Version that was applied.
    pub version: u64,
    /// Where it came from.
    pub source: OverrideSource,
}

/// An override that was discarded because it broke the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedOverride {
    /// Overridden field.
    pub path: FieldPath,
    /// Version that was dropped.
    pub version: u64,
    /// Where it came from.
    pub source: OverrideSource,
    /// The invariant it violated.
    pub reason: String,
}

/// The rate table with overrides substituted.
///
/// Dereferences to [`RateTable`], so calculators take `&RateTable` and work
/// with either a base table or an effective configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveConfig {
    rates: RateTable,
    applied_overrides: Vec<AppliedOverride>,
    dropped_overrides: Vec<DroppedOverride>,
    snapshot_sequence: u64,
    fingerprint: String,
    merged_at: DateTime<Utc>,
}

impl EffectiveConfig {
    /// An effective configuration with no overrides.
    pub fn from_base(base: &RateTable) -> Self {
        merge(base, &OverrideSnapshot::empty())
    }

    /// The merged rate table.
    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    /// Overrides that were applied, in application order.
    pub fn applied_overrides(&self) -> &[AppliedOverride] {
        &self.applied_overrides
    }

    /// Overrides that were dropped.
    pub fn dropped_overrides(&self) -> &[DroppedOverride] {
        &self.dropped_overrides
    }

    /// Commit sequence of the snapshot this was merged from.
    pub fn snapshot_sequence(&self) -> u64 {
        self.snapshot_sequence
    }

    /// SHA-256 (hex) of the merged table's JSON form.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// When the merge ran.
    pub fn merged_at(&self) -> DateTime<Utc> {
        self.merged_at
    }
}

impl Deref for EffectiveConfig {
    type Target = RateTable;

    fn deref(&self) -> &RateTable {
        &self.rates
    }
}

/// Apply `entries` on top of `table`, returning the candidate if it is valid.
fn try_apply(table: &RateTable, entries: &[&OverrideEntry]) -> Result<RateTable, String> {
    let mut candidate = table.clone();
    for entry in entries {
        entry
            .value
            .apply_to(&mut candidate, &entry.path)
            .map_err(|e| e.to_string())?;
    }
    candidate.validate().map_err(|e| e.to_string())?;
    Ok(candidate)
}

fn applied(entry: &OverrideEntry) -> AppliedOverride {
    AppliedOverride {
        path: entry.path,
        version: entry.version,
        source: entry.source,
    }
}

/// Merge `snapshot` over `base`.
///
/// `merge(base, &OverrideSnapshot::empty()).rates() == base`.
pub fn merge(base: &RateTable, snapshot: &OverrideSnapshot) -> EffectiveConfig {
    let mut groups: BTreeMap<u64, Vec<&OverrideEntry>> = BTreeMap::new();
    for entry in snapshot.entries() {
        groups.entry(entry.sequence).or_default().push(entry);
    }

    let mut table = base.clone();
    let mut applied_overrides = Vec::with_capacity(snapshot.len());
    let mut dropped_overrides = Vec::new();

    for (sequence, group) in groups {
        if group.len() > 1 {
            if let Ok(candidate) = try_apply(&table, &group) {
                table = candidate;
                applied_overrides.extend(group.iter().map(|e| applied(e)));
                continue;
            }
        }
        for entry in group {
            match try_apply(&table, &[entry]) {
                Ok(candidate) => {
                    table = candidate;
                    applied_overrides.push(applied(entry));
                }
                Err(reason) => {
                    tracing::warn!(
                        path = %entry.path,
                        version = entry.version,
                        source = %entry.source,
                        sequence,
                        %reason,
                        "dropping override that breaks rate table invariants"
                    );
                    dropped_overrides.push(DroppedOverride {
                        path: entry.path,
                        version: entry.version,
                        source: entry.source,
                        reason,
                    });
                }
            }
        }
    }

    let fingerprint = fingerprint(&table);
    EffectiveConfig {
        rates: table,
        applied_overrides,
        dropped_overrides,
        snapshot_sequence: snapshot.sequence(),
        fingerprint,
        merged_at: Utc::now(),
    }
}

fn fingerprint(table: &RateTable) -> String {
    let bytes = serde_json::to_vec(table).unwrap_or_default();
    Sha256::digest(&bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::load_base_rates;
    use crate::value::OverrideValue;
    use ngtax_core::{OverrideId, Rate};
    use rust_decimal::Decimal;
    use serde_json::json;

    fn entry(path: &str, raw: serde_json::Value, version: u64, sequence: u64) -> OverrideEntry {
        let path: FieldPath = path.parse().unwrap();
        OverrideEntry {
            id: OverrideId::new(),
            value: OverrideValue::coerce(&path, &raw).unwrap(),
            path,
            source: OverrideSource::Api,
            applied_at: Utc::now(),
            actor: Some("tester".to_string()),
            version,
            sequence,
        }
    }

    #[test]
    fn empty_snapshot_is_identity() {
        let base = load_base_rates();
        let effective = merge(&base, &OverrideSnapshot::empty());
        assert_eq!(effective.rates(), &base);
        assert!(effective.applied_overrides().is_empty());
        assert!(effective.dropped_overrides().is_empty());
    }

    #[test]
    fn override_is_substituted() {
        let base = load_base_rates();
        let snapshot = OverrideSnapshot::from_entries([entry("vatRate", json!(0.1), 1, 1)]);
        let effective = merge(&base, &snapshot);
        assert_eq!(effective.vat_rate, Rate::from_parts(1, 1).unwrap());
        assert_eq!(effective.applied_overrides().len(), 1);
        assert_eq!(base.vat_rate, Rate::from_parts(75, 3).unwrap());
    }

    #[test]
    fn contiguity_breaking_override_is_dropped_and_others_kept() {
        let base = load_base_rates();
        let snapshot = OverrideSnapshot::from_entries([
            entry("pitBands[1].lowerBound", json!(250000), 1, 1),
            entry("cgtRate", json!(0.12), 1, 2),
        ]);
        let effective = merge(&base, &snapshot);

        assert_eq!(
            effective.pit_bands[1].lower_bound,
            base.pit_bands[1].lower_bound
        );
        assert_eq!(effective.cgt_rate, Rate::from_parts(12, 2).unwrap());
        assert_eq!(effective.dropped_overrides().len(), 1);
        assert_eq!(
            effective.dropped_overrides()[0].path,
            FieldPath::PitBandLowerBound(1)
        );
        assert!(effective.rates().validate().is_ok());
    }

    #[test]
    fn batch_moves_band_boundary_together() {
        let base = load_base_rates();
        let snapshot = OverrideSnapshot::from_entries([
            entry("pitBands[0].upperBound", json!(400000), 1, 7),
            entry("pitBands[1].lowerBound", json!(400000), 1, 7),
        ]);
        let effective = merge(&base, &snapshot);
        assert!(effective.dropped_overrides().is_empty());
        assert_eq!(effective.pit_bands[0].upper_bound, Some(Decimal::new(400_000, 0)));
        assert_eq!(effective.pit_bands[1].lower_bound, Decimal::new(400_000, 0));
    }

    #[test]
    fn failed_group_salvages_independent_entries() {
        let base = load_base_rates();
        let snapshot = OverrideSnapshot::from_entries([
            entry("pitBands[0].upperBound", json!(400000), 1, 3),
            entry("vatRate", json!(0.08), 1, 3),
        ]);
        let effective = merge(&base, &snapshot);
        assert_eq!(effective.vat_rate, Rate::from_parts(8, 2).unwrap());
        assert_eq!(effective.dropped_overrides().len(), 1);
        assert_eq!(effective.pit_bands[0].upper_bound, Some(Decimal::new(300_000, 0)));
    }

    #[test]
    fn replaced_schedule_invalidates_stale_band_paths() {
        let base = load_base_rates();
        let snapshot = OverrideSnapshot::from_entries([
            entry(
                "pitBands",
                json!([
                    {"lowerBound": 0, "upperBound": 1000000, "rate": 0.1},
                    {"lowerBound": 1000000, "upperBound": null, "rate": 0.2}
                ]),
                1,
                1,
            ),
            entry("pitBands[4].rate", json!(0.2), 1, 2),
        ]);
        let effective = merge(&base, &snapshot);
        assert_eq!(effective.pit_bands.len(), 2);
        assert_eq!(effective.dropped_overrides().len(), 1);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let base = load_base_rates();
        let a = EffectiveConfig::from_base(&base);
        let b = EffectiveConfig::from_base(&base);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        let snapshot = OverrideSnapshot::from_entries([entry("vatRate", json!(0.1), 1, 1)]);
        assert_ne!(merge(&base, &snapshot).fingerprint(), a.fingerprint());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn merged_table_always_validates(
                lower in 0i64..5_000_000,
                rate_bps in 0i64..=10_000,
                vat_bps in 0i64..=10_000,
            ) {
                let base = load_base_rates();
                let snapshot = OverrideSnapshot::from_entries([
                    entry("pitBands[2].lowerBound", json!(lower), 1, 1),
                    entry("pitBands[3].rate", json!(Decimal::new(rate_bps, 4).to_string()), 1, 2),
                    entry("vatRate", json!(Decimal::new(vat_bps, 4).to_string()), 1, 3),
                ]);
                let effective = merge(&base, &snapshot);
                prop_assert!(effective.rates().validate().is_ok());
                prop_assert_eq!(
                    effective.applied_overrides().len() + effective.dropped_overrides().len(),
                    3
                );
            }
        }
    }
}
