//! # Override Files
//!
//! Loads a `path → value` map from JSON or YAML and builds an engine with
//! it applied. The file is applied as one batch: if any entry is rejected,
//! the command fails and nothing runs.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use ngtax_overrides::{EngineConfig, TaxEngine};
use ngtax_rates::OverrideSource;
use serde_json::Value;

use crate::CLI_ACTOR;

/// Parse an override file. `.yaml`/`.yml` are read as YAML, anything else as JSON.
pub fn load_override_file(path: &Path) -> Result<BTreeMap<String, Value>> {
    if !path.exists() {
        bail!("override file not found: {}", path.display());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read override file: {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let map: BTreeMap<String, Value> = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse override YAML: {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse override JSON: {}", path.display()))?
    };
    Ok(map)
}

/// An engine over the compiled-in base table, with `overrides` applied if given.
pub fn build_engine(overrides: Option<&Path>) -> Result<TaxEngine> {
    let config = EngineConfig::from_env().context("invalid engine configuration")?;
    let engine = TaxEngine::with_base_rates(config);

    let Some(path) = overrides else {
        return Ok(engine);
    };
    let payload = load_override_file(path)?;
    if payload.is_empty() {
        tracing::warn!(file = %path.display(), "override file is empty; using base rates");
        return Ok(engine);
    }

    let view = engine
        .apply_overrides(&payload, OverrideSource::Manual, Some(CLI_ACTOR))
        .with_context(|| format!("override file rejected: {}", path.display()))?;
    tracing::info!(
        file = %path.display(),
        applied = view.applied.len(),
        "applied override file"
    );

    let summary = view.metadata.rates_version_summary;
    if summary.dropped_override_count > 0 {
        tracing::warn!(
            dropped = summary.dropped_override_count,
            "some overrides were dropped during merge; see `ngtax rates --metadata`"
        );
    }
    Ok(engine)
}
