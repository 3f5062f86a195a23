//! # Rates and Paths Subcommands
//!
//! `ngtax rates` prints the effective rate table; `ngtax paths` lists the
//! override paths it accepts with the value shape each expects.

use anyhow::Result;
use clap::Args;
use ngtax_overrides::TaxEngine;
use ngtax_rates::FieldPath;
use serde_json::{json, Value};

/// Arguments for `ngtax rates`.
#[derive(Args, Debug)]
pub struct RatesArgs {
    /// Include version summary, applied and dropped overrides.
    #[arg(long)]
    pub metadata: bool,
}

/// Arguments for `ngtax paths`.
#[derive(Args, Debug)]
pub struct PathsArgs {
    /// Only list paths of this kind (rate, amount, optionalAmount, count, bands, industrySet, combination).
    #[arg(long)]
    pub kind: Option<String>,
}

/// Execute `ngtax rates`.
pub fn run_rates(args: &RatesArgs, engine: &TaxEngine) -> Result<u8> {
    crate::print_json(&rates_report(args, engine)?)?;
    Ok(0)
}

/// The JSON `ngtax rates` prints.
pub fn rates_report(args: &RatesArgs, engine: &TaxEngine) -> Result<Value> {
    let config = engine.current_config();
    let rates = serde_json::to_value(config.rates())?;
    if !args.metadata {
        return Ok(rates);
    }
    Ok(json!({
        "rates": rates,
        "metadata": engine.get_metadata(),
        "appliedOverrides": config.applied_overrides(),
        "droppedOverrides": config.dropped_overrides(),
    }))
}

/// Execute `ngtax paths`.
pub fn run_paths(args: &PathsArgs, engine: &TaxEngine) -> Result<u8> {
    crate::print_json(&paths_report(args, engine))?;
    Ok(0)
}

/// The JSON `ngtax paths` prints.
pub fn paths_report(args: &PathsArgs, engine: &TaxEngine) -> Value {
    let config = engine.current_config();
    let paths: Vec<Value> = FieldPath::all_for(config.rates())
        .into_iter()
        .filter(|p| {
            args.kind
                .as_deref()
                .map_or(true, |k| p.kind().as_str() == k)
        })
        .map(|p| {
            json!({
                "path": p.to_string(),
                "kind": p.kind().as_str(),
                "expected": p.kind().expected(),
            })
        })
        .collect();
    Value::Array(paths)
}
