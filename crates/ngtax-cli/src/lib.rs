//! # ngtax-cli — Command-Line Tool for the Tax Rate Engine
//!
//! Provides the `ngtax` command-line interface over the same engine the HTTP
//! server uses, without a server or a rate authority.
//!
//! ## Subcommands
//!
//! - `ngtax rates` — the effective rate table, optionally with metadata.
//! - `ngtax paths` — every override path the table accepts.
//! - `ngtax pit | cit | cgt | vat | levies` — the calculators.
//!
//! Every subcommand accepts `--overrides FILE`, a JSON or YAML map of
//! `path → value` applied as `manual` overrides before anything runs:
//!
//! ```bash
//! ngtax pit --gross-income 3000000 --overrides budget-2025.yaml
//! ngtax rates --metadata --overrides overrides.json
//! ```

pub mod calc;
pub mod overrides;
pub mod rates;

use serde::Serialize;

/// Actor recorded against overrides loaded from a file.
pub const CLI_ACTOR: &str = "cli";

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
