//! # ngtax CLI entry point
//!
//! Parses command-line arguments, builds the engine (applying `--overrides`
//! if given) and dispatches to the subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ngtax_cli::calc::{
    run_cgt, run_cit, run_levies, run_pit, run_vat, CgtArgs, CitArgs, LevyArgs, PitArgs, VatArgs,
};
use ngtax_cli::overrides::build_engine;
use ngtax_cli::rates::{run_paths, run_rates, PathsArgs, RatesArgs};

/// Nigerian tax rate engine CLI.
///
/// Inspects the effective rate table and runs the PIT, CIT, CGT, VAT and
/// levy calculators against it, optionally with a file of overrides applied.
#[derive(Parser, Debug)]
#[command(name = "ngtax", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON or YAML file of `path: value` overrides to apply first.
    #[arg(long, global = true, value_name = "FILE")]
    overrides: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the effective rate table.
    Rates(RatesArgs),

    /// List every override path and the value it expects.
    Paths(PathsArgs),

    /// Personal income tax.
    Pit(PitArgs),

    /// Company income tax, minimum tax and education tax.
    Cit(CitArgs),

    /// Capital gains tax on one disposal or a batch file.
    Cgt(CgtArgs),

    /// Value added tax.
    Vat(VatArgs),

    /// Police, NASENI, NSITF and ITF levies.
    Levies(LevyArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let engine = match build_engine(cli.overrides.as_deref()) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(2);
        }
    };

    let result = match &cli.command {
        Commands::Rates(args) => run_rates(args, &engine),
        Commands::Paths(args) => run_paths(args, &engine),
        Commands::Pit(args) => run_pit(args, &engine),
        Commands::Cit(args) => run_cit(args, &engine),
        Commands::Cgt(args) => run_cgt(args, &engine),
        Commands::Vat(args) => run_vat(args, &engine),
        Commands::Levies(args) => run_levies(args, &engine),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
