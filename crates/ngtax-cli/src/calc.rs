//! # Calculator Subcommands
//!
//! `ngtax pit | cit | cgt | vat | levies` run a calculator against the
//! effective configuration and print the result with `ratesUsed`, the same
//! shape the HTTP API returns.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use ngtax_calc::{
    compute_cgt, compute_cgt_batch, compute_cit, compute_levies, compute_pit, compute_vat,
    CitInput, Disposal, LevyInput, PitInput, VatInput, VatTreatment,
};
use ngtax_core::{Decimal, ValidationError};
use ngtax_overrides::{Assessment, RatesUsed, TaxEngine};
use ngtax_rates::RateTable;
use serde::Serialize;
use serde_json::Value;

/// Arguments for `ngtax pit`.
#[derive(Args, Debug)]
pub struct PitArgs {
    /// Annual gross emoluments.
    #[arg(long)]
    pub gross_income: Decimal,
    /// Employee pension contribution.
    #[arg(long, default_value_t = Decimal::ZERO)]
    pub pension: Decimal,
    /// National Housing Fund contribution.
    #[arg(long, default_value_t = Decimal::ZERO)]
    pub nhf: Decimal,
    /// NHIS contribution.
    #[arg(long, default_value_t = Decimal::ZERO)]
    pub nhis: Decimal,
    /// Life assurance premium.
    #[arg(long, default_value_t = Decimal::ZERO)]
    pub life_assurance: Decimal,
}

/// Arguments for `ngtax cit`.
#[derive(Args, Debug)]
pub struct CitArgs {
    /// Gross turnover, used for size classification.
    #[arg(long)]
    pub turnover: Decimal,
    /// Assessable profit; negative for a loss.
    #[arg(long, allow_hyphen_values = true)]
    pub profit: Decimal,
    /// Gross revenue for minimum tax (defaults to turnover).
    #[arg(long)]
    pub gross_revenue: Option<Decimal>,
}

/// Arguments for `ngtax cgt`.
#[derive(Args, Debug)]
pub struct CgtArgs {
    /// Acquisition cost including allowable expenditure.
    #[arg(long, required_unless_present = "batch", conflicts_with = "batch")]
    pub cost_basis: Option<Decimal>,
    /// Disposal proceeds.
    #[arg(long, required_unless_present = "batch", conflicts_with = "batch")]
    pub proceeds: Option<Decimal>,
    /// Label echoed in the result.
    #[arg(long)]
    pub label: Option<String>,
    /// JSON file holding an array of disposals.
    #[arg(long, value_name = "FILE")]
    pub batch: Option<PathBuf>,
}

/// Arguments for `ngtax vat`.
#[derive(Args, Debug)]
pub struct VatArgs {
    /// Supply amount.
    #[arg(long)]
    pub amount: Decimal,
    /// The amount already includes VAT.
    #[arg(long)]
    pub inclusive: bool,
    /// standard, zeroRated or exempt.
    #[arg(long, default_value = "standard", value_parser = parse_treatment)]
    pub treatment: VatTreatment,
}

/// Arguments for `ngtax levies`.
#[derive(Args, Debug)]
pub struct LevyArgs {
    /// Net profit (police levy base).
    #[arg(long, default_value_t = Decimal::ZERO, allow_hyphen_values = true)]
    pub net_profit: Decimal,
    /// Profit before tax (NASENI base).
    #[arg(long, default_value_t = Decimal::ZERO, allow_hyphen_values = true)]
    pub profit_before_tax: Decimal,
    /// Annual payroll (NSITF base).
    #[arg(long, default_value_t = Decimal::ZERO)]
    pub payroll: Decimal,
    /// Annual turnover (ITF base).
    #[arg(long, default_value_t = Decimal::ZERO)]
    pub turnover: Decimal,
    /// Headcount.
    #[arg(long, default_value_t = 0)]
    pub employees: u32,
    /// Industry code, e.g. banking.
    #[arg(long)]
    pub industry: Option<String>,
}

fn parse_treatment(raw: &str) -> Result<VatTreatment, String> {
    serde_json::from_value(Value::String(raw.to_string()))
        .map_err(|_| format!("unknown VAT treatment {raw:?}; expected standard, zeroRated or exempt"))
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

fn assess<T, F>(engine: &TaxEngine, calculate: F) -> Result<Value>
where
    T: Serialize,
    F: FnOnce(&RateTable) -> Result<T, ValidationError>,
{
    let config = engine.current_config();
    let assessment = Assessment {
        result: calculate(config.rates())?,
        rates_used: RatesUsed::of(&config),
    };
    Ok(serde_json::to_value(assessment)?)
}

/// The JSON `ngtax pit` prints.
pub fn pit_report(args: &PitArgs, engine: &TaxEngine) -> Result<Value> {
    let input = PitInput {
        gross_income: args.gross_income,
        pension_contribution: args.pension,
        nhf_contribution: args.nhf,
        nhis_contribution: args.nhis,
        life_assurance_premium: args.life_assurance,
    };
    assess(engine, |rates| compute_pit(rates, &input))
}

/// The JSON `ngtax cit` prints.
pub fn cit_report(args: &CitArgs, engine: &TaxEngine) -> Result<Value> {
    let input = CitInput {
        gross_turnover: args.turnover,
        assessable_profit: args.profit,
        gross_revenue: args.gross_revenue,
    };
    assess(engine, |rates| compute_cit(rates, &input))
}

/// The JSON `ngtax cgt` prints.
pub fn cgt_report(args: &CgtArgs, engine: &TaxEngine) -> Result<Value> {
    if let Some(path) = &args.batch {
        let disposals = load_disposals(path)?;
        return assess(engine, |rates| compute_cgt_batch(rates, &disposals));
    }
    let (Some(cost_basis), Some(proceeds)) = (args.cost_basis, args.proceeds) else {
        bail!("--cost-basis and --proceeds are required without --batch");
    };
    let disposal = Disposal {
        label: args.label.clone(),
        cost_basis,
        proceeds,
    };
    assess(engine, |rates| compute_cgt(rates, &disposal))
}

fn load_disposals(path: &std::path::Path) -> Result<Vec<Disposal>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read disposals file: {}", path.display()))?;
    let disposals: Vec<Disposal> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse disposals JSON: {}", path.display()))?;
    if disposals.is_empty() {
        bail!("disposals file is empty: {}", path.display());
    }
    Ok(disposals)
}

/// The JSON `ngtax vat` prints.
pub fn vat_report(args: &VatArgs, engine: &TaxEngine) -> Result<Value> {
    let input = VatInput {
        amount: args.amount,
        inclusive: args.inclusive,
        treatment: args.treatment,
    };
    assess(engine, |rates| compute_vat(rates, &input))
}

/// The JSON `ngtax levies` prints.
pub fn levies_report(args: &LevyArgs, engine: &TaxEngine) -> Result<Value> {
    let input = LevyInput {
        net_profit: args.net_profit,
        profit_before_tax: args.profit_before_tax,
        payroll: args.payroll,
        turnover: args.turnover,
        employees: args.employees,
        industry: args.industry.clone(),
    };
    assess(engine, |rates| compute_levies(rates, &input))
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Execute `ngtax pit`.
pub fn run_pit(args: &PitArgs, engine: &TaxEngine) -> Result<u8> {
    crate::print_json(&pit_report(args, engine)?)?;
    Ok(0)
}

/// Execute `ngtax cit`.
pub fn run_cit(args: &CitArgs, engine: &TaxEngine) -> Result<u8> {
    crate::print_json(&cit_report(args, engine)?)?;
    Ok(0)
}

/// Execute `ngtax cgt`.
pub fn run_cgt(args: &CgtArgs, engine: &TaxEngine) -> Result<u8> {
    crate::print_json(&cgt_report(args, engine)?)?;
    Ok(0)
}

/// Execute `ngtax vat`.
pub fn run_vat(args: &VatArgs, engine: &TaxEngine) -> Result<u8> {
    crate::print_json(&vat_report(args, engine)?)?;
    Ok(0)
}

/// Execute `ngtax levies`.
pub fn run_levies(args: &LevyArgs, engine: &TaxEngine) -> Result<u8> {
    crate::print_json(&levies_report(args, engine)?)?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngtax_overrides::EngineConfig;
    use ngtax_rates::OverrideSource;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn engine() -> TaxEngine {
        TaxEngine::with_base_rates(EngineConfig::default())
    }

    fn d(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn pit_args(gross: i64) -> PitArgs {
        PitArgs {
            gross_income: d(gross),
            pension: Decimal::ZERO,
            nhf: Decimal::ZERO,
            nhis: Decimal::ZERO,
            life_assurance: Decimal::ZERO,
        }
    }

    #[test]
    fn cgt_single_disposal() {
        let args = CgtArgs {
            cost_basis: Some(d(1_000_000)),
            proceeds: Some(d(1_500_000)),
            label: Some("plot 7".to_string()),
            batch: None,
        };
        let report = cgt_report(&args, &engine()).unwrap();
        assert_eq!(report["tax"], "50000.00");
        assert_eq!(report["label"], "plot 7");
        assert_eq!(report["ratesUsed"]["overrideCount"], 0);
    }

    #[test]
    fn cgt_batch_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disposals.json");
        std::fs::write(
            &path,
            r#"[{"costBasis": 1000000, "proceeds": 1500000},
                {"costBasis": 800000, "proceeds": 600000}]"#,
        )
        .unwrap();
        let args = CgtArgs {
            cost_basis: None,
            proceeds: None,
            label: None,
            batch: Some(path),
        };
        let report = cgt_report(&args, &engine()).unwrap();
        assert_eq!(report["disposals"].as_array().unwrap().len(), 2);
        assert_eq!(report["totalGains"], "500000");
        assert_eq!(report["unrelievedLosses"], "200000");
    }

    #[test]
    fn cgt_empty_batch_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disposals.json");
        std::fs::write(&path, "[]").unwrap();
        let args = CgtArgs {
            cost_basis: None,
            proceeds: None,
            label: None,
            batch: Some(path),
        };
        assert!(cgt_report(&args, &engine()).is_err());
    }

    #[test]
    fn pit_follows_overrides() {
        let engine = engine();
        let before = pit_report(&pit_args(5_000_000), &engine).unwrap();

        let mut payload = BTreeMap::new();
        payload.insert("pitBands[0].rate".to_string(), json!(0.0));
        engine
            .apply_overrides(&payload, OverrideSource::Manual, Some("cli"))
            .unwrap();
        let after = pit_report(&pit_args(5_000_000), &engine).unwrap();

        assert_ne!(before["totalTax"], after["totalTax"]);
        assert_ne!(
            before["ratesUsed"]["fingerprint"],
            after["ratesUsed"]["fingerprint"]
        );
        assert_eq!(after["ratesUsed"]["overrideCount"], 1);
    }

    #[test]
    fn negative_income_names_field() {
        let err = pit_report(&pit_args(-1), &engine()).unwrap_err();
        assert!(err.to_string().contains("grossIncome"));
    }

    #[test]
    fn cit_large_company() {
        let args = CitArgs {
            turnover: d(500_000_000),
            profit: d(100_000_000),
            gross_revenue: None,
        };
        let report = cit_report(&args, &engine()).unwrap();
        assert_eq!(report["companySize"], "large");
        assert_eq!(report["citPayable"], "30000000.00");
    }

    #[test]
    fn vat_treatments_parse() {
        assert_eq!(parse_treatment("zeroRated").unwrap(), VatTreatment::ZeroRated);
        assert_eq!(parse_treatment("exempt").unwrap(), VatTreatment::Exempt);
        assert!(parse_treatment("reduced").is_err());
    }

    #[test]
    fn vat_exclusive_standard() {
        let args = VatArgs {
            amount: d(100_000),
            inclusive: false,
            treatment: VatTreatment::Standard,
        };
        let report = vat_report(&args, &engine()).unwrap();
        assert_eq!(report["treatment"], "standard");
        assert!(report.get("ratesUsed").is_some());
    }

    #[test]
    fn levies_report_lists_lines() {
        let args = LevyArgs {
            net_profit: d(1_000_000),
            profit_before_tax: d(1_000_000),
            payroll: d(10_000_000),
            turnover: d(100_000_000),
            employees: 10,
            industry: Some("banking".to_string()),
        };
        let report = levies_report(&args, &engine()).unwrap();
        assert!(!report["lines"].as_array().unwrap().is_empty());
        assert!(report.get("total").is_some());
    }
}
