//! # Statutory Levies
//!
//! | Levy   | Base               | Applies when                                  |
//! |--------|--------------------|-----------------------------------------------|
//! | Police | net profit         | always                                        |
//! | NASENI | profit before tax  | industry is in the configured set             |
//! | NSITF  | payroll            | always                                        |
//! | ITF    | turnover           | `employees ≥ minEmployees` or turnover ≥ threshold |
//!
//! A negative base (a loss) contributes zero.

use ngtax_core::{checked_sum, Rate, ValidationError};
use ngtax_rates::{normalize_industry, RateTable};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The four statutory levies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LevyKind {
    /// Nigeria Police Trust Fund levy.
    Police,
    /// National Agency for Science and Engineering Infrastructure levy.
    Naseni,
    /// Nigeria Social Insurance Trust Fund contribution.
    Nsitf,
    /// Industrial Training Fund levy.
    Itf,
}

impl LevyKind {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Police => "police",
            Self::Naseni => "naseni",
            Self::Nsitf => "nsitf",
            Self::Itf => "itf",
        }
    }
}

impl std::fmt::Display for LevyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Company figures the levies are computed from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LevyInput {
    /// Net profit (police levy base); may be negative.
    pub net_profit: Decimal,
    /// Profit before tax (NASENI base); may be negative.
    pub profit_before_tax: Decimal,
    /// Annual payroll (NSITF base).
    pub payroll: Decimal,
    /// Annual turnover (ITF base and threshold).
    pub turnover: Decimal,
    /// Headcount.
    pub employees: u32,
    /// Industry code, e.g. `"banking"`.
    pub industry: Option<String>,
}

/// One levy line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevyLine {
    /// Which levy.
    pub levy: LevyKind,
    /// Base amount after clamping at zero.
    pub base_amount: Decimal,
    /// Rate used.
    pub rate: Rate,
    /// Whether the levy applies to this company.
    pub applicable: bool,
    /// Levy due.
    pub amount: Decimal,
}

/// All levies for a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevyResult {
    /// Normalized industry code, when supplied.
    pub industry: Option<String>,
    /// One line per levy.
    pub lines: Vec<LevyLine>,
    /// Sum of levies due.
    pub total: Decimal,
}

fn line(levy: LevyKind, base: Decimal, rate: Rate, applicable: bool) -> LevyLine {
    let base_amount = base.max(Decimal::ZERO);
    LevyLine {
        levy,
        base_amount,
        rate,
        applicable,
        amount: if applicable {
            rate.apply(base_amount)
        } else {
            Decimal::ZERO
        },
    }
}

/// Compute all statutory levies.
pub fn compute_levies(rates: &RateTable, input: &LevyInput) -> Result<LevyResult, ValidationError> {
    ValidationError::ensure_magnitude("netProfit", input.net_profit)?;
    ValidationError::ensure_magnitude("profitBeforeTax", input.profit_before_tax)?;
    ValidationError::ensure_amount("payroll", input.payroll)?;
    ValidationError::ensure_amount("turnover", input.turnover)?;

    let levies = &rates.levies;
    let industry = input
        .industry
        .as_deref()
        .map(normalize_industry)
        .filter(|code| !code.is_empty());
    let naseni_applies = industry
        .as_deref()
        .is_some_and(|code| levies.naseni.applies_to(code));

    let lines = vec![
        line(LevyKind::Police, input.net_profit, levies.police.rate, true),
        line(
            LevyKind::Naseni,
            input.profit_before_tax,
            levies.naseni.rate,
            naseni_applies,
        ),
        line(LevyKind::Nsitf, input.payroll, levies.nsitf.rate, true),
        line(
            LevyKind::Itf,
            input.turnover,
            levies.itf.rate,
            levies.itf.applies(input.employees, input.turnover),
        ),
    ];
    let total = checked_sum("total", lines.iter().map(|l| l.amount))?;
    Ok(LevyResult {
        industry,
        lines,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngtax_rates::load_base_rates;

    fn d(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    fn amount(result: &LevyResult, levy: LevyKind) -> Decimal {
        result
            .lines
            .iter()
            .find(|l| l.levy == levy)
            .map(|l| l.amount)
            .unwrap()
    }

    #[test]
    fn bank_pays_every_levy() {
        let table = load_base_rates();
        let input = LevyInput {
            net_profit: d(100_000_000),
            profit_before_tax: d(120_000_000),
            payroll: d(50_000_000),
            turnover: d(1_000_000_000),
            employees: 200,
            industry: Some("Banking".to_string()),
        };
        let result = compute_levies(&table, &input).unwrap();
        assert_eq!(amount(&result, LevyKind::Police), d(5_000));
        assert_eq!(amount(&result, LevyKind::Naseni), d(300_000));
        assert_eq!(amount(&result, LevyKind::Nsitf), d(500_000));
        assert_eq!(amount(&result, LevyKind::Itf), d(10_000_000));
        assert_eq!(result.total, d(10_805_000));
        assert_eq!(result.industry.as_deref(), Some("banking"));
    }

    #[test]
    fn naseni_skips_unlisted_industry() {
        let table = load_base_rates();
        let input = LevyInput {
            profit_before_tax: d(10_000_000),
            industry: Some("agriculture".to_string()),
            ..LevyInput::default()
        };
        let result = compute_levies(&table, &input).unwrap();
        assert_eq!(amount(&result, LevyKind::Naseni), d(0));
    }

    #[test]
    fn itf_needs_headcount_or_turnover() {
        let table = load_base_rates();
        let small = LevyInput {
            turnover: d(10_000_000),
            employees: 3,
            ..LevyInput::default()
        };
        assert_eq!(amount(&compute_levies(&table, &small).unwrap(), LevyKind::Itf), d(0));

        let staffed = LevyInput {
            employees: 5,
            ..small
        };
        assert_eq!(
            amount(&compute_levies(&table, &staffed).unwrap(), LevyKind::Itf),
            d(100_000)
        );
    }

    #[test]
    fn losses_contribute_zero() {
        let table = load_base_rates();
        let input = LevyInput {
            net_profit: d(-5_000_000),
            profit_before_tax: d(-5_000_000),
            industry: Some("ict".to_string()),
            ..LevyInput::default()
        };
        let result = compute_levies(&table, &input).unwrap();
        assert_eq!(result.total, d(0));
    }

    #[test]
    fn negative_payroll_is_rejected() {
        let table = load_base_rates();
        let input = LevyInput {
            payroll: d(-1),
            ..LevyInput::default()
        };
        assert_eq!(compute_levies(&table, &input).unwrap_err().field(), "payroll");
    }

    #[test]
    fn oversized_bases_are_rejected() {
        let table = load_base_rates();
        let input = LevyInput {
            net_profit: Decimal::MIN,
            ..LevyInput::default()
        };
        assert_eq!(compute_levies(&table, &input).unwrap_err().field(), "netProfit");

        let input = LevyInput {
            turnover: Decimal::MAX,
            employees: 500,
            ..LevyInput::default()
        };
        assert_eq!(compute_levies(&table, &input).unwrap_err().field(), "turnover");
    }

    #[test]
    fn maximal_bases_total_without_overflow() {
        let table = load_base_rates();
        let cap = ngtax_core::MAX_AMOUNT;
        let input = LevyInput {
            net_profit: cap,
            profit_before_tax: cap,
            payroll: cap,
            turnover: cap,
            employees: 500,
            industry: Some("banking".to_string()),
        };
        let result = compute_levies(&table, &input).unwrap();
        assert!(result.total > Decimal::ZERO);
        assert!(result.total < cap);
    }
}
