//! # Company Income Tax
//!
//! Companies are sized by gross turnover:
//!
//! | Size   | Turnover                                   |
//! |--------|--------------------------------------------|
//! | Small  | `≤ smallCompanyThreshold`                  |
//! | Medium | `> small` and `< mediumCompanyThreshold`   |
//! | Large  | `≥ mediumCompanyThreshold`                 |
//!
//! CIT is `sizeRate × assessableProfit` (zero for a loss). For medium and
//! large companies, minimum tax (`minimumTaxRate × grossRevenue`) replaces
//! CIT when the company reports a loss or CIT falls below it. Small companies
//! never pay minimum tax and are exempt from tertiary education tax.

use ngtax_core::{checked_add, Rate, ValidationError};
use ngtax_rates::RateTable;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Size band of a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompanySize {
    /// Turnover at or below the small-company threshold.
    Small,
    /// Between the two thresholds.
    Medium,
    /// At or above the medium-company threshold.
    Large,
}

impl CompanySize {
    /// Classify by gross turnover.
    pub fn classify(rates: &RateTable, turnover: Decimal) -> Self {
        if turnover <= rates.cit.small_company_threshold {
            Self::Small
        } else if turnover < rates.cit.medium_company_threshold {
            Self::Medium
        } else {
            Self::Large
        }
    }

    /// The CIT rate for this size.
    pub fn rate(&self, rates: &RateTable) -> Rate {
        match self {
            Self::Small => rates.cit.small_company_rate,
            Self::Medium => rates.cit.medium_company_rate,
            Self::Large => rates.cit.large_company_rate,
        }
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }
}

impl std::fmt::Display for CompanySize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs for a CIT computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitInput {
    /// Gross turnover, used for size classification.
    pub gross_turnover: Decimal,
    /// Assessable profit; negative for a loss.
    pub assessable_profit: Decimal,
    /// Gross revenue for minimum tax; defaults to turnover.
    #[serde(default)]
    pub gross_revenue: Option<Decimal>,
}

/// Full CIT computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CitResult {
    /// Size band.
    pub company_size: CompanySize,
    /// CIT rate for the size band.
    pub rate: Rate,
    /// Assessable profit as supplied.
    pub assessable_profit: Decimal,
    /// `rate × max(profit, 0)`.
    pub computed_tax: Decimal,
    /// Minimum tax rate from the table.
    pub minimum_tax_rate: Rate,
    /// `minimumTaxRate × grossRevenue`; zero for small companies.
    pub minimum_tax: Decimal,
    /// Whether minimum tax replaced computed CIT.
    pub minimum_tax_applied: bool,
    /// CIT due.
    pub cit_payable: Decimal,
    /// Tertiary education tax rate from the table.
    pub education_tax_rate: Rate,
    /// Tertiary education tax due.
    pub education_tax: Decimal,
    /// CIT plus education tax.
    pub total_payable: Decimal,
}

/// Compute company income tax.
pub fn compute_cit(rates: &RateTable, input: &CitInput) -> Result<CitResult, ValidationError> {
    let turnover = ValidationError::ensure_amount("grossTurnover", input.gross_turnover)?;
    let revenue = match input.gross_revenue {
        Some(revenue) => ValidationError::ensure_amount("grossRevenue", revenue)?,
        None => turnover,
    };
    ValidationError::ensure_magnitude("assessableProfit", input.assessable_profit)?;

    let company_size = CompanySize::classify(rates, turnover);
    let rate = company_size.rate(rates);
    let profit = input.assessable_profit.max(Decimal::ZERO);
    let computed_tax = rate.apply(profit);

    let (minimum_tax, minimum_tax_applied) = match company_size {
        CompanySize::Small => (Decimal::ZERO, false),
        CompanySize::Medium | CompanySize::Large => {
            // A loss gives computed_tax = 0, so this covers both triggers.
            let minimum = rates.cit.minimum_tax_rate.apply(revenue);
            (minimum, minimum > computed_tax)
        }
    };
    let cit_payable = if minimum_tax_applied {
        minimum_tax
    } else {
        computed_tax
    };

    let education_tax = match company_size {
        CompanySize::Small => Decimal::ZERO,
        _ => rates.cit.education_tax_rate.apply(profit),
    };

    Ok(CitResult {
        company_size,
        rate,
        assessable_profit: input.assessable_profit,
        computed_tax,
        minimum_tax_rate: rates.cit.minimum_tax_rate,
        minimum_tax,
        minimum_tax_applied,
        cit_payable,
        education_tax_rate: rates.cit.education_tax_rate,
        education_tax,
        total_payable: checked_add("totalPayable", cit_payable, education_tax)?,
    })
}
