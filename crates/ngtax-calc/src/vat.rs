//! # Value Added Tax
//!
//! Flat rate on standard-rated supplies. Zero-rated and exempt supplies carry
//! no VAT. Amounts may be given VAT-exclusive (default) or VAT-inclusive.

use ngtax_core::{checked_add, Rate, ValidationError};
use ngtax_rates::RateTable;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// VAT treatment of a supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VatTreatment {
    /// Charged at the configured rate.
    #[default]
    Standard,
    /// Taxable at 0% (e.g. exports).
    ZeroRated,
    /// Outside the charge (e.g. basic food items, medical services).
    Exempt,
}

impl VatTreatment {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::ZeroRated => "zeroRated",
            Self::Exempt => "exempt",
        }
    }
}

/// Inputs for a VAT computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VatInput {
    /// Supply amount.
    pub amount: Decimal,
    /// Whether `amount` already includes VAT.
    #[serde(default)]
    pub inclusive: bool,
    /// Treatment of the supply.
    #[serde(default)]
    pub treatment: VatTreatment,
}

/// VAT computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VatResult {
    /// Treatment applied.
    pub treatment: VatTreatment,
    /// Rate used; zero for zero-rated and exempt supplies.
    pub rate: Rate,
    /// VAT-exclusive amount.
    pub net_amount: Decimal,
    /// VAT.
    pub vat: Decimal,
    /// VAT-inclusive amount.
    pub gross_amount: Decimal,
}

/// Compute VAT on a supply.
pub fn compute_vat(rates: &RateTable, input: &VatInput) -> Result<VatResult, ValidationError> {
    let amount = ValidationError::ensure_amount("amount", input.amount)?;
    let rate = match input.treatment {
        VatTreatment::Standard => rates.vat_rate,
        VatTreatment::ZeroRated | VatTreatment::Exempt => Rate::ZERO,
    };

    let (net_amount, vat) = if input.inclusive {
        let net = (amount / (Decimal::ONE + rate.as_decimal())).round_dp(2);
        (net, amount - net)
    } else {
        (amount, rate.apply(amount))
    };

    Ok(VatResult {
        treatment: input.treatment,
        rate,
        net_amount,
        vat,
        gross_amount: checked_add("grossAmount", net_amount, vat)?,
    })
}
