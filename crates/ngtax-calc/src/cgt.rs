//! # Capital Gains Tax
//!
//! `gain = max(0, proceeds − costBasis)`, `tax = gain × cgtRate`.
//!
//! A batch is taxed disposal by disposal. Losses on one disposal are not
//! netted against gains on another; they are reported separately as
//! `unrelievedLosses`.

use ngtax_core::{checked_sum, Rate, ValidationError};
use ngtax_rates::RateTable;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One disposal of a chargeable asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disposal {
    /// Optional caller label, echoed back in the result.
    #[serde(default)]
    pub label: Option<String>,
    /// Acquisition cost including allowable expenditure.
    pub cost_basis: Decimal,
    /// Consideration received on disposal.
    pub proceeds: Decimal,
}

/// CGT on one disposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CgtResult {
    /// Caller label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Cost basis.
    pub cost_basis: Decimal,
    /// Proceeds.
    pub proceeds: Decimal,
    /// Chargeable gain, never negative.
    pub gain: Decimal,
    /// Loss on the disposal, never negative; not relieved.
    pub loss: Decimal,
    /// CGT rate used.
    pub rate: Rate,
    /// Tax due.
    pub tax: Decimal,
}

/// CGT over several disposals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CgtBatchResult {
    /// Per-disposal results, in input order.
    pub disposals: Vec<CgtResult>,
    /// Sum of gains.
    pub total_gains: Decimal,
    /// Sum of losses, reported only.
    pub unrelieved_losses: Decimal,
    /// Sum of taxes.
    pub total_tax: Decimal,
}

fn validate(disposal: &Disposal, prefix: &str) -> Result<(), ValidationError> {
    ValidationError::ensure_amount(&format!("{prefix}costBasis"), disposal.cost_basis)?;
    ValidationError::ensure_amount(&format!("{prefix}proceeds"), disposal.proceeds)?;
    Ok(())
}

fn assess(rates: &RateTable, disposal: &Disposal) -> CgtResult {
    let difference = disposal.proceeds - disposal.cost_basis;
    let gain = difference.max(Decimal::ZERO);
    let loss = (-difference).max(Decimal::ZERO);
    CgtResult {
        label: disposal.label.clone(),
        cost_basis: disposal.cost_basis,
        proceeds: disposal.proceeds,
        gain,
        loss,
        rate: rates.cgt_rate,
        tax: rates.cgt_rate.apply(gain),
    }
}

/// CGT on a single disposal.
pub fn compute_cgt(rates: &RateTable, disposal: &Disposal) -> Result<CgtResult, ValidationError> {
    validate(disposal, "")?;
    Ok(assess(rates, disposal))
}

/// CGT on a batch of disposals, without loss netting.
pub fn compute_cgt_batch(
    rates: &RateTable,
    disposals: &[Disposal],
) -> Result<CgtBatchResult, ValidationError> {
    for (index, disposal) in disposals.iter().enumerate() {
        validate(disposal, &format!("disposals[{index}]."))?;
    }
    let disposals: Vec<CgtResult> = disposals.iter().map(|d| assess(rates, d)).collect();
    Ok(CgtBatchResult {
        total_gains: checked_sum("totalGains", disposals.iter().map(|d| d.gain))?,
        unrelieved_losses: checked_sum("unrelievedLosses", disposals.iter().map(|d| d.loss))?,
        total_tax: checked_sum("totalTax", disposals.iter().map(|d| d.tax))?,
        disposals,
    })
}
