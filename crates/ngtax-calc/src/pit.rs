//! # Personal Income Tax
//!
//! `taxable = gross − CRA − statutory deductions`, then the progressive band
//! schedule. Each band taxes only the slice of income inside it, so bands
//! above the taxable income contribute nothing.
//!
//! ## CRA (PITA s.33)
//!
//! `combine(fixedAmount, percentageOfGross × gross) + additionalPercentage × gross`
//! where `combine` is the configured higher-of (statutory) or lower-of rule.

use ngtax_core::{checked_add, checked_sum, Rate, ValidationError};
use ngtax_rates::{CraCombination, CraConfig, PitBand, RateTable};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Inputs for a PIT computation. Amounts are annual.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PitInput {
    /// Total annual gross emoluments.
    pub gross_income: Decimal,
    /// Employee pension contribution (Pension Reform Act).
    #[serde(default)]
    pub pension_contribution: Decimal,
    /// National Housing Fund contribution.
    #[serde(default)]
    pub nhf_contribution: Decimal,
    /// National Health Insurance Scheme contribution.
    #[serde(default)]
    pub nhis_contribution: Decimal,
    /// Life assurance premium paid.
    #[serde(default)]
    pub life_assurance_premium: Decimal,
}

impl PitInput {
    /// A computation with gross income only.
    pub fn gross(gross_income: Decimal) -> Self {
        Self {
            gross_income,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::ensure_amount("grossIncome", self.gross_income)?;
        ValidationError::ensure_amount("pensionContribution", self.pension_contribution)?;
        ValidationError::ensure_amount("nhfContribution", self.nhf_contribution)?;
        ValidationError::ensure_amount("nhisContribution", self.nhis_contribution)?;
        ValidationError::ensure_amount("lifeAssurancePremium", self.life_assurance_premium)?;
        Ok(())
    }

    fn statutory_deductions(&self) -> Result<Decimal, ValidationError> {
        checked_sum(
            "statutoryDeductions",
            [
                self.pension_contribution,
                self.nhf_contribution,
                self.nhis_contribution,
                self.life_assurance_premium,
            ],
        )
    }
}

/// How the CRA was arrived at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CraBreakdown {
    /// The fixed amount from the table.
    pub fixed_component: Decimal,
    /// `percentageOfGross × gross`.
    pub proportional_component: Decimal,
    /// Rule used to combine the two.
    pub combination: CraCombination,
    /// `additionalPercentage × gross`.
    pub additional_component: Decimal,
    /// Total relief.
    pub total: Decimal,
}

/// Tax attributable to one band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandTax {
    /// Band position in the schedule.
    pub index: usize,
    /// Band lower bound.
    pub lower_bound: Decimal,
    /// Band upper bound, `None` for the top band.
    pub upper_bound: Option<Decimal>,
    /// Marginal rate used.
    pub rate: Rate,
    /// Portion of taxable income inside the band.
    pub taxable_amount: Decimal,
    /// `taxable_amount × rate`.
    pub tax: Decimal,
}

/// Itemized result of applying a band schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressiveTax {
    /// One line per band, in schedule order.
    pub bands: Vec<BandTax>,
    /// Sum of band taxes.
    pub total_tax: Decimal,
}

/// Full PIT computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PitResult {
    /// Gross income as supplied.
    pub gross_income: Decimal,
    /// CRA breakdown.
    pub cra: CraBreakdown,
    /// Sum of pension, NHF, NHIS and life assurance.
    pub statutory_deductions: Decimal,
    /// CRA plus statutory deductions.
    pub total_reliefs: Decimal,
    /// Income subject to the band schedule, never negative.
    pub taxable_income: Decimal,
    /// Per-band breakdown.
    pub bands: Vec<BandTax>,
    /// Annual tax.
    pub total_tax: Decimal,
    /// `total_tax / gross_income`, 0 when gross is 0.
    pub effective_rate: Decimal,
    /// `total_tax / 12`, rounded to kobo.
    pub monthly_tax: Decimal,
}

/// Compute the Consolidated Relief Allowance for `gross`.
pub fn consolidated_relief(
    cra: &CraConfig,
    gross: Decimal,
) -> Result<CraBreakdown, ValidationError> {
    let proportional_component = cra.percentage_of_gross.apply(gross);
    let additional_component = cra.additional_percentage.apply(gross);
    let base = cra.combination.combine(cra.fixed_amount, proportional_component);
    Ok(CraBreakdown {
        fixed_component: cra.fixed_amount,
        proportional_component,
        combination: cra.combination,
        additional_component,
        total: checked_add("cra.total", base, additional_component)?,
    })
}

/// Apply a band schedule to `taxable`. Non-positive income yields zero tax.
pub fn progressive_tax(bands: &[PitBand], taxable: Decimal) -> ProgressiveTax {
    let taxable = taxable.max(Decimal::ZERO);
    let bands: Vec<BandTax> = bands
        .iter()
        .enumerate()
        .map(|(index, band)| {
            let taxable_amount = band.portion_of(taxable);
            BandTax {
                index,
                lower_bound: band.lower_bound,
                upper_bound: band.upper_bound,
                rate: band.rate,
                taxable_amount,
                tax: band.rate.apply(taxable_amount),
            }
        })
        .collect();
    let total_tax = bands.iter().map(|b| b.tax).sum();
    ProgressiveTax { bands, total_tax }
}

/// Compute annual PIT.
pub fn compute_pit(rates: &RateTable, input: &PitInput) -> Result<PitResult, ValidationError> {
    input.validate()?;

    let cra = consolidated_relief(&rates.cra, input.gross_income)?;
    let statutory_deductions = input.statutory_deductions()?;
    let total_reliefs = checked_add("totalReliefs", cra.total, statutory_deductions)?;
    let taxable_income = (input.gross_income - total_reliefs).max(Decimal::ZERO);

    let ProgressiveTax { bands, total_tax } = progressive_tax(&rates.pit_bands, taxable_income);

    let effective_rate = if input.gross_income.is_zero() {
        Decimal::ZERO
    } else {
        (total_tax / input.gross_income).round_dp(6)
    };

    Ok(PitResult {
        gross_income: input.gross_income,
        cra,
        statutory_deductions,
        total_reliefs,
        taxable_income,
        bands,
        total_tax,
        effective_rate,
        monthly_tax: (total_tax / Decimal::from(12)).round_dp(2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngtax_core::MAX_AMOUNT;
    use ngtax_rates::load_base_rates;

    fn d(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    fn rate(mantissa: i64, scale: u32) -> Rate {
        Rate::from_parts(mantissa, scale).unwrap()
    }

    fn three_band_schedule() -> Vec<PitBand> {
        vec![
            PitBand::new(d(0), Some(d(300_000)), rate(7, 2)),
            PitBand::new(d(300_000), Some(d(600_000)), rate(11, 2)),
            PitBand::new(d(600_000), None, rate(15, 2)),
        ]
    }

    #[test]
    fn three_band_scenario() {
        let result = progressive_tax(&three_band_schedule(), d(700_000));
        assert_eq!(result.bands[0].tax, d(21_000));
        assert_eq!(result.bands[1].tax, d(33_000));
        assert_eq!(result.bands[2].tax, d(15_000));
        assert_eq!(result.total_tax, d(69_000));
    }

    #[test]
    fn lower_first_band_rate() {
        let mut bands = three_band_schedule();
        bands[0].rate = rate(5, 2);
        assert_eq!(progressive_tax(&bands, d(700_000)).total_tax, d(63_000));
    }

    #[test]
    fn zero_and_negative_taxable_income() {
        assert_eq!(progressive_tax(&three_band_schedule(), d(0)).total_tax, d(0));
        let negative = progressive_tax(&three_band_schedule(), d(-5));
        assert_eq!(negative.total_tax, d(0));
        assert!(negative.bands.iter().all(|b| b.taxable_amount.is_zero()));
    }

    #[test]
    fn bands_above_income_contribute_nothing() {
        let result = progressive_tax(&three_band_schedule(), d(250_000));
        assert_eq!(result.bands[0].taxable_amount, d(250_000));
        assert!(result.bands[1].tax.is_zero());
        assert!(result.bands[2].tax.is_zero());
    }

    #[test]
    fn cra_higher_of_fixed_amount() {
        let table = load_base_rates();
        let cra = consolidated_relief(&table.cra, d(3_000_000)).unwrap();
        // 1% of 3M is 30,000 < 200,000; plus 20% of gross.
        assert_eq!(cra.total, d(200_000) + d(600_000));
    }

    #[test]
    fn cra_higher_of_proportional() {
        let table = load_base_rates();
        let cra = consolidated_relief(&table.cra, d(30_000_000)).unwrap();
        assert_eq!(cra.total, d(300_000) + d(6_000_000));
    }

    #[test]
    fn cra_lower_of() {
        let mut table = load_base_rates();
        table.cra.combination = CraCombination::LowerOf;
        let cra = consolidated_relief(&table.cra, d(3_000_000)).unwrap();
        assert_eq!(cra.total, d(30_000) + d(600_000));
    }

    #[test]
    fn full_pit_on_base_rates() {
        let table = load_base_rates();
        let result = compute_pit(&table, &PitInput::gross(d(3_000_000))).unwrap();
        // taxable = 3,000,000 − 800,000 = 2,200,000
        assert_eq!(result.taxable_income, d(2_200_000));
        // 21,000 + 33,000 + 75,000 + 95,000 + 126,000
        assert_eq!(result.total_tax, d(350_000));
        assert_eq!(result.monthly_tax, Decimal::new(2_916_667, 2));
    }

    #[test]
    fn statutory_deductions_reduce_taxable_income() {
        let table = load_base_rates();
        let input = PitInput {
            gross_income: d(3_000_000),
            pension_contribution: d(240_000),
            nhf_contribution: d(75_000),
            ..PitInput::default()
        };
        let result = compute_pit(&table, &input).unwrap();
        assert_eq!(result.statutory_deductions, d(315_000));
        assert_eq!(result.taxable_income, d(1_885_000));
    }

    #[test]
    fn reliefs_exceeding_gross_give_zero_tax() {
        let table = load_base_rates();
        let result = compute_pit(&table, &PitInput::gross(d(150_000))).unwrap();
        assert_eq!(result.taxable_income, d(0));
        assert_eq!(result.total_tax, d(0));
    }

    #[test]
    fn zero_gross_has_zero_effective_rate() {
        let table = load_base_rates();
        let result = compute_pit(&table, &PitInput::gross(d(0))).unwrap();
        assert!(result.effective_rate.is_zero());
    }

    #[test]
    fn negative_inputs_are_rejected() {
        let table = load_base_rates();
        let err = compute_pit(&table, &PitInput::gross(d(-1))).unwrap_err();
        assert_eq!(err.field(), "grossIncome");

        let input = PitInput {
            gross_income: d(1_000_000),
            nhis_contribution: d(-10),
            ..PitInput::default()
        };
        assert_eq!(
            compute_pit(&table, &input).unwrap_err().field(),
            "nhisContribution"
        );
    }

    #[test]
    fn oversized_deductions_are_rejected() {
        let table = load_base_rates();
        let half = Decimal::MAX / d(2) + Decimal::ONE;
        let input = PitInput {
            gross_income: d(1_000_000),
            pension_contribution: half,
            nhf_contribution: half,
            ..PitInput::default()
        };
        let err = compute_pit(&table, &input).unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { .. }));
        assert_eq!(err.field(), "pensionContribution");
    }

    #[test]
    fn deductions_at_the_cap_do_not_overflow() {
        let table = load_base_rates();
        let input = PitInput {
            gross_income: MAX_AMOUNT,
            pension_contribution: MAX_AMOUNT,
            nhf_contribution: MAX_AMOUNT,
            nhis_contribution: MAX_AMOUNT,
            life_assurance_premium: MAX_AMOUNT,
        };
        let result = compute_pit(&table, &input).unwrap();
        assert_eq!(result.statutory_deductions, MAX_AMOUNT * d(4));
        assert!(result.total_tax.is_zero());
    }

    #[test]
    fn maximal_cra_amount_still_computes() {
        let mut table = load_base_rates();
        table.cra.fixed_amount = MAX_AMOUNT;
        let result = compute_pit(&table, &PitInput::gross(MAX_AMOUNT)).unwrap();
        assert!(result.total_tax.is_zero());
    }

    #[test]
    fn input_deserializes_from_camel_case() {
        let input: PitInput =
            serde_json::from_str(r#"{"grossIncome": "5000000", "pensionContribution": 400000}"#)
                .unwrap();
        assert_eq!(input.gross_income, d(5_000_000));
        assert_eq!(input.pension_contribution, d(400_000));
        assert!(input.nhf_contribution.is_zero());
    }

    /// Cumulative closed form: the full tax of every band below the one
    /// containing `taxable`, plus the marginal slice inside it.
    fn closed_form(bands: &[PitBand], taxable: Decimal) -> Decimal {
        let mut accumulated = Decimal::ZERO;
        for band in bands {
            match band.upper_bound {
                Some(upper) if taxable > upper => {
                    accumulated += band.rate.apply(upper - band.lower_bound);
                }
                _ => {
                    if taxable > band.lower_bound {
                        accumulated += band.rate.apply(taxable - band.lower_bound);
                    }
                    break;
                }
            }
        }
        accumulated
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn band_sum_matches_closed_form(kobo in 0i64..2_000_000_000_000) {
                let taxable = Decimal::new(kobo, 2);
                let bands = load_base_rates().pit_bands;
                prop_assert_eq!(progressive_tax(&bands, taxable).total_tax, closed_form(&bands, taxable));
            }

            #[test]
            fn tax_is_monotonic(a in 0i64..100_000_000_000, b in 0i64..100_000_000_000) {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                let bands = load_base_rates().pit_bands;
                let lo_tax = progressive_tax(&bands, Decimal::new(lo, 2)).total_tax;
                let hi_tax = progressive_tax(&bands, Decimal::new(hi, 2)).total_tax;
                prop_assert!(lo_tax <= hi_tax);
            }

            #[test]
            fn pit_never_exceeds_gross(gross in 0i64..10_000_000_000) {
                let table = load_base_rates();
                let result = compute_pit(&table, &PitInput::gross(Decimal::new(gross, 0))).unwrap();
                prop_assert!(result.total_tax <= result.gross_income);
                prop_assert!(result.total_tax >= Decimal::ZERO);
            }
        }
    }
}
