//! # Rate Table
//!
//! The statutory constants every calculator reads: progressive PIT bands,
//! the Consolidated Relief Allowance (CRA), company income tax thresholds,
//! flat VAT and CGT rates, and the four statutory levies.
//!
//! A [`RateTable`] is immutable once built. Overrides never mutate the base
//! table; the merge resolver clones it into a new
//! [`EffectiveConfig`](crate::EffectiveConfig).
//!
//! ## Nigerian Context
//!
//! - Personal Income Tax Act (PITA) Sixth Schedule: 7% to 24% bands
//! - PITA s.33: CRA of the higher of ₦200,000 or 1% of gross, plus 20%
//! - Companies Income Tax Act as amended by the Finance Acts 2019–2023:
//!   small / medium / large company bands by gross turnover, minimum tax
//! - Tertiary Education Trust Fund levy on assessable profit
//! - VAT Act (7.5%), Capital Gains Tax Act (10%)
//! - Nigeria Police Trust Fund, NASENI, NSITF and ITF levies

use std::collections::BTreeSet;

use ngtax_core::{ConfigIntegrityError, Rate, MAX_AMOUNT};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Label identifying the compiled-in base schedule.
pub const BASE_RATES_LABEL: &str = "NG-PITA-CITA-2024";

// ---------------------------------------------------------------------------
// PIT bands
// ---------------------------------------------------------------------------

/// One band of the progressive PIT schedule.
///
/// `upper_bound = None` means the band is open-ended; only the last band may
/// be open-ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PitBand {
    /// Inclusive lower bound of taxable income for this band.
    pub lower_bound: Decimal,
    /// Exclusive upper bound, or `None` for the top band.
    #[serde(default)]
    pub upper_bound: Option<Decimal>,
    /// Marginal rate applied to income inside the band.
    pub rate: Rate,
}

impl PitBand {
    /// Construct a band.
    pub fn new(lower_bound: Decimal, upper_bound: Option<Decimal>, rate: Rate) -> Self {
        Self {
            lower_bound,
            upper_bound,
            rate,
        }
    }

    /// The slice of `taxable` that falls inside this band.
    pub fn portion_of(&self, taxable: Decimal) -> Decimal {
        if taxable <= self.lower_bound {
            return Decimal::ZERO;
        }
        let top = match self.upper_bound {
            Some(upper) => taxable.min(upper),
            None => taxable,
        };
        top - self.lower_bound
    }
}

// ---------------------------------------------------------------------------
// Consolidated Relief Allowance
// ---------------------------------------------------------------------------

/// How the fixed CRA amount and the percentage-of-gross amount combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CraCombination {
    /// Take the larger of the two (statutory rule).
    HigherOf,
    /// Take the smaller of the two.
    LowerOf,
}

impl CraCombination {
    /// Wire name of the rule.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HigherOf => "higherOf",
            Self::LowerOf => "lowerOf",
        }
    }

    /// Combine the two candidate amounts.
    pub fn combine(&self, fixed: Decimal, proportional: Decimal) -> Decimal {
        match self {
            Self::HigherOf => fixed.max(proportional),
            Self::LowerOf => fixed.min(proportional),
        }
    }
}

impl std::fmt::Display for CraCombination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CRA constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CraConfig {
    /// Fixed relief amount (₦200,000).
    pub fixed_amount: Decimal,
    /// Fraction of gross compared against the fixed amount.
    pub percentage_of_gross: Rate,
    /// Fraction of gross always added on top.
    pub additional_percentage: Rate,
    /// Rule combining the fixed and proportional amounts.
    pub combination: CraCombination,
}

// ---------------------------------------------------------------------------
// Company income tax
// ---------------------------------------------------------------------------

/// CIT size bands, rates, minimum tax and tertiary education tax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitConfig {
    /// Turnover at or below which a company is small.
    pub small_company_threshold: Decimal,
    /// Turnover below which a non-small company is medium.
    pub medium_company_threshold: Decimal,
    /// Rate for small companies.
    pub small_company_rate: Rate,
    /// Rate for medium companies.
    pub medium_company_rate: Rate,
    /// Rate for large companies.
    pub large_company_rate: Rate,
    /// Minimum tax as a fraction of gross revenue.
    pub minimum_tax_rate: Rate,
    /// Tertiary education tax as a fraction of assessable profit.
    pub education_tax_rate: Rate,
}

// ---------------------------------------------------------------------------
// Levies
// ---------------------------------------------------------------------------

/// Nigeria Police Trust Fund levy, charged on net profit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoliceLevy {
    /// Levy rate.
    pub rate: Rate,
}

/// NASENI levy, charged on profit before tax for listed industries only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NaseniLevy {
    /// Levy rate.
    pub rate: Rate,
    /// Normalized industry codes the levy applies to.
    pub industries: BTreeSet<String>,
}

impl NaseniLevy {
    /// Whether `industry` (in any spelling) is in the levy's scope.
    pub fn applies_to(&self, industry: &str) -> bool {
        self.industries.contains(&normalize_industry(industry))
    }
}

/// Nigeria Social Insurance Trust Fund contribution, charged on payroll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NsitfLevy {
    /// Levy rate.
    pub rate: Rate,
}

/// Industrial Training Fund levy, charged on turnover for employers above
/// either size threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItfLevy {
    /// Levy rate.
    pub rate: Rate,
    /// Headcount at which the levy applies.
    pub min_employees: u32,
    /// Turnover at which the levy applies regardless of headcount.
    pub turnover_threshold: Decimal,
}

impl ItfLevy {
    /// Whether an employer of this size is liable.
    pub fn applies(&self, employees: u32, turnover: Decimal) -> bool {
        employees >= self.min_employees || turnover >= self.turnover_threshold
    }
}

/// The statutory levy schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevyRates {
    /// Police Trust Fund levy.
    pub police: PoliceLevy,
    /// NASENI levy.
    pub naseni: NaseniLevy,
    /// NSITF contribution.
    pub nsitf: NsitfLevy,
    /// ITF levy.
    pub itf: ItfLevy,
}

/// Lower-case snake_case form used for industry codes,
/// e.g. `"Oil & Gas"` → `"oil_and_gas"`.
pub fn normalize_industry(raw: &str) -> String {
    let spaced = raw.trim().to_lowercase().replace('&', " and ");
    spaced
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

// ---------------------------------------------------------------------------
// Rate table
// ---------------------------------------------------------------------------

/// The complete set of statutory constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateTable {
    /// Progressive PIT schedule, ordered by lower bound.
    pub pit_bands: Vec<PitBand>,
    /// Consolidated Relief Allowance.
    pub cra: CraConfig,
    /// Company income tax.
    pub cit: CitConfig,
    /// Flat VAT rate.
    pub vat_rate: Rate,
    /// Flat capital gains tax rate.
    pub cgt_rate: Rate,
    /// Statutory levies.
    pub levies: LevyRates,
}

impl RateTable {
    /// Check every structural invariant.
    ///
    /// Rates are already range-checked by [`Rate`]; this covers band
    /// contiguity, sign of amounts, and threshold ordering.
    pub fn validate(&self) -> Result<(), ConfigIntegrityError> {
        validate_bands(&self.pit_bands)?;
        non_negative("cra.fixedAmount", self.cra.fixed_amount)?;
        non_negative("cit.smallCompanyThreshold", self.cit.small_company_threshold)?;
        non_negative(
            "cit.mediumCompanyThreshold",
            self.cit.medium_company_threshold,
        )?;
        if self.cit.small_company_threshold > self.cit.medium_company_threshold {
            return Err(ConfigIntegrityError::ThresholdOrder {
                lower_field: "cit.smallCompanyThreshold".to_string(),
                lower: self.cit.small_company_threshold,
                upper_field: "cit.mediumCompanyThreshold".to_string(),
                upper: self.cit.medium_company_threshold,
            });
        }
        non_negative(
            "levies.itf.turnoverThreshold",
            self.levies.itf.turnover_threshold,
        )?;
        Ok(())
    }
}

fn non_negative(field: &str, value: Decimal) -> Result<(), ConfigIntegrityError> {
    if value < Decimal::ZERO {
        return Err(ConfigIntegrityError::NegativeAmount {
            field: field.to_string(),
            value,
        });
    }
    within_cap(field, value)
}

fn within_cap(field: &str, value: Decimal) -> Result<(), ConfigIntegrityError> {
    if value > MAX_AMOUNT {
        return Err(ConfigIntegrityError::AmountTooLarge {
            field: field.to_string(),
            value,
            limit: MAX_AMOUNT,
        });
    }
    Ok(())
}

/// Bands must partition `[0, ∞)`: start at zero, touch end-to-end, and end
/// with exactly one open band.
pub fn validate_bands(bands: &[PitBand]) -> Result<(), ConfigIntegrityError> {
    let first = bands.first().ok_or(ConfigIntegrityError::NoBands)?;
    if !first.lower_bound.is_zero() {
        return Err(ConfigIntegrityError::FirstBandNotZero {
            lower: first.lower_bound,
        });
    }

    let last_index = bands.len() - 1;
    let mut previous_upper: Option<Decimal> = None;
    for (index, band) in bands.iter().enumerate() {
        if let Some(expected) = previous_upper {
            if band.lower_bound != expected {
                return Err(ConfigIntegrityError::BandGap {
                    index,
                    expected,
                    found: band.lower_bound,
                });
            }
        }
        match band.upper_bound {
            Some(upper) if upper <= band.lower_bound => {
                return Err(ConfigIntegrityError::EmptyBand {
                    index,
                    lower: band.lower_bound,
                    upper,
                });
            }
            Some(upper) if index == last_index => {
                return Err(ConfigIntegrityError::LastBandBounded { upper });
            }
            None if index != last_index => {
                return Err(ConfigIntegrityError::UnboundedBandNotLast { index });
            }
            _ => {}
        }
        if let Some(upper) = band.upper_bound {
            within_cap(&format!("pitBands[{index}].upperBound"), upper)?;
        }
        previous_upper = band.upper_bound;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Compiled-in base rates
// ---------------------------------------------------------------------------

fn rate(mantissa: i64, scale: u32, field: &str) -> Result<Rate, ConfigIntegrityError> {
    Rate::from_parts(mantissa, scale).map_err(|e| ConfigIntegrityError::RateOutOfRange {
        field: field.to_string(),
        value: e.0,
    })
}

fn naira(amount: i64) -> Decimal {
    Decimal::new(amount, 0)
}

/// Build and validate the compiled-in Nigerian base schedule.
pub fn try_load_base_rates() -> Result<RateTable, ConfigIntegrityError> {
    let schedule: [(i64, Option<i64>, i64); 6] = [
        (0, Some(300_000), 7),
        (300_000, Some(600_000), 11),
        (600_000, Some(1_100_000), 15),
        (1_100_000, Some(1_600_000), 19),
        (1_600_000, Some(3_200_000), 21),
        (3_200_000, None, 24),
    ];
    let pit_bands = schedule
        .iter()
        .enumerate()
        .map(|(i, (lower, upper, pct))| {
            Ok(PitBand::new(
                naira(*lower),
                upper.map(naira),
                rate(*pct, 2, &format!("pitBands[{i}].rate"))?,
            ))
        })
        .collect::<Result<Vec<_>, ConfigIntegrityError>>()?;

    let industries = [
        "banking",
        "mobile_telecommunications",
        "ict",
        "aviation",
        "maritime",
        "oil_and_gas",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let table = RateTable {
        pit_bands,
        cra: CraConfig {
            fixed_amount: naira(200_000),
            percentage_of_gross: rate(1, 2, "cra.percentageOfGross")?,
            additional_percentage: rate(20, 2, "cra.additionalPercentage")?,
            combination: CraCombination::HigherOf,
        },
        cit: CitConfig {
            small_company_threshold: naira(25_000_000),
            medium_company_threshold: naira(100_000_000),
            small_company_rate: Rate::ZERO,
            medium_company_rate: rate(20, 2, "cit.mediumCompanyRate")?,
            large_company_rate: rate(30, 2, "cit.largeCompanyRate")?,
            minimum_tax_rate: rate(5, 3, "cit.minimumTaxRate")?,
            education_tax_rate: rate(3, 2, "cit.educationTaxRate")?,
        },
        vat_rate: rate(75, 3, "vatRate")?,
        cgt_rate: rate(10, 2, "cgtRate")?,
        levies: LevyRates {
            police: PoliceLevy {
                rate: rate(5, 5, "levies.police.rate")?,
            },
            naseni: NaseniLevy {
                rate: rate(25, 4, "levies.naseni.rate")?,
                industries,
            },
            nsitf: NsitfLevy {
                rate: rate(1, 2, "levies.nsitf.rate")?,
            },
            itf: ItfLevy {
                rate: rate(1, 2, "levies.itf.rate")?,
                min_employees: 5,
                turnover_threshold: naira(50_000_000),
            },
        },
    };
    table.validate()?;
    Ok(table)
}

/// The compiled-in base schedule.
///
/// # Panics
///
/// Panics if the compiled-in table violates its own invariants. The process
/// must not start with a malformed schedule.
pub fn load_base_rates() -> RateTable {
    match try_load_base_rates() {
        Ok(table) => table,
        Err(e) => panic!("compiled-in base rate table is malformed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    #[test]
    fn base_rates_validate() {
        let table = try_load_base_rates().unwrap();
        assert_eq!(table.pit_bands.len(), 6);
        assert_eq!(table.vat_rate.as_decimal(), Decimal::new(75, 3));
        assert!(table.pit_bands.last().unwrap().upper_bound.is_none());
    }

    #[test]
    fn base_rates_are_deterministic() {
        assert_eq!(load_base_rates(), load_base_rates());
    }

    #[test]
    fn gap_between_bands_is_rejected() {
        let mut table = load_base_rates();
        table.pit_bands[1].lower_bound = d(250_000);
        assert!(matches!(
            table.validate(),
            Err(ConfigIntegrityError::BandGap { index: 1, .. })
        ));
    }

    #[test]
    fn inverted_band_is_rejected() {
        let mut table = load_base_rates();
        table.pit_bands[0].upper_bound = Some(d(0));
        assert!(matches!(
            table.validate(),
            Err(ConfigIntegrityError::EmptyBand { index: 0, .. })
        ));
    }

    #[test]
    fn open_band_in_the_middle_is_rejected() {
        let mut table = load_base_rates();
        table.pit_bands[2].upper_bound = None;
        assert!(matches!(
            table.validate(),
            Err(ConfigIntegrityError::UnboundedBandNotLast { index: 2 })
        ));
    }

    #[test]
    fn bounded_last_band_is_rejected() {
        let mut table = load_base_rates();
        table.pit_bands[5].upper_bound = Some(d(10_000_000));
        assert!(matches!(
            table.validate(),
            Err(ConfigIntegrityError::LastBandBounded { .. })
        ));
    }

    #[test]
    fn first_band_must_start_at_zero() {
        let mut table = load_base_rates();
        table.pit_bands[0].lower_bound = d(1);
        assert!(matches!(
            table.validate(),
            Err(ConfigIntegrityError::FirstBandNotZero { .. })
        ));
    }

    #[test]
    fn empty_schedule_is_rejected() {
        let mut table = load_base_rates();
        table.pit_bands.clear();
        assert_eq!(table.validate(), Err(ConfigIntegrityError::NoBands));
    }

    #[test]
    fn cit_thresholds_must_be_ordered() {
        let mut table = load_base_rates();
        table.cit.small_company_threshold = d(200_000_000);
        assert!(matches!(
            table.validate(),
            Err(ConfigIntegrityError::ThresholdOrder { .. })
        ));
    }

    #[test]
    fn negative_cra_amount_is_rejected() {
        let mut table = load_base_rates();
        table.cra.fixed_amount = d(-1);
        assert!(matches!(
            table.validate(),
            Err(ConfigIntegrityError::NegativeAmount { .. })
        ));
    }

    #[test]
    fn amounts_above_cap_are_rejected() {
        let mut table = load_base_rates();
        table.cra.fixed_amount = Decimal::MAX;
        assert!(matches!(
            table.validate(),
            Err(ConfigIntegrityError::AmountTooLarge { ref field, .. }) if field == "cra.fixedAmount"
        ));

        let mut table = load_base_rates();
        let last = table.pit_bands.len() - 2;
        table.pit_bands[last].upper_bound = Some(MAX_AMOUNT + Decimal::ONE);
        table.pit_bands[last + 1].lower_bound = MAX_AMOUNT + Decimal::ONE;
        assert!(matches!(
            table.validate(),
            Err(ConfigIntegrityError::AmountTooLarge { .. })
        ));
    }

    #[test]
    fn band_portion_clamps_to_band() {
        let band = PitBand::new(d(300_000), Some(d(600_000)), Rate::from_parts(11, 2).unwrap());
        assert_eq!(band.portion_of(d(100_000)), Decimal::ZERO);
        assert_eq!(band.portion_of(d(450_000)), d(150_000));
        assert_eq!(band.portion_of(d(700_000)), d(300_000));
    }

    #[test]
    fn industry_codes_normalize() {
        assert_eq!(normalize_industry("Oil & Gas"), "oil_and_gas");
        assert_eq!(normalize_industry("  Mobile-Telecommunications "), "mobile_telecommunications");
        let table = load_base_rates();
        assert!(table.levies.naseni.applies_to("ICT"));
        assert!(!table.levies.naseni.applies_to("agriculture"));
    }

    #[test]
    fn itf_applies_on_either_threshold() {
        let itf = load_base_rates().levies.itf;
        assert!(itf.applies(5, Decimal::ZERO));
        assert!(itf.applies(0, d(50_000_000)));
        assert!(!itf.applies(4, d(49_999_999)));
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(load_base_rates()).unwrap();
        assert!(json.get("pitBands").is_some());
        assert_eq!(json["cra"]["combination"], "higherOf");
        assert!(json["levies"]["itf"].get("minEmployees").is_some());
    }
}
