//! # Override Values
//!
//! Raw override payloads arrive as JSON (from the admin API, the remote
//! authority, or an operator's file). [`OverrideValue::coerce`] turns a raw
//! value into the typed form demanded by the target [`FieldPath`], checking
//! type, sign and range. [`OverrideValue::apply_to`] then writes it into a
//! working copy of a [`RateTable`].
//!
//! Coercion never looks at the rest of the table. Structural checks
//! (band contiguity, threshold order) happen afterwards on the whole table.

use std::collections::BTreeSet;
use std::str::FromStr;

use ngtax_core::{Rate, UnknownFieldError, ValidationError};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::error::OverrideError;
use crate::path::{FieldKind, FieldPath};
use crate::table::{normalize_industry, CraCombination, PitBand, RateTable};

/// A type-checked override value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OverrideValue {
    /// A validated rate.
    Rate(Rate),
    /// A non-negative amount, at most [`MAX_AMOUNT`](ngtax_core::MAX_AMOUNT).
    Amount(Decimal),
    /// An amount as above, or open-ended.
    OptionalAmount(Option<Decimal>),
    /// A non-negative integer.
    Count(u32),
    /// A full PIT schedule.
    Bands(Vec<PitBand>),
    /// Normalized industry codes.
    IndustrySet(BTreeSet<String>),
    /// CRA combination rule.
    Combination(CraCombination),
}

impl OverrideValue {
    /// Check `raw` against the shape and range required by `path`.
    pub fn coerce(path: &FieldPath, raw: &Value) -> Result<Self, ValidationError> {
        let field = path.to_string();
        let kind = path.kind();
        match kind {
            FieldKind::Rate => {
                let value = decimal_from_json(&field, kind, raw)?;
                Rate::new(value)
                    .map(Self::Rate)
                    .map_err(|e| e.for_field(&field))
            }
            FieldKind::Amount => {
                let value = decimal_from_json(&field, kind, raw)?;
                ValidationError::ensure_amount(&field, value).map(Self::Amount)
            }
            FieldKind::OptionalAmount => {
                if raw.is_null() {
                    return Ok(Self::OptionalAmount(None));
                }
                let value = decimal_from_json(&field, kind, raw)?;
                ValidationError::ensure_amount(&field, value)
                    .map(|v| Self::OptionalAmount(Some(v)))
            }
            FieldKind::Count => count_from_json(&field, raw).map(Self::Count),
            FieldKind::Bands => bands_from_json(&field, raw).map(Self::Bands),
            FieldKind::IndustrySet => industries_from_json(&field, raw).map(Self::IndustrySet),
            FieldKind::Combination => {
                let text = raw.as_str().ok_or(ValidationError::WrongType {
                    field: field.clone(),
                    expected: kind.expected(),
                })?;
                match text {
                    "higherOf" => Ok(Self::Combination(CraCombination::HigherOf)),
                    "lowerOf" => Ok(Self::Combination(CraCombination::LowerOf)),
                    other => Err(ValidationError::Invalid {
                        field,
                        reason: format!("unknown combination rule \"{other}\""),
                    }),
                }
            }
        }
    }

    /// Write this value into `table` at `path`.
    ///
    /// Fails with [`UnknownFieldError`] when a band index is out of range for
    /// this particular table, and with a type error when the value was not
    /// produced for this kind of path.
    pub fn apply_to(&self, table: &mut RateTable, path: &FieldPath) -> Result<(), OverrideError> {
        if !path.resolves_in(table) {
            return Err(UnknownFieldError::new(path.to_string()).into());
        }
        let mismatch = || -> OverrideError {
            ValidationError::WrongType {
                field: path.to_string(),
                expected: path.kind().expected(),
            }
            .into()
        };

        match (path, self) {
            (FieldPath::PitBands, Self::Bands(bands)) => table.pit_bands = bands.clone(),
            (FieldPath::PitBandLowerBound(i), Self::Amount(v)) => {
                table.pit_bands[*i].lower_bound = *v
            }
            (FieldPath::PitBandUpperBound(i), Self::OptionalAmount(v)) => {
                table.pit_bands[*i].upper_bound = *v
            }
            (FieldPath::PitBandRate(i), Self::Rate(r)) => table.pit_bands[*i].rate = *r,
            (FieldPath::CraFixedAmount, Self::Amount(v)) => table.cra.fixed_amount = *v,
            (FieldPath::CraPercentageOfGross, Self::Rate(r)) => {
                table.cra.percentage_of_gross = *r
            }
            (FieldPath::CraAdditionalPercentage, Self::Rate(r)) => {
                table.cra.additional_percentage = *r
            }
            (FieldPath::CraCombination, Self::Combination(c)) => table.cra.combination = *c,
            (FieldPath::CitSmallCompanyThreshold, Self::Amount(v)) => {
                table.cit.small_company_threshold = *v
            }
            (FieldPath::CitMediumCompanyThreshold, Self::Amount(v)) => {
                table.cit.medium_company_threshold = *v
            }
            (FieldPath::CitSmallCompanyRate, Self::Rate(r)) => table.cit.small_company_rate = *r,
            (FieldPath::CitMediumCompanyRate, Self::Rate(r)) => {
                table.cit.medium_company_rate = *r
            }
            (FieldPath::CitLargeCompanyRate, Self::Rate(r)) => table.cit.large_company_rate = *r,
            (FieldPath::CitMinimumTaxRate, Self::Rate(r)) => table.cit.minimum_tax_rate = *r,
            (FieldPath::CitEducationTaxRate, Self::Rate(r)) => {
                table.cit.education_tax_rate = *r
            }
            (FieldPath::VatRate, Self::Rate(r)) => table.vat_rate = *r,
            (FieldPath::CgtRate, Self::Rate(r)) => table.cgt_rate = *r,
            (FieldPath::PoliceRate, Self::Rate(r)) => table.levies.police.rate = *r,
            (FieldPath::NaseniRate, Self::Rate(r)) => table.levies.naseni.rate = *r,
            (FieldPath::NaseniIndustries, Self::IndustrySet(set)) => {
                table.levies.naseni.industries = set.clone()
            }
            (FieldPath::NsitfRate, Self::Rate(r)) => table.levies.nsitf.rate = *r,
            (FieldPath::ItfRate, Self::Rate(r)) => table.levies.itf.rate = *r,
            (FieldPath::ItfMinEmployees, Self::Count(n)) => table.levies.itf.min_employees = *n,
            (FieldPath::ItfTurnoverThreshold, Self::Amount(v)) => {
                table.levies.itf.turnover_threshold = *v
            }
            _ => return Err(mismatch()),
        }
        Ok(())
    }

    /// JSON form, as reported in audit history.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// JSON coercion helpers
// ---------------------------------------------------------------------------

/// Parse a decimal from a JSON number or numeric string.
///
/// Numbers go through their textual form so `0.07` stays exactly `0.07`.
pub fn decimal_from_json(field: &str, kind: FieldKind, raw: &Value) -> Result<Decimal, ValidationError> {
    let text = match raw {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => {
            return Err(ValidationError::WrongType {
                field: field.to_string(),
                expected: kind.expected(),
            })
        }
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| ValidationError::Invalid {
            field: field.to_string(),
            reason: format!("\"{text}\" is not a decimal number"),
        })
}

fn count_from_json(field: &str, raw: &Value) -> Result<u32, ValidationError> {
    let value = decimal_from_json(field, FieldKind::Count, raw)?;
    let value = ValidationError::ensure_non_negative(field, value)?;
    if !value.fract().is_zero() {
        return Err(ValidationError::Invalid {
            field: field.to_string(),
            reason: format!("{value} is not a whole number"),
        });
    }
    value.to_u32().ok_or_else(|| ValidationError::Invalid {
        field: field.to_string(),
        reason: format!("{value} is too large"),
    })
}

fn bands_from_json(field: &str, raw: &Value) -> Result<Vec<PitBand>, ValidationError> {
    let items = raw.as_array().ok_or(ValidationError::WrongType {
        field: field.to_string(),
        expected: FieldKind::Bands.expected(),
    })?;
    let mut bands = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let object = item.as_object().ok_or(ValidationError::WrongType {
            field: format!("{field}[{index}]"),
            expected: FieldKind::Bands.expected(),
        })?;
        let lower_path = FieldPath::PitBandLowerBound(index);
        let upper_path = FieldPath::PitBandUpperBound(index);
        let rate_path = FieldPath::PitBandRate(index);

        let lower = object
            .get("lowerBound")
            .ok_or_else(|| missing(&lower_path))?;
        let upper = object.get("upperBound").unwrap_or(&Value::Null);
        let rate = object.get("rate").ok_or_else(|| missing(&rate_path))?;

        let lower = match OverrideValue::coerce(&lower_path, lower)? {
            OverrideValue::Amount(v) => v,
            _ => return Err(missing(&lower_path)),
        };
        let upper = match OverrideValue::coerce(&upper_path, upper)? {
            OverrideValue::OptionalAmount(v) => v,
            _ => return Err(missing(&upper_path)),
        };
        let rate = match OverrideValue::coerce(&rate_path, rate)? {
            OverrideValue::Rate(r) => r,
            _ => return Err(missing(&rate_path)),
        };
        bands.push(PitBand::new(lower, upper, rate));
    }
    Ok(bands)
}

fn missing(path: &FieldPath) -> ValidationError {
    ValidationError::Invalid {
        field: path.to_string(),
        reason: format!("missing {}", path.kind().expected()),
    }
}

fn industries_from_json(field: &str, raw: &Value) -> Result<BTreeSet<String>, ValidationError> {
    let items = raw.as_array().ok_or(ValidationError::WrongType {
        field: field.to_string(),
        expected: FieldKind::IndustrySet.expected(),
    })?;
    let mut set = BTreeSet::new();
    for item in items {
        let code = item
            .as_str()
            .map(normalize_industry)
            .filter(|code| !code.is_empty())
            .ok_or(ValidationError::WrongType {
                field: field.to_string(),
                expected: FieldKind::IndustrySet.expected(),
            })?;
        set.insert(code);
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::load_base_rates;
    use serde_json::json;

    #[test]
    fn rate_from_number_is_exact() {
        let v = OverrideValue::coerce(&FieldPath::VatRate, &json!(0.1)).unwrap();
        assert_eq!(v, OverrideValue::Rate(Rate::from_parts(1, 1).unwrap()));
    }

    #[test]
    fn rate_from_string() {
        let v = OverrideValue::coerce(&FieldPath::CgtRate, &json!("0.15")).unwrap();
        assert_eq!(v, OverrideValue::Rate(Rate::from_parts(15, 2).unwrap()));
    }

    #[test]
    fn rate_out_of_range_names_field() {
        let err = OverrideValue::coerce(&FieldPath::PitBandRate(0), &json!(1.5)).unwrap_err();
        assert!(matches!(err, ValidationError::RateOutOfRange { .. }));
        assert_eq!(err.field(), "pitBands[0].rate");
    }

    #[test]
    fn wrong_type_is_rejected() {
        let err = OverrideValue::coerce(&FieldPath::VatRate, &json!(true)).unwrap_err();
        assert!(matches!(err, ValidationError::WrongType { .. }));
        let err = OverrideValue::coerce(&FieldPath::VatRate, &json!("seven")).unwrap_err();
        assert!(matches!(err, ValidationError::Invalid { .. }));
    }

    #[test]
    fn negative_amount_is_rejected() {
        let err =
            OverrideValue::coerce(&FieldPath::CraFixedAmount, &json!(-200000)).unwrap_err();
        assert!(matches!(err, ValidationError::Negative { .. }));
    }

    #[test]
    fn oversized_amount_is_rejected() {
        let err = OverrideValue::coerce(
            &FieldPath::CraFixedAmount,
            &json!(Decimal::MAX.to_string()),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { .. }));
        assert_eq!(err.field(), "cra.fixedAmount");

        let err = OverrideValue::coerce(&FieldPath::PitBandUpperBound(2), &json!("1e20"))
            .unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { .. }));
        assert!(OverrideValue::coerce(
            &FieldPath::ItfTurnoverThreshold,
            &json!(ngtax_core::MAX_AMOUNT.to_string())
        )
        .is_ok());
    }

    #[test]
    fn upper_bound_accepts_null() {
        let v = OverrideValue::coerce(&FieldPath::PitBandUpperBound(5), &json!(null)).unwrap();
        assert_eq!(v, OverrideValue::OptionalAmount(None));
    }

    #[test]
    fn count_must_be_whole() {
        assert_eq!(
            OverrideValue::coerce(&FieldPath::ItfMinEmployees, &json!(10)).unwrap(),
            OverrideValue::Count(10)
        );
        assert!(OverrideValue::coerce(&FieldPath::ItfMinEmployees, &json!(2.5)).is_err());
        assert!(OverrideValue::coerce(&FieldPath::ItfMinEmployees, &json!(-1)).is_err());
    }

    #[test]
    fn industries_are_normalized() {
        let v = OverrideValue::coerce(
            &FieldPath::NaseniIndustries,
            &json!(["Banking", "Oil & Gas", "banking"]),
        )
        .unwrap();
        match v {
            OverrideValue::IndustrySet(set) => {
                assert_eq!(set.len(), 2);
                assert!(set.contains("oil_and_gas"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bands_are_parsed_with_indexed_errors() {
        let v = OverrideValue::coerce(
            &FieldPath::PitBands,
            &json!([
                {"lowerBound": 0, "upperBound": 500000, "rate": 0.1},
                {"lowerBound": 500000, "upperBound": null, "rate": 0.2}
            ]),
        )
        .unwrap();
        assert!(matches!(v, OverrideValue::Bands(ref b) if b.len() == 2));

        let err = OverrideValue::coerce(
            &FieldPath::PitBands,
            &json!([{"lowerBound": 0, "rate": 2}]),
        )
        .unwrap_err();
        assert_eq!(err.field(), "pitBands[0].rate");
    }

    #[test]
    fn combination_rule() {
        assert_eq!(
            OverrideValue::coerce(&FieldPath::CraCombination, &json!("lowerOf")).unwrap(),
            OverrideValue::Combination(CraCombination::LowerOf)
        );
        assert!(OverrideValue::coerce(&FieldPath::CraCombination, &json!("max")).is_err());
    }

    #[test]
    fn apply_writes_field() {
        let mut table = load_base_rates();
        let path = FieldPath::PitBandRate(0);
        let value = OverrideValue::coerce(&path, &json!(0.05)).unwrap();
        value.apply_to(&mut table, &path).unwrap();
        assert_eq!(table.pit_bands[0].rate, Rate::from_parts(5, 2).unwrap());
    }

    #[test]
    fn apply_out_of_range_band_is_unknown_field() {
        let mut table = load_base_rates();
        let path = FieldPath::PitBandRate(42);
        let value = OverrideValue::Rate(Rate::ZERO);
        let err = value.apply_to(&mut table, &path).unwrap_err();
        assert!(matches!(err, OverrideError::UnknownField(_)));
    }

    #[test]
    fn apply_kind_mismatch_is_rejected() {
        let mut table = load_base_rates();
        let err = OverrideValue::Count(3)
            .apply_to(&mut table, &FieldPath::VatRate)
            .unwrap_err();
        assert!(matches!(err, OverrideError::Validation(ValidationError::WrongType { .. })));
    }
}
