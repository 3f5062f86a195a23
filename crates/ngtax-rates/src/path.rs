//! # Override Field Paths
//!
//! An override addresses exactly one field of the [`RateTable`] by a
//! canonical camelCase path such as `vatRate`, `cit.minimumTaxRate` or
//! `pitBands[2].rate`. [`FieldPath`] is the parsed form; its `Display`
//! output is the canonical string and round-trips through `FromStr`.

use std::str::FromStr;

use ngtax_core::UnknownFieldError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::table::RateTable;

/// A parsed, addressable field of the rate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldPath {
    /// The entire PIT schedule, replaced as a unit.
    PitBands,
    /// `pitBands[i].lowerBound`
    PitBandLowerBound(usize),
    /// `pitBands[i].upperBound`
    PitBandUpperBound(usize),
    /// `pitBands[i].rate`
    PitBandRate(usize),
    /// `cra.fixedAmount`
    CraFixedAmount,
    /// `cra.percentageOfGross`
    CraPercentageOfGross,
    /// `cra.additionalPercentage`
    CraAdditionalPercentage,
    /// `cra.combination`
    CraCombination,
    /// `cit.smallCompanyThreshold`
    CitSmallCompanyThreshold,
    /// `cit.mediumCompanyThreshold`
    CitMediumCompanyThreshold,
    /// `cit.smallCompanyRate`
    CitSmallCompanyRate,
    /// `cit.mediumCompanyRate`
    CitMediumCompanyRate,
    /// `cit.largeCompanyRate`
    CitLargeCompanyRate,
    /// `cit.minimumTaxRate`
    CitMinimumTaxRate,
    /// `cit.educationTaxRate`
    CitEducationTaxRate,
    /// `vatRate`
    VatRate,
    /// `cgtRate`
    CgtRate,
    /// `levies.police.rate`
    PoliceRate,
    /// `levies.naseni.rate`
    NaseniRate,
    /// `levies.naseni.industries`
    NaseniIndustries,
    /// `levies.nsitf.rate`
    NsitfRate,
    /// `levies.itf.rate`
    ItfRate,
    /// `levies.itf.minEmployees`
    ItfMinEmployees,
    /// `levies.itf.turnoverThreshold`
    ItfTurnoverThreshold,
}

/// The shape of value a path accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    /// A fraction in `[0, 1]`.
    Rate,
    /// A non-negative naira amount.
    Amount,
    /// A non-negative amount or `null` (open-ended).
    OptionalAmount,
    /// A non-negative integer.
    Count,
    /// A full PIT schedule.
    Bands,
    /// A set of industry codes.
    IndustrySet,
    /// `higherOf` or `lowerOf`.
    Combination,
}

impl FieldKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rate => "rate",
            Self::Amount => "amount",
            Self::OptionalAmount => "optionalAmount",
            Self::Count => "count",
            Self::Bands => "bands",
            Self::IndustrySet => "industrySet",
            Self::Combination => "combination",
        }
    }

    /// Description of the accepted JSON shape, used in type errors.
    pub fn expected(&self) -> &'static str {
        match self {
            Self::Rate => "a fraction between 0 and 1",
            Self::Amount => "a non-negative number",
            Self::OptionalAmount => "a non-negative number or null",
            Self::Count => "a non-negative integer",
            Self::Bands => "an array of {lowerBound, upperBound, rate} objects",
            Self::IndustrySet => "an array of industry codes",
            Self::Combination => "\"higherOf\" or \"lowerOf\"",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const SCALARS: [FieldPath; 21] = [
    FieldPath::PitBands,
    FieldPath::CraFixedAmount,
    FieldPath::CraPercentageOfGross,
    FieldPath::CraAdditionalPercentage,
    FieldPath::CraCombination,
    FieldPath::CitSmallCompanyThreshold,
    FieldPath::CitMediumCompanyThreshold,
    FieldPath::CitSmallCompanyRate,
    FieldPath::CitMediumCompanyRate,
    FieldPath::CitLargeCompanyRate,
    FieldPath::CitMinimumTaxRate,
    FieldPath::CitEducationTaxRate,
    FieldPath::VatRate,
    FieldPath::CgtRate,
    FieldPath::PoliceRate,
    FieldPath::NaseniRate,
    FieldPath::NaseniIndustries,
    FieldPath::NsitfRate,
    FieldPath::ItfRate,
    FieldPath::ItfMinEmployees,
    FieldPath::ItfTurnoverThreshold,
];

impl FieldPath {
    /// Canonical name for paths that carry no band index.
    fn scalar_name(&self) -> Option<&'static str> {
        let name = match self {
            Self::PitBands => "pitBands",
            Self::PitBandLowerBound(_) | Self::PitBandUpperBound(_) | Self::PitBandRate(_) => {
                return None
            }
            Self::CraFixedAmount => "cra.fixedAmount",
            Self::CraPercentageOfGross => "cra.percentageOfGross",
            Self::CraAdditionalPercentage => "cra.additionalPercentage",
            Self::CraCombination => "cra.combination",
            Self::CitSmallCompanyThreshold => "cit.smallCompanyThreshold",
            Self::CitMediumCompanyThreshold => "cit.mediumCompanyThreshold",
            Self::CitSmallCompanyRate => "cit.smallCompanyRate",
            Self::CitMediumCompanyRate => "cit.mediumCompanyRate",
            Self::CitLargeCompanyRate => "cit.largeCompanyRate",
            Self::CitMinimumTaxRate => "cit.minimumTaxRate",
            Self::CitEducationTaxRate => "cit.educationTaxRate",
            Self::VatRate => "vatRate",
            Self::CgtRate => "cgtRate",
            Self::PoliceRate => "levies.police.rate",
            Self::NaseniRate => "levies.naseni.rate",
            Self::NaseniIndustries => "levies.naseni.industries",
            Self::NsitfRate => "levies.nsitf.rate",
            Self::ItfRate => "levies.itf.rate",
            Self::ItfMinEmployees => "levies.itf.minEmployees",
            Self::ItfTurnoverThreshold => "levies.itf.turnoverThreshold",
        };
        Some(name)
    }

    /// The value shape this path accepts.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::PitBands => FieldKind::Bands,
            Self::PitBandLowerBound(_)
            | Self::CraFixedAmount
            | Self::CitSmallCompanyThreshold
            | Self::CitMediumCompanyThreshold
            | Self::ItfTurnoverThreshold => FieldKind::Amount,
            Self::PitBandUpperBound(_) => FieldKind::OptionalAmount,
            Self::CraCombination => FieldKind::Combination,
            Self::NaseniIndustries => FieldKind::IndustrySet,
            Self::ItfMinEmployees => FieldKind::Count,
            Self::PitBandRate(_)
            | Self::CraPercentageOfGross
            | Self::CraAdditionalPercentage
            | Self::CitSmallCompanyRate
            | Self::CitMediumCompanyRate
            | Self::CitLargeCompanyRate
            | Self::CitMinimumTaxRate
            | Self::CitEducationTaxRate
            | Self::VatRate
            | Self::CgtRate
            | Self::PoliceRate
            | Self::NaseniRate
            | Self::NsitfRate
            | Self::ItfRate => FieldKind::Rate,
        }
    }

    /// The band index, for per-band paths.
    pub fn band_index(&self) -> Option<usize> {
        match self {
            Self::PitBandLowerBound(i) | Self::PitBandUpperBound(i) | Self::PitBandRate(i) => {
                Some(*i)
            }
            _ => None,
        }
    }

    /// Whether the path addresses an existing field of `table`.
    ///
    /// Only band paths can fail: their index must be in range.
    pub fn resolves_in(&self, table: &RateTable) -> bool {
        self.band_index()
            .map_or(true, |index| index < table.pit_bands.len())
    }

    /// Every path addressable in `table`, in canonical order.
    pub fn all_for(table: &RateTable) -> Vec<FieldPath> {
        let mut paths = Vec::with_capacity(SCALARS.len() + table.pit_bands.len() * 3);
        paths.push(FieldPath::PitBands);
        for index in 0..table.pit_bands.len() {
            paths.push(FieldPath::PitBandLowerBound(index));
            paths.push(FieldPath::PitBandUpperBound(index));
            paths.push(FieldPath::PitBandRate(index));
        }
        paths.extend(SCALARS.iter().skip(1).copied());
        paths
    }
}

fn parse_band_path(rest: &str, original: &str) -> Result<FieldPath, UnknownFieldError> {
    let unknown = || UnknownFieldError::new(original);
    let (index, field) = rest.split_once(']').ok_or_else(unknown)?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return Err(unknown());
    }
    let index: usize = index.parse().map_err(|_| unknown())?;
    match field {
        ".lowerBound" => Ok(FieldPath::PitBandLowerBound(index)),
        ".upperBound" => Ok(FieldPath::PitBandUpperBound(index)),
        ".rate" => Ok(FieldPath::PitBandRate(index)),
        _ => Err(unknown()),
    }
}

impl FromStr for FieldPath {
    type Err = UnknownFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("pitBands[") {
            return parse_band_path(rest, s);
        }
        SCALARS
            .iter()
            .find(|path| path.scalar_name() == Some(s))
            .copied()
            .ok_or_else(|| UnknownFieldError::new(s))
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(name) = self.scalar_name() {
            return f.write_str(name);
        }
        match self {
            Self::PitBandLowerBound(i) => write!(f, "pitBands[{i}].lowerBound"),
            Self::PitBandUpperBound(i) => write!(f, "pitBands[{i}].upperBound"),
            Self::PitBandRate(i) => write!(f, "pitBands[{i}].rate"),
            _ => Ok(()),
        }
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::load_base_rates;

    #[test]
    fn parses_scalar_paths() {
        assert_eq!("vatRate".parse::<FieldPath>().unwrap(), FieldPath::VatRate);
        assert_eq!(
            "levies.itf.minEmployees".parse::<FieldPath>().unwrap(),
            FieldPath::ItfMinEmployees
        );
    }

    #[test]
    fn parses_band_paths() {
        assert_eq!(
            "pitBands[2].rate".parse::<FieldPath>().unwrap(),
            FieldPath::PitBandRate(2)
        );
        assert_eq!(
            "pitBands[10].upperBound".parse::<FieldPath>().unwrap(),
            FieldPath::PitBandUpperBound(10)
        );
    }

    #[test]
    fn rejects_malformed_paths() {
        for bad in [
            "",
            "vat_rate",
            "pitBands[]",
            "pitBands[-1].rate",
            "pitBands[+1].rate",
            "pitBands[0]",
            "pitBands[0].width",
            "pitBands[x].rate",
            "levies.police",
            "cit.smallCompanyThreshold.extra",
        ] {
            let err = bad.parse::<FieldPath>().unwrap_err();
            assert_eq!(err.path, bad);
        }
    }

    #[test]
    fn display_is_canonical() {
        for path in FieldPath::all_for(&load_base_rates()) {
            let text = path.to_string();
            assert_eq!(text.parse::<FieldPath>().unwrap(), path, "{text}");
        }
    }

    #[test]
    fn band_index_must_resolve() {
        let table = load_base_rates();
        assert!(FieldPath::PitBandRate(5).resolves_in(&table));
        assert!(!FieldPath::PitBandRate(6).resolves_in(&table));
        assert!(FieldPath::VatRate.resolves_in(&table));
    }

    #[test]
    fn kinds() {
        assert_eq!(FieldPath::PitBandUpperBound(0).kind(), FieldKind::OptionalAmount);
        assert_eq!(FieldPath::NaseniIndustries.kind(), FieldKind::IndustrySet);
        assert_eq!(FieldPath::CitMinimumTaxRate.kind(), FieldKind::Rate);
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&FieldPath::PitBandRate(0)).unwrap();
        assert_eq!(json, "\"pitBands[0].rate\"");
        let back: FieldPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FieldPath::PitBandRate(0));
    }
}
