// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Unit and date normalization.
//!
//! Every numeric body field funnels through [`weight_to_kg`] or
//! [`length_to_cm`], so kilograms and centimeters are the only units that
//! ever reach storage. Dates are coerced to `YYYY-MM-DD` by
//! [`normalize_date`]. Nothing in here performs I/O.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exact pound to kilogram factor.
pub const KG_PER_LB: f64 = 0.45359237;
pub const LBS_PER_STONE: f64 = 14.0;
pub const CM_PER_INCH: f64 = 2.54;

/// Formats tried when a date does not split into three `-` separated parts.
const LOOSE_DATE_FORMATS: &[&str] = &[
    "%B %d, %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%Y%m%d",
];

/// Normalization failures, returned to the route handler as typed errors.
///
/// Every message names the offending field so the handler can reject the
/// whole write with something the user can act on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizeError {
    #[error("{field}: unrecognised date '{input}'")]
    InvalidDate { field: &'static str, input: String },

    #[error("unit: unsupported unit '{unit}' (expected {expected})")]
    InvalidUnit {
        unit: String,
        expected: &'static str,
    },

    #[error("{0}: missing or not a number")]
    MissingField(&'static str),

    #[error("{field}: {value} does not give a positive weight")]
    InvalidMagnitude { field: &'static str, value: f64 },
}

impl NormalizeError {
    /// Rename the generic `value` field to the name the caller's body uses.
    pub fn for_field(self, field: &'static str) -> Self {
        match self {
            NormalizeError::MissingField("value") => NormalizeError::MissingField(field),
            NormalizeError::InvalidMagnitude {
                field: "value",
                value,
            } => NormalizeError::InvalidMagnitude { field, value },
            other => other,
        }
    }
}

// ─── Calendar Dates ──────────────────────────────────────────

/// A calendar date in canonical `YYYY-MM-DD` form.
///
/// Day and month ranges are not validated: `32-13-2024` normalizes to
/// `2024-13-32`. Only [`normalize_date`] and the constructors below build
/// one from user input.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalendarDate(String);

impl CalendarDate {
    pub fn from_naive(date: NaiveDate) -> Self {
        Self(date.format("%Y-%m-%d").to_string())
    }

    /// Today's date in UTC.
    pub fn today() -> Self {
        Self::from_naive(Utc::now().date_naive())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a user-supplied date to `YYYY-MM-DD`.
///
/// Accepts `YYYY-MM-DD` (returned as-is), `DD/MM/YYYY` and `DD-MM-YYYY`.
/// Single-digit months and days are zero-padded and a trailing time is
/// dropped, so stored dates sort as strings. Anything else gets one
/// attempt at a general parse. Returns `None` for
/// empty input and for input that cannot be understood; the caller decides
/// whether that means "today" or an `InvalidDate` rejection.
pub fn normalize_date(input: Option<&str>) -> Option<CalendarDate> {
    let trimmed = input?.trim();
    if trimmed.is_empty() {
        return None;
    }

    let dashed = trimmed.replace('/', "-");
    let parts: Vec<&str> = dashed.split('-').collect();
    if let [first, second, third] = parts.as_slice() {
        if !first.is_empty() && !second.is_empty() && !third.is_empty() {
            if first.len() == 4 {
                if !third.bytes().all(|b| b.is_ascii_digit()) {
                    // Timestamps with an offset resolve to their UTC date
                    if let Some(date) = parse_loose_date(trimmed) {
                        return Some(CalendarDate::from_naive(date));
                    }
                }
                let day = third.find(['T', ' ']).map_or(*third, |end| &third[..end]);
                if !day.is_empty() {
                    return Some(CalendarDate(format!("{first}-{}-{}", pad2(second), pad2(day))));
                }
            } else {
                return Some(CalendarDate(format!("{third}-{}-{}", pad2(second), pad2(first))));
            }
        }
    }

    parse_loose_date(trimmed).map(CalendarDate::from_naive)
}

/// Normalize a date the request must carry.
pub fn require_date(
    field: &'static str,
    input: Option<&str>,
) -> Result<CalendarDate, NormalizeError> {
    match input.map(str::trim) {
        None | Some("") => Err(NormalizeError::MissingField(field)),
        Some(raw) => normalize_date(Some(raw)).ok_or_else(|| NormalizeError::InvalidDate {
            field,
            input: raw.to_string(),
        }),
    }
}

/// Normalize an optional date: absent stays absent, garbage is rejected.
pub fn optional_date(
    field: &'static str,
    input: Option<&str>,
) -> Result<Option<CalendarDate>, NormalizeError> {
    match input.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => require_date(field, Some(raw)).map(Some),
    }
}

fn pad2(part: &str) -> String {
    format!("{part:0>2}")
}

fn parse_loose_date(input: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    LOOSE_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(input, format).ok())
}

// ─── Weight ──────────────────────────────────────────────────

/// Unit a weight was entered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lbs,
    StLbs,
}

impl WeightUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Lbs => "lbs",
            WeightUnit::StLbs => "st_lbs",
        }
    }
}

impl FromStr for WeightUnit {
    type Err = NormalizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kg" => Ok(WeightUnit::Kg),
            "lbs" => Ok(WeightUnit::Lbs),
            "st_lbs" => Ok(WeightUnit::StLbs),
            _ => Err(NormalizeError::InvalidUnit {
                unit: s.to_string(),
                expected: "'kg', 'lbs' or 'st_lbs'",
            }),
        }
    }
}

/// Convert a weight to kilograms, rounded to 2 decimal places.
///
/// `value` is the magnitude for `kg` and `lbs`. For `st_lbs`, `stones` is
/// required and `pounds` defaults to 0. The canonical result must be
/// strictly positive.
pub fn weight_to_kg(
    value: Option<f64>,
    unit: WeightUnit,
    stones: Option<f64>,
    pounds: Option<f64>,
) -> Result<f64, NormalizeError> {
    let (field, kg) = match unit {
        WeightUnit::Kg => ("value", require_finite("value", value)?),
        WeightUnit::Lbs => ("value", require_finite("value", value)? * KG_PER_LB),
        WeightUnit::StLbs => {
            let stones = require_finite("stones", stones)?;
            let pounds = match pounds {
                None => 0.0,
                Some(p) if p.is_finite() => p,
                Some(p) => {
                    return Err(NormalizeError::InvalidMagnitude {
                        field: "pounds",
                        value: p,
                    })
                }
            };
            ("stones", (stones * LBS_PER_STONE + pounds) * KG_PER_LB)
        }
    };

    let kg = round_to(kg, 2);
    if kg <= 0.0 {
        return Err(NormalizeError::InvalidMagnitude { field, value: kg });
    }
    Ok(kg)
}

fn require_finite(field: &'static str, value: Option<f64>) -> Result<f64, NormalizeError> {
    value
        .filter(|v| v.is_finite())
        .ok_or(NormalizeError::MissingField(field))
}

// ─── Length ──────────────────────────────────────────────────

/// Unit body measurements were entered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LengthUnit {
    #[default]
    #[serde(rename = "cm")]
    Centimeters,
    #[serde(rename = "in")]
    Inches,
}

impl FromStr for LengthUnit {
    type Err = NormalizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cm" => Ok(LengthUnit::Centimeters),
            "in" | "inch" | "inches" => Ok(LengthUnit::Inches),
            _ => Err(NormalizeError::InvalidUnit {
                unit: s.to_string(),
                expected: "'cm' or 'in'",
            }),
        }
    }
}

/// Convert an optional length to centimeters.
///
/// Centimeter input passes through untouched; inches become
/// `value * 2.54` rounded to 1 decimal. Missing or non-finite input stays
/// `None` and is never coerced to 0.
pub fn length_to_cm(value: Option<f64>, unit: LengthUnit) -> Option<f64> {
    value.filter(|v| v.is_finite()).map(|v| match unit {
        LengthUnit::Centimeters => v,
        LengthUnit::Inches => round_to(v * CM_PER_INCH, 1),
    })
}

/// Parse a unit the request may omit; absent or blank means the default.
pub fn unit_or_default<U>(raw: Option<&str>) -> Result<U, NormalizeError>
where
    U: FromStr<Err = NormalizeError> + Default,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(U::default()),
        Some(unit) => unit.parse(),
    }
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(input: &str) -> Option<String> {
        normalize_date(Some(input)).map(|d| d.to_string())
    }

    #[test]
    fn test_normalize_date_known_forms() {
        assert_eq!(date("31/12/2024").as_deref(), Some("2024-12-31"));
        assert_eq!(date("31-12-2024").as_deref(), Some("2024-12-31"));
        assert_eq!(date("2024-12-31").as_deref(), Some("2024-12-31"));
        assert_eq!(date("  05/01/2025 ").as_deref(), Some("2025-01-05"));
    }

    #[test]
    fn test_normalize_date_empty_is_none() {
        assert_eq!(normalize_date(None), None);
        assert_eq!(normalize_date(Some("")), None);
        assert_eq!(normalize_date(Some("   ")), None);
    }

    #[test]
    fn test_normalize_date_general_parse() {
        assert_eq!(date("December 31, 2024").as_deref(), Some("2024-12-31"));
        assert_eq!(date("1 Mar 2025").as_deref(), Some("2025-03-01"));
        assert_eq!(
            date("Tue, 31 Dec 2024 23:30:00 -0200").as_deref(),
            Some("2025-01-01")
        );
        assert_eq!(date("20241231").as_deref(), Some("2024-12-31"));
        assert_eq!(date("not a date"), None);
        assert_eq!(date("2024-12"), None);
        assert_eq!(date("--"), None);
    }

    #[test]
    fn test_normalize_date_output_sorts_as_string() {
        assert_eq!(date("2024-1-5").as_deref(), Some("2024-01-05"));
        assert_eq!(date("5/1/2024").as_deref(), Some("2024-01-05"));
        assert_eq!(date("2024-12-31T10:00:00Z").as_deref(), Some("2024-12-31"));
        assert_eq!(date("2024-12-31 08:15").as_deref(), Some("2024-12-31"));
        // Offset timestamps land on the UTC day
        assert_eq!(
            date("2024-12-31T23:30:00+00:00").as_deref(),
            Some("2024-12-31")
        );
        assert_eq!(
            date("2025-01-01T00:30:00+02:00").as_deref(),
            Some("2024-12-31")
        );
        assert!(date("2024-1-5").unwrap() < date("2024-10-01").unwrap());
    }

    #[test]
    fn test_normalize_date_does_not_range_check() {
        assert_eq!(date("32-13-2024").as_deref(), Some("2024-13-32"));
    }

    #[test]
    fn test_normalize_date_is_idempotent() {
        for input in [
            "31/12/2024",
            "2024-12-31",
            "01-02-2023",
            "March 3, 2021",
            "2024-12-31T10:00:00Z",
            "2024-1-5",
            "20241231",
        ] {
            let once = normalize_date(Some(input)).unwrap();
            let twice = normalize_date(Some(once.as_str())).unwrap();
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn test_require_and_optional_date() {
        assert_eq!(
            require_date("date", None),
            Err(NormalizeError::MissingField("date"))
        );
        assert!(matches!(
            require_date("date", Some("garbage")),
            Err(NormalizeError::InvalidDate { field: "date", .. })
        ));
        assert_eq!(optional_date("target_date", Some("")), Ok(None));
        assert_eq!(
            optional_date("target_date", Some("01/06/2025"))
                .unwrap()
                .map(|d| d.to_string()),
            Some("2025-06-01".to_string())
        );
    }

    #[test]
    fn test_weight_units() {
        assert_eq!(weight_to_kg(Some(80.456), WeightUnit::Kg, None, None), Ok(80.46));
        assert_eq!(weight_to_kg(Some(200.0), WeightUnit::Lbs, None, None), Ok(90.72));
        assert_eq!(
            weight_to_kg(None, WeightUnit::StLbs, Some(17.0), Some(4.5)),
            Ok(110.0)
        );
        assert_eq!(
            weight_to_kg(None, WeightUnit::StLbs, Some(12.0), None),
            Ok(76.2)
        );
    }

    #[test]
    fn test_weight_zero_is_invalid_magnitude() {
        assert!(matches!(
            weight_to_kg(Some(0.0), WeightUnit::Kg, None, None),
            Err(NormalizeError::InvalidMagnitude { field: "value", .. })
        ));
        assert!(matches!(
            weight_to_kg(Some(-4.0), WeightUnit::Lbs, None, None),
            Err(NormalizeError::InvalidMagnitude { .. })
        ));
        // Rounds to 0.00
        assert!(matches!(
            weight_to_kg(Some(0.004), WeightUnit::Kg, None, None),
            Err(NormalizeError::InvalidMagnitude { .. })
        ));
    }

    #[test]
    fn test_weight_missing_magnitudes() {
        assert_eq!(
            weight_to_kg(None, WeightUnit::Kg, None, None),
            Err(NormalizeError::MissingField("value"))
        );
        assert_eq!(
            weight_to_kg(Some(f64::NAN), WeightUnit::Lbs, None, None),
            Err(NormalizeError::MissingField("value"))
        );
        assert_eq!(
            weight_to_kg(Some(70.0), WeightUnit::StLbs, None, Some(3.0)),
            Err(NormalizeError::MissingField("stones"))
        );
        assert!(matches!(
            weight_to_kg(None, WeightUnit::StLbs, Some(10.0), Some(f64::INFINITY)),
            Err(NormalizeError::InvalidMagnitude { field: "pounds", .. })
        ));
    }

    #[test]
    fn test_weight_unit_parsing() {
        assert_eq!("KG".parse::<WeightUnit>(), Ok(WeightUnit::Kg));
        assert_eq!("st_lbs".parse::<WeightUnit>(), Ok(WeightUnit::StLbs));
        assert!(matches!(
            "stone".parse::<WeightUnit>(),
            Err(NormalizeError::InvalidUnit { .. })
        ));
    }

    #[test]
    fn test_stones_match_pounds() {
        for stones in 5..30 {
            for half_pounds in 0..28 {
                let pounds = half_pounds as f64 / 2.0;
                let via_stones =
                    weight_to_kg(None, WeightUnit::StLbs, Some(stones as f64), Some(pounds))
                        .unwrap();
                let total = stones as f64 * 14.0 + pounds;
                let via_pounds = weight_to_kg(Some(total), WeightUnit::Lbs, None, None).unwrap();
                assert!((via_stones - via_pounds).abs() <= 0.01);
            }
        }
    }

    #[test]
    fn test_weight_is_monotonic() {
        for unit in [WeightUnit::Kg, WeightUnit::Lbs] {
            let mut previous = 0.0;
            for step in 1..2000 {
                let kg = weight_to_kg(Some(step as f64 * 0.173), unit, None, None).unwrap();
                assert!(kg >= previous, "{unit:?} not monotonic at step {step}");
                previous = kg;
            }
        }
    }

    #[test]
    fn test_for_field_renames_generic_value() {
        let err = weight_to_kg(None, WeightUnit::Kg, None, None).unwrap_err();
        assert_eq!(err.for_field("weight"), NormalizeError::MissingField("weight"));

        let err = weight_to_kg(None, WeightUnit::StLbs, None, None).unwrap_err();
        assert_eq!(err.for_field("weight"), NormalizeError::MissingField("stones"));
    }

    #[test]
    fn test_length_to_cm() {
        assert_eq!(length_to_cm(None, LengthUnit::Inches), None);
        assert_eq!(length_to_cm(None, LengthUnit::Centimeters), None);
        assert_eq!(length_to_cm(Some(f64::NAN), LengthUnit::Inches), None);
        assert_eq!(length_to_cm(Some(81.37), LengthUnit::Centimeters), Some(81.37));
        assert_eq!(length_to_cm(Some(32.0), LengthUnit::Inches), Some(81.3));
        assert_eq!(length_to_cm(Some(0.0), LengthUnit::Inches), Some(0.0));
    }

    #[test]
    fn test_length_unit_parsing() {
        assert_eq!("IN".parse::<LengthUnit>(), Ok(LengthUnit::Inches));
        assert_eq!("cm".parse::<LengthUnit>(), Ok(LengthUnit::Centimeters));
        assert!("mm".parse::<LengthUnit>().is_err());
    }

    #[test]
    fn test_unit_or_default() {
        assert_eq!(unit_or_default::<WeightUnit>(None), Ok(WeightUnit::Kg));
        assert_eq!(unit_or_default::<WeightUnit>(Some("  ")), Ok(WeightUnit::Kg));
        assert_eq!(unit_or_default::<WeightUnit>(Some("LBS")), Ok(WeightUnit::Lbs));
        assert_eq!(unit_or_default::<LengthUnit>(Some("in")), Ok(LengthUnit::Inches));
        assert!(matches!(
            unit_or_default::<LengthUnit>(Some("ft")),
            Err(NormalizeError::InvalidUnit { .. })
        ));
    }
}
