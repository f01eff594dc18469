//! Raw filter values

use std::fmt;
use std::ops::RangeInclusive;

use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc};

use crate::columns::ColumnDataType;

/// Years an RFC 3339 timestamp can carry (four digits, no sign)
pub const DATE_YEARS: RangeInclusive<i32> = 0..=9999;

/// A single filter operand, typed by the column it applies to
///
/// Text, option and multi-option columns take `Text`; number columns take a
/// finite `Number`; date columns take a UTC `Date`. Boolean operators carry
/// no values.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(f64),
    Date(DateTime<Utc>),
}

impl FilterValue {
    /// Parse a transport string according to the column's data type
    pub fn parse(data_type: ColumnDataType, raw: &str) -> Result<Self, String> {
        match data_type {
            ColumnDataType::Text | ColumnDataType::Option | ColumnDataType::MultiOption => {
                Ok(Self::Text(raw.to_string()))
            }
            ColumnDataType::Number => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Self::Number)
                .ok_or_else(|| format!("'{}' is not a finite number", raw)),
            ColumnDataType::Date => parse_date(raw)
                .map(Self::Date)
                .ok_or_else(|| format!("'{}' is not an RFC 3339 timestamp or YYYY-MM-DD date", raw)),
            ColumnDataType::Boolean => Err("boolean columns take no values".to_string()),
        }
    }

    /// Format for transport; `parse` of the result yields an equal value
    pub fn to_param(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Date(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }

    /// Whether this value has the shape a column of `data_type` expects
    pub fn fits(&self, data_type: ColumnDataType) -> bool {
        match (self, data_type) {
            (
                Self::Text(_),
                ColumnDataType::Text | ColumnDataType::Option | ColumnDataType::MultiOption,
            ) => true,
            (Self::Number(n), ColumnDataType::Number) => n.is_finite(),
            (Self::Date(dt), ColumnDataType::Date) => DATE_YEARS.contains(&dt.year()),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Number(_) => "number",
            Self::Date(_) => "date",
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_param())
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

/// Parse an RFC 3339 timestamp, or a bare date as midnight UTC
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn number_params_round_trip() {
        for n in [0.0, 10.0, -3.5, 0.1, 1e21, 123456.789] {
            let value = FilterValue::Number(n);
            let parsed = FilterValue::parse(ColumnDataType::Number, &value.to_param()).unwrap();
            assert_eq!(parsed, value);
        }
        assert_eq!(FilterValue::Number(10.0).to_param(), "10");
    }

    #[test]
    fn number_rejects_non_finite() {
        assert!(FilterValue::parse(ColumnDataType::Number, "NaN").is_err());
        assert!(FilterValue::parse(ColumnDataType::Number, "inf").is_err());
        assert!(FilterValue::parse(ColumnDataType::Number, "ten").is_err());
    }

    #[test]
    fn date_params_round_trip() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 5).unwrap()
            + chrono::Duration::milliseconds(250);
        let value = FilterValue::Date(dt);
        assert_eq!(value.to_param(), "2024-03-09T14:30:05.250Z");
        let parsed = FilterValue::parse(ColumnDataType::Date, &value.to_param()).unwrap();
        assert_eq!(parsed, value);
    }

    #[test]
    fn bare_date_is_midnight_utc() {
        let parsed = FilterValue::parse(ColumnDataType::Date, "2024-01-31").unwrap();
        assert_eq!(
            parsed,
            FilterValue::Date(Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn offsets_normalize_to_utc() {
        let parsed = FilterValue::parse(ColumnDataType::Date, "2024-01-31T02:00:00+02:00").unwrap();
        assert_eq!(
            parsed,
            FilterValue::Date(Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn boolean_takes_no_values() {
        assert!(FilterValue::parse(ColumnDataType::Boolean, "true").is_err());
    }

    #[test]
    fn fits_checks_kind() {
        assert!(FilterValue::from("x").fits(ColumnDataType::Option));
        assert!(!FilterValue::from("x").fits(ColumnDataType::Number));
        assert!(!FilterValue::Number(f64::NAN).fits(ColumnDataType::Number));
        assert!(FilterValue::from(5_i64).fits(ColumnDataType::Number));
    }
}
