//! Date normalization.
//!
//! Stored rows, remote tables, and CLI input all carry dates in different
//! shapes. Everything is normalized to `CanonicalDate` here.
//!
//! String inputs are dispatched on their character length and separator
//! (see `DateFormat::sniff`). The dispatch is intentionally literal: a
//! 10-character string without `-` is always read as `MM/DD/YYYY`, an 8-character
//! string without `/` is always `YYYYMMDD`, and so on. Stored data depends on
//! these exact rules, so they are not "smartened up".

use chrono::{Datelike, NaiveDate};

use crate::domain::CanonicalDate;
use crate::error::AppError;

/// A date value in any of the accepted shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum DateInput {
    /// Digits of an 8-digit `YYYYMMDD` date, e.g. `20190614`.
    Integer(i64),
    /// Same as `Integer`; the fractional part is discarded.
    Float(f64),
    Text(String),
    /// Already canonical; returned unchanged.
    Date(CanonicalDate),
}

impl From<i64> for DateInput {
    fn from(value: i64) -> Self {
        DateInput::Integer(value)
    }
}

impl From<i32> for DateInput {
    fn from(value: i32) -> Self {
        DateInput::Integer(value.into())
    }
}

impl From<u32> for DateInput {
    fn from(value: u32) -> Self {
        DateInput::Integer(value.into())
    }
}

impl From<f64> for DateInput {
    fn from(value: f64) -> Self {
        DateInput::Float(value)
    }
}

impl From<&str> for DateInput {
    fn from(value: &str) -> Self {
        DateInput::Text(value.to_string())
    }
}

impl From<String> for DateInput {
    fn from(value: String) -> Self {
        DateInput::Text(value)
    }
}

impl From<NaiveDate> for DateInput {
    fn from(value: NaiveDate) -> Self {
        DateInput::Date(value)
    }
}

impl TryFrom<&serde_json::Value> for DateInput {
    type Error = AppError;

    /// Numbers and strings are accepted; anything else is a type error.
    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(DateInput::Integer(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(DateInput::Float(f))
                } else {
                    Err(AppError::date_format(format!("Could not parse date format: {n}")))
                }
            }
            Value::String(s) => Ok(DateInput::Text(s.clone())),
            other => Err(AppError::date_type(format!(
                "Could not determine date datatype: {}",
                json_type_name(other)
            ))),
        }
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// String layouts recognised by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `YYYYMMDD` (8 chars, no `/`).
    Compact,
    /// `MM/DD/YY` (8 chars with `/`).
    ShortSlash,
    /// `YYYY-MM-DD` (10 chars with `-`).
    Iso,
    /// `MM/DD/YYYY` (10 chars, no `-`).
    LongSlash,
    /// `Mon DD, YYYY` (any other length).
    MonthName,
}

impl DateFormat {
    /// Pick the layout for a string by its length and separators.
    pub fn sniff(s: &str) -> DateFormat {
        match s.chars().count() {
            8 if s.contains('/') => DateFormat::ShortSlash,
            8 => DateFormat::Compact,
            10 if s.contains('-') => DateFormat::Iso,
            10 => DateFormat::LongSlash,
            _ => DateFormat::MonthName,
        }
    }

    pub fn pattern(self) -> &'static str {
        match self {
            DateFormat::Compact => "%Y%m%d",
            DateFormat::ShortSlash => "%m/%d/%y",
            DateFormat::Iso => "%Y-%m-%d",
            DateFormat::LongSlash => "%m/%d/%Y",
            DateFormat::MonthName => "%b %d, %Y",
        }
    }

    pub fn parse(self, s: &str) -> Result<CanonicalDate, AppError> {
        match self {
            DateFormat::Compact => parse_compact(s),
            DateFormat::ShortSlash => parse_short_slash(s),
            DateFormat::Iso => parse_iso(s),
            DateFormat::LongSlash => parse_long_slash(s),
            DateFormat::MonthName => parse_month_name(s),
        }
    }
}

/// Normalize any accepted date shape to a `CanonicalDate`.
pub fn parse_date(input: impl Into<DateInput>) -> Result<CanonicalDate, AppError> {
    match input.into() {
        DateInput::Date(d) => Ok(d),
        DateInput::Integer(i) => parse_compact(&i.to_string()),
        DateInput::Float(f) => {
            if !f.is_finite() || f.abs() >= i64::MAX as f64 {
                return Err(AppError::date_format(format!("Could not parse date format: {f}")));
            }
            parse_compact(&(f.trunc() as i64).to_string())
        }
        DateInput::Text(s) => DateFormat::sniff(&s).parse(&s),
    }
}

/// Parse a date from a JSON value (numbers and strings only).
pub fn parse_json_date(value: &serde_json::Value) -> Result<CanonicalDate, AppError> {
    parse_date(DateInput::try_from(value)?)
}

/// The string form dates are stored in. Re-parses through the `Iso` branch.
pub fn format_stored(date: CanonicalDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_with(s: &str, fmt: DateFormat) -> Result<CanonicalDate, AppError> {
    NaiveDate::parse_from_str(s, fmt.pattern())
        .map_err(|e| AppError::date_format(format!("Could not parse date format '{s}' as {}: {e}", fmt.pattern())))
}

fn parse_compact(s: &str) -> Result<CanonicalDate, AppError> {
    parse_with(s, DateFormat::Compact)
}

fn parse_short_slash(s: &str) -> Result<CanonicalDate, AppError> {
    let parsed = parse_with(s, DateFormat::ShortSlash)?;
    // Two-digit years pivot at 69: 69..=99 are 19xx, 00..=68 are 20xx.
    let yy = parsed.year().rem_euclid(100);
    let year = if yy >= 69 { 1900 + yy } else { 2000 + yy };
    parsed
        .with_year(year)
        .ok_or_else(|| AppError::date_format(format!("Could not parse date format '{s}': invalid day for {year}")))
}

fn parse_iso(s: &str) -> Result<CanonicalDate, AppError> {
    parse_with(s, DateFormat::Iso)
}

fn parse_long_slash(s: &str) -> Result<CanonicalDate, AppError> {
    parse_with(s, DateFormat::LongSlash)
}

fn parse_month_name(s: &str) -> Result<CanonicalDate, AppError> {
    parse_with(s, DateFormat::MonthName)
}
