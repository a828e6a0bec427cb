//! Field coercion for raw CSV text.
//!
//! Every parser treats blank input as missing (`Ok(None)`) and returns a
//! [`ParseError`] for present-but-malformed input. Callers decide whether
//! that error is recovered (dates, optional numbers) or escalated
//! (required identifiers and amounts).

use crate::{error::ParseError, model::TxnType};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];
/// Offset-bearing spellings beyond RFC 3339. The date is taken as written,
/// without converting to UTC.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

fn present(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") || trimmed == "NaT" {
        None
    } else {
        Some(trimmed)
    }
}

pub fn parse_date(raw: &str) -> Result<Option<NaiveDate>, ParseError> {
    let Some(value) = present(raw) else {
        return Ok(None);
    };
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(Some(d));
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(Some(dt.date()));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(dt.date_naive()));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Ok(Some(dt.date_naive()));
        }
    }
    Err(ParseError::Date { value: value.to_string() })
}

/// Integer identifiers. Accepts an integral float spelling (`12.0`),
/// which dataframe exports produce for columns containing blanks.
pub fn parse_id(raw: &str) -> Result<Option<i64>, ParseError> {
    let Some(value) = present(raw) else {
        return Ok(None);
    };
    if let Ok(n) = value.parse::<i64>() {
        return Ok(Some(n));
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            Ok(Some(f as i64))
        }
        _ => Err(ParseError::Integer { value: value.to_string() }),
    }
}

pub fn parse_number(raw: &str) -> Result<Option<f64>, ParseError> {
    let Some(value) = present(raw) else {
        return Ok(None);
    };
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() => Ok(Some(f)),
        _ => Err(ParseError::Number { value: value.to_string() }),
    }
}

pub fn parse_txn_type(raw: &str) -> Result<Option<TxnType>, ParseError> {
    let Some(value) = present(raw) else {
        return Ok(None);
    };
    match value.to_ascii_uppercase().as_str() {
        "SALE" => Ok(Some(TxnType::Sale)),
        "PURCHASE" => Ok(Some(TxnType::Purchase)),
        _ => Err(ParseError::TxnType { value: value.to_string() }),
    }
}

pub fn parse_text(raw: &str) -> Option<String> {
    present(raw).map(str::to_string)
}

/// Boolean text as written by the analysis table (`True`/`False`),
/// plus the lowercase and numeric spellings.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match present(raw)? {
        "True" | "true" | "1" => Some(true),
        "False" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Counts recovered coercions for one run.
#[derive(Debug, Default)]
pub struct Coercions {
    pub count: usize,
}

impl Coercions {
    /// Substitute the missing marker for a recoverable parse failure.
    pub fn recover<T>(&mut self, field: &'static str, result: Result<Option<T>, ParseError>) -> Option<T> {
        match result {
            Ok(v) => v,
            Err(e) => {
                self.count += 1;
                log::debug!("coerced {field} to missing: {e}");
                None
            }
        }
    }
}
