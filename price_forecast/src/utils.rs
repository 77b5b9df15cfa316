//! Utility functions for the price_forecast crate

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Days, NaiveDate};

/// Day number of 1970-01-01 counted from 0001-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Date formats tried, in order, when no explicit format is given
pub const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%d.%m.%Y"];

/// Days elapsed since 1970-01-01
pub fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Inverse of [`days_since_epoch`]
pub fn date_from_days(days: i32) -> Result<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
        .ok_or_else(|| ForecastError::ParseError(format!("Day number {} is out of range", days)))
}

/// Parse a date, optionally with an explicit chrono format
///
/// Without a format, every entry of [`DATE_FORMATS`] is tried, first on the
/// whole text and then on its first ten characters so that datetimes such
/// as `2023-01-15T14:30:45` resolve to their date.
pub fn parse_date(text: &str, format: Option<&str>) -> Result<NaiveDate> {
    let text = text.trim().trim_matches('"');

    if let Some(format) = format {
        return NaiveDate::parse_from_str(text, format).map_err(|e| {
            ForecastError::ParseError(format!("'{}' does not match '{}': {}", text, format, e))
        });
    }

    let prefix = text.get(..10).unwrap_or(text);
    for candidate in [text, prefix] {
        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(candidate, format) {
                return Ok(date);
            }
        }
    }

    Err(ForecastError::ParseError(format!(
        "Unrecognised date '{}'",
        text
    )))
}

/// Parse a price written with either `.` or `,` as decimal separator
///
/// When both separators appear, the last one is the decimal mark and the
/// other is a thousands separator (`1.234,56`, `1,234.56`). A lone comma is
/// a decimal comma (`18,63`). Empty cells and placeholders yield `None`.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .trim_matches('"')
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if cleaned.is_empty() || cleaned == "-" || cleaned.eq_ignore_ascii_case("na") {
        return None;
    }

    let last_comma = cleaned.rfind(',');
    let last_dot = cleaned.rfind('.');
    let normalised = match (last_comma, last_dot) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) if cleaned.matches(',').count() == 1 => cleaned.replace(',', "."),
        (Some(_), None) => cleaned.replace(',', ""),
        (None, Some(_)) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    };

    normalised.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Consecutive calendar days following `last`
pub fn future_dates(last: NaiveDate, horizon: usize) -> Result<Vec<NaiveDate>> {
    if horizon == 0 {
        return Err(ForecastError::ValidationError(
            "Forecast horizon must be at least one day".to_string(),
        ));
    }

    (1..=horizon as u64)
        .map(|offset| {
            last.checked_add_days(Days::new(offset)).ok_or_else(|| {
                ForecastError::ValidationError(format!(
                    "Date overflow {} days after {}",
                    offset, last
                ))
            })
        })
        .collect()
}

/// Split a series into training and test parts, the test part being the tail
pub fn train_test_split(data: &[f64], test_ratio: f64) -> (Vec<f64>, Vec<f64>) {
    if data.is_empty() || test_ratio <= 0.0 || test_ratio >= 1.0 {
        return (data.to_vec(), Vec::new());
    }

    let test_size = (data.len() as f64 * test_ratio).round() as usize;
    let train_size = data.len() - test_size;

    let train = data[..train_size].to_vec();
    let test = data[train_size..].to_vec();

    (train, test)
}
