//! Time series data handling for forecasting

use crate::error::{ForecastError, Result};
use crate::utils::{days_since_epoch, parse_date, parse_number};
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::Path;

/// Name of the date column after renaming
pub const DATE_COLUMN: &str = "ds";
/// Name of the price column after renaming
pub const VALUE_COLUMN: &str = "y";

const DATE_HINTS: [&str; 5] = ["date", "data", "ds", "dia", "time"];
const VALUE_HINTS: [&str; 6] = ["price", "preço", "preco", "close", "valor", "brent"];

/// Daily price series indexed by date
///
/// Dates are strictly increasing and every date carries a price. The
/// DataFrame view holds the renamed `ds`/`y` columns.
#[derive(Debug, Clone)]
pub struct TimeSeriesData {
    /// Data frame containing the time series data
    df: DataFrame,
    /// Observation dates, ascending and unique
    dates: Vec<NaiveDate>,
    /// Prices aligned with `dates`
    values: Vec<f64>,
}

/// Overrides for CSV column detection and parsing
#[derive(Debug, Clone, Default)]
pub struct CsvOptions {
    /// Header of the date column
    pub date_column: Option<String>,
    /// Header of the price column
    pub value_column: Option<String>,
    /// chrono format of the date column
    pub date_format: Option<String>,
    /// Field delimiter; sniffed from the header when absent
    pub delimiter: Option<u8>,
}

/// Data loader for time series data
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load time series data from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<TimeSeriesData> {
        let bytes = std::fs::read(path)?;
        Self::from_csv_bytes(&bytes)
    }

    /// Load time series data from CSV content already in memory
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<TimeSeriesData> {
        Self::from_csv_bytes_with(bytes, &CsvOptions::default())
    }

    /// Load time series data from CSV content with explicit options
    pub fn from_csv_bytes_with(bytes: &[u8], options: &CsvOptions) -> Result<TimeSeriesData> {
        let text = String::from_utf8_lossy(bytes);
        let text = text.trim_start_matches('\u{feff}');

        let header_line = text.lines().next().unwrap_or_default();
        let delimiter = options
            .delimiter
            .unwrap_or_else(|| sniff_delimiter(header_line));

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let records: Vec<csv::StringRecord> = reader.records().collect::<std::result::Result<_, _>>()?;

        let date_idx = Self::detect_date_column(&headers, options.date_column.as_deref())?;
        let value_idx =
            Self::detect_value_column(&headers, &records, date_idx, options.value_column.as_deref())?;

        tracing::debug!(
            date_column = %headers[date_idx],
            value_column = %headers[value_idx],
            rows = records.len(),
            "parsing price csv"
        );

        let mut dates = Vec::with_capacity(records.len());
        let mut values = Vec::with_capacity(records.len());
        for record in &records {
            let value = match record.get(value_idx).and_then(parse_number) {
                Some(value) => value,
                None => continue,
            };
            let raw_date = record.get(date_idx).unwrap_or_default();
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let date = parse_date(raw_date, options.date_format.as_deref()).map_err(|e| {
                ForecastError::DataError(format!("Line {}: {}", line, e))
            })?;
            dates.push(date);
            values.push(value);
        }

        TimeSeriesData::new(dates, values)
    }

    /// Create time series data from an existing DataFrame with `ds`/`y` columns
    pub fn from_dataframe(df: &DataFrame) -> Result<TimeSeriesData> {
        let days = df.column(DATE_COLUMN)?.cast(&DataType::Int32)?;
        let prices = df.column(VALUE_COLUMN)?.cast(&DataType::Float64)?;

        let mut dates = Vec::with_capacity(df.height());
        let mut values = Vec::with_capacity(df.height());
        for (day, price) in days.i32()?.into_iter().zip(prices.f64()?.into_iter()) {
            if let (Some(day), Some(price)) = (day, price) {
                dates.push(crate::utils::date_from_days(day)?);
                values.push(price);
            }
        }

        TimeSeriesData::new(dates, values)
    }

    /// Detect the date column among the CSV headers
    fn detect_date_column(headers: &[String], explicit: Option<&str>) -> Result<usize> {
        if let Some(name) = explicit {
            return find_header(headers, name);
        }

        headers
            .iter()
            .position(|h| {
                let lower = h.to_lowercase();
                DATE_HINTS.iter().any(|hint| lower.contains(hint))
            })
            .ok_or_else(|| ForecastError::DataError("No date column found in data".to_string()))
    }

    /// Detect the price column among the CSV headers
    fn detect_value_column(
        headers: &[String],
        records: &[csv::StringRecord],
        date_idx: usize,
        explicit: Option<&str>,
    ) -> Result<usize> {
        if let Some(name) = explicit {
            return find_header(headers, name);
        }

        let by_name = headers.iter().enumerate().position(|(i, h)| {
            let lower = h.to_lowercase();
            i != date_idx && (lower == VALUE_COLUMN || VALUE_HINTS.iter().any(|hint| lower.contains(hint)))
        });
        if let Some(idx) = by_name {
            return Ok(idx);
        }

        // Fall back to the first column whose first non-empty cell is numeric
        (0..headers.len())
            .filter(|&i| i != date_idx)
            .find(|&i| {
                records
                    .iter()
                    .filter_map(|r| r.get(i))
                    .find(|cell| !cell.trim().is_empty())
                    .and_then(parse_number)
                    .is_some()
            })
            .ok_or_else(|| ForecastError::DataError("No price columns found in data".to_string()))
    }
}

fn find_header(headers: &[String], name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| ForecastError::DataError(format!("Column '{}' not found", name)))
}

/// Pick the most frequent of `,`, `;` and TAB in the header line
fn sniff_delimiter(header_line: &str) -> u8 {
    [b';', b'\t', b',']
        .into_iter()
        .max_by_key(|&d| header_line.bytes().filter(|&b| b == d).count())
        .filter(|&d| header_line.as_bytes().contains(&d))
        .unwrap_or(b',')
}

impl TimeSeriesData {
    /// Create a new TimeSeriesData from dates and values
    ///
    /// Observations are sorted by date; for a repeated date the last
    /// occurrence wins.
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::ValidationError(format!(
                "Dates length ({}) doesn't match values length ({})",
                dates.len(),
                values.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::DataError(
                "Prices must be finite numbers".to_string(),
            ));
        }

        let mut pairs: Vec<(NaiveDate, f64)> = dates.into_iter().zip(values).collect();
        pairs.sort_by_key(|(date, _)| *date);

        let mut dates: Vec<NaiveDate> = Vec::with_capacity(pairs.len());
        let mut values: Vec<f64> = Vec::with_capacity(pairs.len());
        for (date, value) in pairs {
            if dates.last() == Some(&date) {
                if let Some(last) = values.last_mut() {
                    *last = value;
                }
            } else {
                dates.push(date);
                values.push(value);
            }
        }

        if dates.is_empty() {
            return Err(ForecastError::DataError(
                "No usable observations in data".to_string(),
            ));
        }

        let df = Self::build_frame(&dates, &values)?;
        Ok(Self { df, dates, values })
    }

    fn build_frame(dates: &[NaiveDate], values: &[f64]) -> Result<DataFrame> {
        let days: Vec<i32> = dates.iter().map(|d| days_since_epoch(*d)).collect();
        let date_series = Series::new(DATE_COLUMN, days).cast(&DataType::Date)?;
        let value_series = Series::new(VALUE_COLUMN, values.to_vec());

        Ok(DataFrame::new(vec![date_series, value_series])?)
    }

    /// Get the DataFrame
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Observation dates
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Prices aligned with [`dates`](Self::dates)
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// First observation date
    pub fn first_date(&self) -> NaiveDate {
        self.dates[0]
    }

    /// Last observation date
    pub fn last_date(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    /// Check if the time series is empty
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Get the length of the time series
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Get a positional slice of the data from start to end index
    pub fn slice(&self, start: usize, end: Option<usize>) -> Result<Self> {
        let end = end.unwrap_or(self.len()).min(self.len());
        if start >= end {
            return Err(ForecastError::ValidationError(format!(
                "Empty slice {}..{} of a series with {} observations",
                start,
                end,
                self.len()
            )));
        }

        Ok(Self {
            df: self.df.slice(start as i64, end - start),
            dates: self.dates[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
        })
    }

    /// Restrict to observations between `start` and `end`, both inclusive
    ///
    /// Returns `Ok(None)` when no observation falls inside the range.
    pub fn filter_range(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Option<Self>> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(ForecastError::ValidationError(format!(
                    "Range start {} is after range end {}",
                    start, end
                )));
            }
        }

        let from = start.map_or(0, |s| self.dates.partition_point(|d| *d < s));
        let to = end.map_or(self.len(), |e| self.dates.partition_point(|d| *d <= e));
        if from >= to {
            return Ok(None);
        }

        self.slice(from, Some(to)).map(Some)
    }

    /// DataFrame extended with `rolling_mean` and `pct_change` columns
    pub fn with_derived_columns(&self, window: usize) -> Result<DataFrame> {
        let rolling = price_math::rolling_mean(&self.values, window)?;
        let changes = price_math::pct_change(&self.values);

        let mut df = self.df.clone();
        df.with_column(Series::new("rolling_mean", rolling))?;
        df.with_column(Series::new("pct_change", changes))?;
        Ok(df)
    }

    /// Calculate the mean of the prices
    pub fn mean(&self) -> Result<f64> {
        Ok(price_math::stats::mean(&self.values)?)
    }

    /// Calculate the sample standard deviation of the prices
    pub fn std_dev(&self) -> Result<f64> {
        Ok(price_math::stats::sample_std(&self.values)?)
    }
}
