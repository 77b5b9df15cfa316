//! Descriptive analysis behind the dashboard and insights sections

use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate};
use price_math::{HistogramBin, SummaryStats};
use serde::Serialize;
use std::collections::BTreeMap;

/// Knobs of the dashboard report
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    /// Window of the rolling mean, in observations
    pub rolling_window: usize,
    /// Number of histogram bins
    pub histogram_bins: usize,
    /// Number of largest rises and falls listed
    pub top_moves: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            rolling_window: 30,
            histogram_bins: 30,
            top_moves: 5,
        }
    }
}

/// One observation with its derived values
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub ds: NaiveDate,
    pub y: f64,
    pub rolling_mean: Option<f64>,
    pub pct_change: Option<f64>,
}

/// Aggregate of one calendar year
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearlyStats {
    pub year: i32,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// A single day's move
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceMove {
    pub ds: NaiveDate,
    pub y: f64,
    pub pct_change: f64,
}

/// Everything the dashboard renders for a date range
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub last_price: f64,
    pub change: f64,
    pub change_pct: Option<f64>,
    pub summary: SummaryStats,
    pub max_drawdown: f64,
    pub rolling_window: usize,
    pub series: Vec<SeriesPoint>,
    pub histogram: Vec<HistogramBin>,
    pub yearly: Vec<YearlyStats>,
    pub largest_rises: Vec<PriceMove>,
    pub largest_falls: Vec<PriceMove>,
}

impl DashboardReport {
    /// Compute the report over the whole of `data`
    pub fn build(data: &TimeSeriesData, options: &ReportOptions) -> Result<Self> {
        if options.rolling_window == 0 {
            return Err(ForecastError::InvalidParameter(
                "Rolling window must be positive".to_string(),
            ));
        }

        let dates = data.dates();
        let values = data.values();

        let rolling = price_math::rolling_mean(values, options.rolling_window)?;
        let changes = price_math::pct_change(values);
        let series: Vec<SeriesPoint> = dates
            .iter()
            .zip(values)
            .zip(rolling.iter().zip(&changes))
            .map(|((&ds, &y), (&rolling_mean, &pct_change))| SeriesPoint {
                ds,
                y,
                rolling_mean,
                pct_change,
            })
            .collect();

        let first_price = values[0];
        let last_price = values[values.len() - 1];
        let change = last_price - first_price;
        let change_pct = (first_price != 0.0).then(|| change / first_price * 100.0);

        let (largest_rises, largest_falls) = Self::largest_moves(&series, options.top_moves);

        Ok(Self {
            first_date: data.first_date(),
            last_date: data.last_date(),
            last_price,
            change,
            change_pct,
            summary: price_math::summary(values)?,
            max_drawdown: price_math::max_drawdown(values),
            rolling_window: options.rolling_window,
            histogram: price_math::histogram(values, options.histogram_bins)?,
            yearly: Self::yearly_stats(dates, values),
            series,
            largest_rises,
            largest_falls,
        })
    }

    fn yearly_stats(dates: &[NaiveDate], values: &[f64]) -> Vec<YearlyStats> {
        let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
        for (date, value) in dates.iter().zip(values) {
            by_year.entry(date.year()).or_default().push(*value);
        }

        by_year
            .into_iter()
            .map(|(year, prices)| YearlyStats {
                year,
                mean: prices.iter().sum::<f64>() / prices.len() as f64,
                min: prices.iter().copied().fold(f64::INFINITY, f64::min),
                max: prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                count: prices.len(),
            })
            .collect()
    }

    fn largest_moves(series: &[SeriesPoint], top: usize) -> (Vec<PriceMove>, Vec<PriceMove>) {
        let mut moves: Vec<PriceMove> = series
            .iter()
            .filter_map(|p| {
                p.pct_change.map(|pct_change| PriceMove {
                    ds: p.ds,
                    y: p.y,
                    pct_change,
                })
            })
            .collect();
        moves.sort_by(|a, b| b.pct_change.total_cmp(&a.pct_change));

        let rises = moves
            .iter()
            .filter(|m| m.pct_change > 0.0)
            .take(top)
            .copied()
            .collect();
        let falls = moves
            .iter()
            .rev()
            .filter(|m| m.pct_change < 0.0)
            .take(top)
            .copied()
            .collect();
        (rises, falls)
    }
}
