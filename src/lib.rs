//! # Brent Owl
//!
//! Workspace facade over the price analysis libraries.
//!
//! ## Example
//!
//! ```
//! use brent_owl::math::summary;
//!
//! let stats = summary(&[70.0, 72.5, 71.0]).unwrap();
//! assert_eq!(stats.count, 3);
//! assert_eq!(stats.max, 72.5);
//! ```

/// Descriptive statistics, rolling transforms and least squares
pub use price_math as math;

/// Dataset loading, forecasting models and dashboard analysis
pub use price_forecast as forecast;

pub use price_forecast::{
    DashboardReport, DataLoader, ForecastError, ForecastModel, ForecastResult, ReportOptions,
    TimeSeriesData, TrainedForecastModel,
};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_facade_reexports() {
        let dates = vec![
            NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 3).unwrap(),
        ];
        let data = TimeSeriesData::new(dates, vec![80.0, 82.0]).unwrap();
        let report = DashboardReport::build(&data, &ReportOptions::default()).unwrap();

        assert_eq!(report.last_price, 82.0);
        assert_eq!(math::max_drawdown(data.values()), 0.0);
    }
}
