//! # Price Math
//!
//! Numeric building blocks for daily price series.
//! This crate provides the descriptive statistics, rolling transforms and
//! the penalised least squares solver used by the forecasting models.

use thiserror::Error;

pub mod linalg;
pub mod series;
pub mod stats;

pub use linalg::least_squares;
pub use series::{histogram, max_drawdown, pct_change, rolling_mean, HistogramBin};
pub use stats::{quantile, summary, SummaryStats};

/// Errors that can occur in price series calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for price math operations
pub type Result<T> = std::result::Result<T, MathError>;

pub(crate) fn ensure_no_nan(values: &[f64]) -> Result<()> {
    if values.iter().any(|v| v.is_nan()) {
        return Err(MathError::InvalidInput(
            "Series contains NaN values".to_string(),
        ));
    }
    Ok(())
}
