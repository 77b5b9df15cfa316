//! Descriptive statistics
//!
//! Summary statistics in the shape of a dataframe `describe()`:
//! count, mean, sample standard deviation, min, quartiles and max.

use crate::{ensure_no_nan, MathError, Result};
use serde::{Deserialize, Serialize};

/// Descriptive statistics of a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Number of observations
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub std: f64,
    /// Minimum value
    pub min: f64,
    /// First quartile
    pub q25: f64,
    /// Median
    pub median: f64,
    /// Third quartile
    pub q75: f64,
    /// Maximum value
    pub max: f64,
}

/// Arithmetic mean of a series
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot compute the mean of an empty series".to_string(),
        ));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation; a single observation has zero spread
pub fn sample_std(values: &[f64]) -> Result<f64> {
    let mean = mean(values)?;
    if values.len() < 2 {
        return Ok(0.0);
    }

    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        / (values.len() - 1) as f64;
    Ok(variance.sqrt())
}

/// Quantile with linear interpolation between closest ranks
pub fn quantile(values: &[f64], q: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot compute a quantile of an empty series".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&q) {
        return Err(MathError::InvalidInput(format!(
            "Quantile must be between 0 and 1, got {}",
            q
        )));
    }
    ensure_no_nan(values)?;

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Ok(quantile_sorted(&sorted, q))
}

/// Quantile of an already sorted, non-empty slice
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Compute the descriptive statistics of a series
pub fn summary(values: &[f64]) -> Result<SummaryStats> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot summarise an empty series".to_string(),
        ));
    }
    ensure_no_nan(values)?;

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    Ok(SummaryStats {
        count: values.len(),
        mean: mean(values)?,
        std: sample_std(values)?,
        min: sorted[0],
        q25: quantile_sorted(&sorted, 0.25),
        median: quantile_sorted(&sorted, 0.5),
        q75: quantile_sorted(&sorted, 0.75),
        max: sorted[sorted.len() - 1],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_summary_matches_describe() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        let stats = summary(&values).unwrap();

        assert_eq!(stats.count, 5);
        assert_relative_eq!(stats.mean, 30.0);
        // sqrt(1000 / 4)
        assert_relative_eq!(stats.std, 15.811388300841896, epsilon = 1e-12);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.q25, 20.0);
        assert_eq!(stats.median, 30.0);
        assert_eq!(stats.q75, 40.0);
        assert_eq!(stats.max, 50.0);
    }

    #[test]
    fn test_summary_unsorted_input() {
        let stats = summary(&[3.0, 1.0, 2.0, 4.0]).unwrap();
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert_relative_eq!(stats.median, 2.5);
        assert_relative_eq!(stats.q25, 1.75);
    }

    #[test]
    fn test_single_value_has_zero_std() {
        let stats = summary(&[42.0]).unwrap();
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.median, 42.0);
    }

    #[test]
    fn test_quantile_validation() {
        assert!(quantile(&[], 0.5).is_err());
        assert!(quantile(&[1.0], 1.5).is_err());
        assert!(summary(&[1.0, f64::NAN]).is_err());
        assert_relative_eq!(quantile(&[1.0, 2.0], 0.1).unwrap(), 1.1);
    }
}
