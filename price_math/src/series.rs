//! Rolling transforms over price series
//!
//! Contains the per-observation transforms drawn on the dashboard:
//! - Rolling mean (simple moving average over a trailing window)
//! - Percentage change between consecutive observations
//! - Equal-width histogram
//! - Maximum drawdown

use crate::{ensure_no_nan, MathError, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Trailing simple moving average with a running sum
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl SimpleMovingAverage {
    /// Create a new moving average over the given period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
            sum: 0.0,
        })
    }

    /// Push a value, returning the average once the window is full
    pub fn update(&mut self, value: f64) -> Option<f64> {
        self.values.push_back(value);
        self.sum += value;

        if self.values.len() > self.period {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }

        self.value()
    }

    /// Current average, `None` until `period` values were seen
    pub fn value(&self) -> Option<f64> {
        if self.values.len() < self.period {
            return None;
        }
        Some(self.sum / self.period as f64)
    }
}

/// Rolling mean aligned with the input; the first `window - 1` entries are empty
pub fn rolling_mean(values: &[f64], window: usize) -> Result<Vec<Option<f64>>> {
    let mut sma = SimpleMovingAverage::new(window)?;
    Ok(values.iter().map(|&v| sma.update(v)).collect())
}

/// Fractional change from the previous observation
pub fn pct_change(values: &[f64]) -> Vec<Option<f64>> {
    let mut changes = Vec::with_capacity(values.len());
    if values.is_empty() {
        return changes;
    }

    changes.push(None);
    for pair in values.windows(2) {
        if pair[0] == 0.0 {
            changes.push(None);
        } else {
            changes.push(Some((pair[1] - pair[0]) / pair[0]));
        }
    }
    changes
}

/// One bar of a histogram
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Inclusive lower edge
    pub lower: f64,
    /// Upper edge (inclusive only for the last bin)
    pub upper: f64,
    /// Number of values in the bin
    pub count: usize,
}

/// Equal-width histogram between the minimum and maximum value
pub fn histogram(values: &[f64], bins: usize) -> Result<Vec<HistogramBin>> {
    if bins == 0 {
        return Err(MathError::InvalidInput(
            "Histogram needs at least one bin".to_string(),
        ));
    }
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot build a histogram of an empty series".to_string(),
        ));
    }
    ensure_no_nan(values)?;

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if max == min {
        return Ok(vec![HistogramBin {
            lower: min,
            upper: max,
            count: values.len(),
        }]);
    }

    let width = (max - min) / bins as f64;
    let mut result: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();

    for &value in values {
        let index = (((value - min) / width) as usize).min(bins - 1);
        result[index].count += 1;
    }

    Ok(result)
}

/// Largest peak-to-trough decline as a fraction of the peak
pub fn max_drawdown(prices: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_drawdown: f64 = 0.0;

    for &price in prices {
        if price > peak {
            peak = price;
        }
        if peak > 0.0 {
            max_drawdown = max_drawdown.max((peak - price) / peak);
        }
    }

    max_drawdown
}
