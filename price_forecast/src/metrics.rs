//! Metrics for evaluating forecast performance

use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, TrainedForecastModel};
use serde::Serialize;

/// Forecast accuracy metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastAccuracy {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error
    pub mape: f64,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
}

/// Calculate accuracy metrics for a forecast vs actual values
pub fn forecast_accuracy(forecast: &[f64], actual: &[f64]) -> Result<ForecastAccuracy> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(ForecastError::ValidationError(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    let n = forecast.len() as f64;

    let errors: Vec<f64> = forecast
        .iter()
        .zip(actual.iter())
        .map(|(&f, &a)| a - f)
        .collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let mse = errors.iter().map(|e| e.powi(2)).sum::<f64>() / n;
    let rmse = mse.sqrt();

    // Zero actuals are skipped but still count in the denominator
    let mape = actual
        .iter()
        .zip(errors.iter())
        .filter(|(&a, _)| a != 0.0)
        .map(|(&a, &e)| (e.abs() / a.abs()) * 100.0)
        .sum::<f64>()
        / n;

    let smape = actual
        .iter()
        .zip(forecast.iter())
        .map(|(&a, &f)| {
            let abs_a = a.abs();
            let abs_f = f.abs();
            if abs_a + abs_f == 0.0 {
                0.0
            } else {
                200.0 * (a - f).abs() / (abs_a + abs_f)
            }
        })
        .sum::<f64>()
        / n;

    Ok(ForecastAccuracy {
        mae,
        mse,
        rmse,
        mape,
        smape,
    })
}

impl std::fmt::Display for ForecastAccuracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics:")?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  MSE:   {:.4}", self.mse)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        writeln!(f, "  MAPE:  {:.4}%", self.mape)?;
        writeln!(f, "  SMAPE: {:.4}%", self.smape)?;
        Ok(())
    }
}

/// Accuracy plus the share of correctly predicted moves
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastMetrics {
    #[serde(flatten)]
    pub accuracy: ForecastAccuracy,
    /// Direction accuracy percentage
    pub direction_accuracy: f64,
}

/// Evaluate forecast accuracy against actual values
pub fn evaluate_forecast(forecast: &[f64], actual: &[f64]) -> Result<ForecastMetrics> {
    let accuracy = forecast_accuracy(forecast, actual)?;

    let moves: Vec<bool> = forecast
        .windows(2)
        .zip(actual.windows(2))
        .filter(|(f, a)| (f[1] - f[0]).abs() > 1e-10 && (a[1] - a[0]).abs() > 1e-10)
        .map(|(f, a)| (f[1] > f[0]) == (a[1] > a[0]))
        .collect();

    let direction_accuracy = if moves.is_empty() {
        0.0
    } else {
        moves.iter().filter(|&&correct| correct).count() as f64 / moves.len() as f64 * 100.0
    };

    Ok(ForecastMetrics {
        accuracy,
        direction_accuracy,
    })
}

/// Outcome of training on the head of a series and forecasting its tail
#[derive(Debug, Clone, Serialize)]
pub struct HoldoutReport {
    /// Model that was evaluated
    pub model: String,
    /// Observations used for training
    pub train_size: usize,
    /// Observations held out
    pub test_size: usize,
    /// Metrics of the tail forecast against the held-out prices
    pub metrics: ForecastMetrics,
}

/// Train on all but the last `test_ratio` of the data and score the forecast
///
/// The forecast covers the calendar days up to the last held-out date and is
/// matched to the held-out observations by date.
pub fn holdout_validation<M: ForecastModel>(
    model: &M,
    data: &TimeSeriesData,
    test_ratio: f64,
) -> Result<HoldoutReport> {
    if test_ratio <= 0.0 || test_ratio >= 1.0 {
        return Err(ForecastError::InvalidParameter(
            "Test ratio must be between 0 and 1".to_string(),
        ));
    }

    let (train, test) = crate::utils::train_test_split(data.values(), test_ratio);
    if test.is_empty() || train.len() < 2 {
        return Err(ForecastError::ValidationError(format!(
            "Cannot hold out {:.0}% of {} observations",
            test_ratio * 100.0,
            data.len()
        )));
    }

    let train_data = data.slice(0, Some(train.len()))?;
    let test_data = data.slice(train.len(), None)?;
    let trained = model.train(&train_data)?;

    let horizon = (test_data.last_date() - train_data.last_date()).num_days() as usize;
    let forecast = trained.forecast(horizon)?;
    let forecast_dates = forecast.timestamps().unwrap_or_default();

    let mut predicted = Vec::with_capacity(test.len());
    let mut actual = Vec::with_capacity(test.len());
    for (date, price) in test_data.dates().iter().zip(test_data.values()) {
        if let Ok(idx) = forecast_dates.binary_search(date) {
            predicted.push(forecast.values()[idx]);
            actual.push(*price);
        }
    }

    Ok(HoldoutReport {
        model: trained.name().to_string(),
        train_size: train.len(),
        test_size: actual.len(),
        metrics: evaluate_forecast(&predicted, &actual)?,
    })
}
