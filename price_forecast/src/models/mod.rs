//! Forecasting models for time series data

use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::io::Write;

/// One row of a forecast table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    /// Forecast date
    pub ds: NaiveDate,
    /// Point forecast
    pub yhat: f64,
    /// Lower bound of the uncertainty interval
    pub yhat_lower: f64,
    /// Upper bound of the uncertainty interval
    pub yhat_upper: f64,
}

/// Forecast result containing predicted values
#[derive(Debug, Clone, Serialize)]
pub struct ForecastResult {
    /// Forecasted values
    pub(crate) values: Vec<f64>,
    /// Number of periods forecasted
    horizons: usize,
    /// Uncertainty intervals (optional)
    pub(crate) intervals: Option<Vec<(f64, f64)>>,
    /// Dates of each value (optional)
    pub(crate) timestamps: Option<Vec<NaiveDate>>,
}

impl ForecastResult {
    /// Create a new forecast result
    pub fn new(values: Vec<f64>, horizons: usize) -> Result<Self> {
        if values.len() != horizons {
            return Err(ForecastError::ValidationError(format!(
                "Values length ({}) doesn't match horizons ({})",
                values.len(),
                horizons
            )));
        }

        Ok(Self {
            values,
            horizons,
            intervals: None,
            timestamps: None,
        })
    }

    /// Create a new forecast result with uncertainty intervals
    pub fn new_with_intervals(
        values: Vec<f64>,
        horizons: usize,
        intervals: Vec<(f64, f64)>,
    ) -> Result<Self> {
        if values.len() != intervals.len() {
            return Err(ForecastError::ValidationError(format!(
                "Values length ({}) doesn't match intervals length ({})",
                values.len(),
                intervals.len()
            )));
        }

        let mut result = Self::new(values, horizons)?;
        result.intervals = Some(intervals);
        Ok(result)
    }

    /// Attach the date of each forecasted value
    pub fn with_timestamps(mut self, timestamps: Vec<NaiveDate>) -> Result<Self> {
        if timestamps.len() != self.values.len() {
            return Err(ForecastError::ValidationError(format!(
                "Values length ({}) doesn't match timestamps length ({})",
                self.values.len(),
                timestamps.len()
            )));
        }

        self.timestamps = Some(timestamps);
        Ok(self)
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the number of periods forecasted
    pub fn horizons(&self) -> usize {
        self.horizons
    }

    /// Get the uncertainty intervals, if available
    pub fn intervals(&self) -> Option<&[(f64, f64)]> {
        self.intervals.as_deref()
    }

    /// Get the dates, if available
    pub fn timestamps(&self) -> Option<&[NaiveDate]> {
        self.timestamps.as_deref()
    }

    /// Dated rows with bounds; missing intervals collapse to the point forecast
    pub fn rows(&self) -> Result<Vec<ForecastRow>> {
        let dates = self.timestamps().ok_or_else(|| {
            ForecastError::ForecastingError("Forecast has no dates attached".to_string())
        })?;

        Ok(self
            .values
            .iter()
            .enumerate()
            .map(|(i, &yhat)| {
                let (yhat_lower, yhat_upper) = self
                    .intervals
                    .as_ref()
                    .map_or((yhat, yhat), |intervals| intervals[i]);
                ForecastRow {
                    ds: dates[i],
                    yhat,
                    yhat_lower,
                    yhat_upper,
                }
            })
            .collect())
    }

    /// Serialize the dated rows as JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.rows()?)?)
    }

    /// Write the dated rows as CSV with a `ds,yhat,yhat_lower,yhat_upper` header
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in self.rows()? {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Calculate mean absolute error between forecast and actual values
    pub fn mean_absolute_error(&self, actual: &[f64]) -> Result<f64> {
        let accuracy = crate::metrics::forecast_accuracy(&self.values, actual)?;
        Ok(accuracy.mae)
    }

    /// Calculate mean squared error between forecast and actual values
    pub fn mean_squared_error(&self, actual: &[f64]) -> Result<f64> {
        let accuracy = crate::metrics::forecast_accuracy(&self.values, actual)?;
        Ok(accuracy.mse)
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug + Send + Sync {
    /// Generate forecast for the days following the training data
    fn forecast(&self, horizons: usize) -> Result<ForecastResult>;

    /// Predict values for the dates of the given data
    fn predict(&self, data: &TimeSeriesData) -> Result<ForecastResult>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on time series data
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on time series data
    fn train(&self, data: &TimeSeriesData) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

pub mod additive;
pub mod arima;
