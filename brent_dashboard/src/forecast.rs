use std::str::FromStr;

use chrono::NaiveDate;
use price_forecast::models::additive::AdditivePoint;
use price_forecast::{ForecastError, ForecastRow, TrainedForecastModel};
use serde::Serialize;

use crate::state::Snapshot;

pub const ARIMA_UNAVAILABLE: &str = "ARIMA model is not available for this dataset";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelChoice {
    Additive,
    Arima,
}

impl FromStr for ModelChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "additive" => Ok(ModelChoice::Additive),
            "arima" => Ok(ModelChoice::Arima),
            other => Err(format!("unknown model '{other}', expected additive or arima")),
        }
    }
}

/// Forecast rows with the decomposition when the model provides one
#[derive(Debug, Clone, Serialize)]
pub struct ForecastTable {
    pub model: String,
    pub history_end: NaiveDate,
    pub periods: usize,
    pub include_history: bool,
    pub interval_width: f64,
    pub rows: Vec<ForecastRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<AdditivePoint>>,
}

/// Predict `periods` days past the end of the history
///
/// With `include_history` the fitted values over the history come first,
/// as in a future frame that starts at the first observation.
pub fn forecast(
    snapshot: &Snapshot,
    choice: ModelChoice,
    periods: usize,
    include_history: bool,
    interval_width: f64,
) -> Result<ForecastTable, ForecastError> {
    match choice {
        ModelChoice::Additive => {
            let model = &snapshot.additive;
            let dates = model.make_future_dates(periods, include_history)?;
            let points = model.predict_dates(&dates)?;
            let rows = points
                .iter()
                .map(|p| ForecastRow {
                    ds: p.ds,
                    yhat: p.yhat,
                    yhat_lower: p.yhat_lower,
                    yhat_upper: p.yhat_upper,
                })
                .collect();

            Ok(ForecastTable {
                model: model.name().to_string(),
                history_end: model.history_end(),
                periods,
                include_history,
                interval_width: model.interval_width(),
                rows,
                components: Some(points),
            })
        }
        ModelChoice::Arima => {
            let model = snapshot.arima.as_ref().ok_or_else(|| {
                ForecastError::ForecastingError(ARIMA_UNAVAILABLE.to_string())
            })?;
            let mut rows = if include_history {
                model.predict(&snapshot.data)?.rows()?
            } else {
                Vec::new()
            };
            rows.extend(model.forecast(periods)?.rows()?);

            Ok(ForecastTable {
                model: model.name().to_string(),
                history_end: snapshot.data.last_date(),
                periods,
                include_history,
                interval_width,
                rows,
                components: None,
            })
        }
    }
}

/// Forecast rows as CSV with a `ds,yhat,yhat_lower,yhat_upper` header
pub fn rows_to_csv(rows: &[ForecastRow]) -> Result<Vec<u8>, ForecastError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| ForecastError::DataError(e.to_string()))
}
