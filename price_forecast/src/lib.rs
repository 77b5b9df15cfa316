//! # Price Forecast
//!
//! Loading, analysing and forecasting daily price series such as the
//! Brent crude oil spot price.
//!
//! ## Features
//!
//! - CSV loading with delimiter sniffing, decimal-comma numbers and
//!   day-first dates, renamed to a `ds`/`y` DataFrame
//! - Descriptive report: summary statistics, rolling mean, percentage
//!   change, histogram, yearly averages and largest moves
//! - Forecasting models: additive trend + seasonality, ARIMA
//! - Holdout validation with accuracy metrics
//!
//! ## Quick Start
//!
//! ```no_run
//! use price_forecast::data::DataLoader;
//! use price_forecast::models::additive::AdditiveModel;
//! use price_forecast::models::{ForecastModel, TrainedForecastModel};
//!
//! # fn main() -> price_forecast::error::Result<()> {
//! // Load data
//! let data = DataLoader::from_csv("brent.csv")?;
//!
//! // Fit the model and store it for later
//! let trained = AdditiveModel::new().train(&data)?;
//! trained.save("additive_model.json")?;
//!
//! // Forecast the next 30 days
//! let forecast = trained.forecast(30)?;
//! for row in forecast.rows()? {
//!     println!("{} {:.2} [{:.2}, {:.2}]", row.ds, row.yhat, row.yhat_lower, row.yhat_upper);
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod data;
pub mod error;
pub mod metrics;
pub mod models;
pub mod utils;

// Re-export commonly used types
pub use crate::analysis::{DashboardReport, ReportOptions};
pub use crate::data::{CsvOptions, DataLoader, TimeSeriesData};
pub use crate::error::ForecastError;
pub use crate::models::{ForecastModel, ForecastResult, ForecastRow, TrainedForecastModel};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
