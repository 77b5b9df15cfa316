use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub dataset_url: String,
    pub model_url: Option<String>,
    pub model_cache_path: PathBuf,

    pub http_port: u16,
    pub log_level: String,
    pub page_title: String,

    pub default_periods: usize,
    pub max_periods: usize,
    pub rolling_window: usize,
    pub histogram_bins: usize,

    pub holdout_ratio: f64,
    pub arima_order: (usize, usize, usize),
    pub interval_width: f64,
    pub uncertainty_samples: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_or = |key: &str, default: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let config = Self {
            dataset_url: env_or("DATASET_URL", "data/brent.csv"),
            model_url: lookup("MODEL_URL")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            model_cache_path: PathBuf::from(env_or("MODEL_CACHE_PATH", "brent_model.json")),

            http_port: parse_value("HTTP_PORT", &env_or("HTTP_PORT", "8501"))?,
            log_level: env_or("LOG_LEVEL", "info"),
            page_title: env_or("PAGE_TITLE", "Brent crude oil price analysis"),

            default_periods: parse_value("DEFAULT_PERIODS", &env_or("DEFAULT_PERIODS", "30"))?,
            max_periods: parse_value("MAX_PERIODS", &env_or("MAX_PERIODS", "3650"))?,
            rolling_window: parse_value("ROLLING_WINDOW", &env_or("ROLLING_WINDOW", "30"))?,
            histogram_bins: parse_value("HISTOGRAM_BINS", &env_or("HISTOGRAM_BINS", "30"))?,

            holdout_ratio: parse_value("HOLDOUT_RATIO", &env_or("HOLDOUT_RATIO", "0.1"))?,
            arima_order: parse_arima_order(&env_or("ARIMA_ORDER", "5,1,0"))?,
            interval_width: parse_value("INTERVAL_WIDTH", &env_or("INTERVAL_WIDTH", "0.8"))?,
            uncertainty_samples: parse_value(
                "UNCERTAINTY_SAMPLES",
                &env_or("UNCERTAINTY_SAMPLES", "1000"),
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_periods == 0 {
            bail!("MAX_PERIODS must be at least 1");
        }
        if self.default_periods == 0 || self.default_periods > self.max_periods {
            bail!(
                "DEFAULT_PERIODS must be between 1 and MAX_PERIODS ({}), got {}",
                self.max_periods,
                self.default_periods
            );
        }
        if self.rolling_window == 0 {
            bail!("ROLLING_WINDOW must be at least 1");
        }
        if self.histogram_bins == 0 {
            bail!("HISTOGRAM_BINS must be at least 1");
        }
        if !(self.holdout_ratio > 0.0 && self.holdout_ratio < 1.0) {
            bail!("HOLDOUT_RATIO must be between 0 and 1, got {}", self.holdout_ratio);
        }
        if !(self.interval_width > 0.0 && self.interval_width < 1.0) {
            bail!("INTERVAL_WIDTH must be between 0 and 1, got {}", self.interval_width);
        }
        Ok(())
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .with_context(|| format!("invalid value for {key}: {raw}"))
}

/// Parse an ARIMA order written as `p,d,q`
pub fn parse_arima_order(raw: &str) -> Result<(usize, usize, usize)> {
    let parts = raw
        .split(',')
        .map(|part| part.trim().parse::<usize>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("invalid ARIMA_ORDER: {raw}"))?;

    match parts.as_slice() {
        [p, d, q] => Ok((*p, *d, *q)),
        _ => bail!("ARIMA_ORDER needs three comma separated integers, got {raw}"),
    }
}
