//! Fit the additive model on the configured dataset and write the artifact
//!
//! Usage: `fit_model [OUTPUT]`. The output defaults to `MODEL_CACHE_PATH`.
//! The artifact can be hosted anywhere and pointed to with `MODEL_URL`.

use anyhow::{Context, Result};
use brent_dashboard::config::Config;
use brent_dashboard::fetch::Fetcher;
use brent_dashboard::loader;
use price_forecast::ForecastModel;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    brent_dashboard::init_tracing(&config.log_level);

    let output = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.model_cache_path.clone());

    let fetcher = Fetcher::new()?;
    let data = loader::load_dataset(&config, &fetcher).await?;
    let spec = loader::additive_model(&config)?;

    let model = tokio::task::spawn_blocking(move || spec.train(&data))
        .await?
        .context("failed to fit additive model")?;
    model
        .save(&output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    tracing::info!(
        path = %output.display(),
        history_start = %model.start(),
        history_end = %model.history_end(),
        changepoints = model.changepoints().len(),
        noise_std = model.noise_std(),
        "model artifact written"
    );
    Ok(())
}
