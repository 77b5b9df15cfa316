//! Builds a [`Snapshot`]: dataset, additive model, ARIMA model and holdout scores

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use price_forecast::metrics::{holdout_validation, HoldoutReport};
use price_forecast::models::additive::{AdditiveModel, TrainedAdditiveModel};
use price_forecast::models::arima::ArimaModel;
use price_forecast::{DataLoader, ForecastModel, TimeSeriesData};

use crate::config::Config;
use crate::fetch::{self, Fetcher};
use crate::state::{AppState, ModelOrigin, Snapshot};

pub fn additive_model(config: &Config) -> Result<AdditiveModel> {
    Ok(AdditiveModel::new()
        .with_interval_width(config.interval_width)?
        .with_uncertainty_samples(config.uncertainty_samples))
}

pub fn arima_model(config: &Config) -> Result<ArimaModel> {
    let (p, d, q) = config.arima_order;
    Ok(ArimaModel::new(p, d, q)?.with_alpha(1.0 - config.interval_width)?)
}

pub async fn load_dataset(config: &Config, fetcher: &Fetcher) -> Result<TimeSeriesData> {
    let bytes = fetcher
        .fetch(&config.dataset_url)
        .await
        .context("failed to fetch dataset")?;

    let data = tokio::task::spawn_blocking(move || DataLoader::from_csv_bytes(&bytes))
        .await?
        .context("failed to parse dataset")?;

    tracing::info!(
        observations = data.len(),
        first = %data.first_date(),
        last = %data.last_date(),
        "dataset loaded"
    );
    Ok(data)
}

/// Download the configured model artifact, or fit one and cache it
async fn obtain_additive(
    config: &Config,
    fetcher: &Fetcher,
    data: &TimeSeriesData,
) -> Result<(TrainedAdditiveModel, ModelOrigin)> {
    if let Some(url) = &config.model_url {
        let bytes = fetcher
            .fetch(url)
            .await
            .context("failed to download model artifact")?;
        let json = std::str::from_utf8(&bytes).context("model artifact is not UTF-8")?;
        let model = TrainedAdditiveModel::from_json(json)
            .context("invalid model artifact")?
            .with_uncertainty(config.interval_width, config.uncertainty_samples)?;

        if let Err(e) = fetch::write_cache(&config.model_cache_path, &bytes).await {
            tracing::warn!(error = %format!("{e:#}"), "could not cache downloaded model");
        }

        tracing::info!(
            url = %url,
            cache = %config.model_cache_path.display(),
            history_end = %model.history_end(),
            "model artifact downloaded"
        );
        return Ok((model, ModelOrigin::Downloaded { url: url.clone() }));
    }

    let spec = additive_model(config)?;
    let train_data = data.clone();
    let model = tokio::task::spawn_blocking(move || spec.train(&train_data))
        .await?
        .context("failed to fit additive model")?;

    if let Err(e) = model.save(&config.model_cache_path) {
        tracing::warn!(
            path = %config.model_cache_path.display(),
            error = %e,
            "could not cache fitted model"
        );
    }

    tracing::info!(history = model.history_len(), "additive model fitted locally");
    Ok((model, ModelOrigin::FittedLocally))
}

fn validate_models(config: &Config, data: &TimeSeriesData) -> Result<Vec<HoldoutReport>> {
    let mut reports = Vec::new();

    match holdout_validation(&additive_model(config)?, data, config.holdout_ratio) {
        Ok(report) => reports.push(report),
        Err(e) => tracing::warn!(error = %e, "additive holdout validation skipped"),
    }
    match holdout_validation(&arima_model(config)?, data, config.holdout_ratio) {
        Ok(report) => reports.push(report),
        Err(e) => tracing::warn!(error = %e, "arima holdout validation skipped"),
    }

    for report in &reports {
        tracing::info!(
            model = %report.model,
            test_size = report.test_size,
            mae = report.metrics.accuracy.mae,
            rmse = report.metrics.accuracy.rmse,
            "holdout validation"
        );
    }
    Ok(reports)
}

pub async fn load_snapshot(config: &Config, fetcher: &Fetcher) -> Result<Snapshot> {
    let data = load_dataset(config, fetcher).await?;
    let (additive, origin) = obtain_additive(config, fetcher, &data).await?;

    let blocking_config = config.clone();
    let blocking_data = data.clone();
    let (arima, validation) = tokio::task::spawn_blocking(move || -> Result<_> {
        let arima = match arima_model(&blocking_config)?.train(&blocking_data) {
            Ok(model) => Some(model),
            Err(e) => {
                tracing::warn!(error = %e, "ARIMA model unavailable");
                None
            }
        };
        let validation = validate_models(&blocking_config, &blocking_data)?;
        Ok((arima, validation))
    })
    .await??;

    Ok(Snapshot {
        data,
        additive,
        origin,
        arima,
        validation,
        loaded_at: Utc::now(),
    })
}

/// Load a fresh snapshot into `state`; the previous one stays on failure
pub async fn reload(state: Arc<AppState>, fetcher: Fetcher) -> Result<()> {
    let _guard = state.reload_lock.lock().await;
    state.begin_load();
    state.push_event("load", &format!("loading {}", state.config.dataset_url));

    match load_snapshot(&state.config, &fetcher).await {
        Ok(snapshot) => {
            let mut detail = format!(
                "{} observations {} to {}, model {}",
                snapshot.data.len(),
                snapshot.data.first_date(),
                snapshot.data.last_date(),
                match &snapshot.origin {
                    ModelOrigin::Downloaded { .. } => "downloaded",
                    ModelOrigin::FittedLocally => "fitted locally",
                }
            );
            if snapshot.arima.is_none() {
                detail.push_str(", ARIMA unavailable");
            }
            state.install(snapshot);
            state.push_event("ready", &detail);
            tracing::info!("{detail}");
            Ok(())
        }
        Err(e) => {
            let message = format!("{e:#}");
            tracing::error!(error = %message, "load failed");
            state.fail(message.clone());
            state.push_event("error", &message);
            Err(e)
        }
    }
}
