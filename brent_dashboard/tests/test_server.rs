use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use brent_dashboard::config::Config;
use brent_dashboard::fetch::Fetcher;
use brent_dashboard::state::{AppState, LoadPhase};
use brent_dashboard::{loader, server};
use chrono::{Days, NaiveDate};
use pretty_assertions::assert_eq;
use price_forecast::models::additive::AdditiveModel;
use price_forecast::{ForecastModel, TimeSeriesData};
use serde_json::Value;
use tempfile::TempDir;
use tower::util::ServiceExt;

const OBSERVATIONS: usize = 400;

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, 1).unwrap()
}

fn price(i: usize) -> f64 {
    let t = i as f64;
    50.0 + 0.05 * t + 3.0 * (2.0 * std::f64::consts::PI * t / 30.0).sin()
}

fn write_dataset(dir: &Path) -> String {
    write_rows(dir, "brent.csv", OBSERVATIONS)
}

fn write_rows(dir: &Path, name: &str, rows: usize) -> String {
    let mut csv = String::from("Date;Price\n");
    for i in 0..rows {
        let date = start_date().checked_add_days(Days::new(i as u64)).unwrap();
        csv.push_str(&format!("{};{:.4}\n", date.format("%d/%m/%Y"), price(i)).replace('.', ","));
    }
    let path = dir.join(name);
    std::fs::write(&path, csv).unwrap();
    path.to_str().unwrap().to_string()
}

fn test_config(dir: &Path, extra: &[(&str, String)]) -> Config {
    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert("DATASET_URL".into(), write_dataset(dir));
    vars.insert(
        "MODEL_CACHE_PATH".into(),
        dir.join("model.json").to_str().unwrap().to_string(),
    );
    vars.insert("ARIMA_ORDER".into(), "1,1,0".into());
    vars.insert("UNCERTAINTY_SAMPLES".into(), "50".into());
    vars.insert("MAX_PERIODS".into(), "365".into());
    for (key, value) in extra {
        vars.insert(key.to_string(), value.clone());
    }
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

async fn loaded_app(dir: &TempDir) -> (Arc<AppState>, Router) {
    let state = AppState::new(test_config(dir.path(), &[]));
    loader::reload(state.clone(), Fetcher::new().unwrap())
        .await
        .unwrap();
    let router = server::build_router(state.clone());
    (state, router)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, String) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(router, uri).await;
    (status, serde_json::from_str(&body).unwrap())
}

#[tokio::test]
async fn serves_page_and_reports_loading_before_first_load() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(test_config(dir.path(), &[]));
    let router = server::build_router(state);

    let (status, page) = get(&router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("Generate forecast"));
    assert!(page.contains("Dashboard"));
    assert!(page.contains("Insights"));

    let (status, body) = get_json(&router, "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "loading");
    assert_eq!(body["model_loaded"], false);

    let (status, body) = get_json(&router, "/api/forecast").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("loading"));
}

#[tokio::test]
async fn status_after_load() {
    let dir = tempfile::tempdir().unwrap();
    let (state, router) = loaded_app(&dir).await;

    assert_eq!(state.phase(), LoadPhase::Ready);
    assert!(dir.path().join("model.json").exists());

    let (status, body) = get_json(&router, "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "ready");
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["observations"], OBSERVATIONS);
    assert_eq!(body["first_date"], "2022-01-01");
    assert_eq!(body["model_origin"]["kind"], "fitted_locally");
    assert_eq!(body["default_periods"], 30);

    let (_, events) = get_json(&router, "/api/events").await;
    let kinds: Vec<&str> = events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["load", "ready"]);
}

#[tokio::test]
async fn forecast_defaults_include_history() {
    let dir = tempfile::tempdir().unwrap();
    let (_, router) = loaded_app(&dir).await;

    let (status, body) = get_json(&router, "/api/forecast").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "Additive (trend + seasonality)");
    assert_eq!(body["periods"], 30);

    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), OBSERVATIONS + 30);
    assert_eq!(rows[0]["ds"], "2022-01-01");
    let last_history = start_date()
        .checked_add_days(Days::new(OBSERVATIONS as u64 - 1))
        .unwrap();
    let last_forecast = last_history.checked_add_days(Days::new(30)).unwrap();
    assert_eq!(rows[rows.len() - 1]["ds"], last_forecast.to_string());

    for row in rows {
        let lower = row["yhat_lower"].as_f64().unwrap();
        let yhat = row["yhat"].as_f64().unwrap();
        let upper = row["yhat_upper"].as_f64().unwrap();
        assert!(lower <= yhat && yhat <= upper);
    }
    assert_eq!(body["components"].as_array().unwrap().len(), rows.len());
}

#[tokio::test]
async fn arima_forecast_without_history() {
    let dir = tempfile::tempdir().unwrap();
    let (_, router) = loaded_app(&dir).await;

    let (status, body) =
        get_json(&router, "/api/forecast?periods=7&model=arima&include_history=false").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "ARIMA(1,1,0)");
    assert_eq!(body["rows"].as_array().unwrap().len(), 7);
    assert!(body.get("components").is_none());
}

#[tokio::test]
async fn forecast_parameters_are_validated() {
    let dir = tempfile::tempdir().unwrap();
    let (_, router) = loaded_app(&dir).await;

    for uri in [
        "/api/forecast?periods=0",
        "/api/forecast?periods=-3",
        "/api/forecast?periods=366",
        "/api/forecast?periods=ten",
        "/api/forecast?model=lstm",
        "/api/forecast?include_history=maybe",
        "/api/forecast.csv?periods=0",
    ] {
        let (status, body) = get_json(&router, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].is_string(), "{uri}");
    }

    let (status, _) = get_json(&router, "/api/forecast?periods=365&include_history=false").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn forecast_csv_export() {
    let dir = tempfile::tempdir().unwrap();
    let (_, router) = loaded_app(&dir).await;

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/forecast.csv?periods=5&include_history=false")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "ds,yhat,yhat_lower,yhat_upper");
}

#[tokio::test]
async fn summary_over_date_ranges() {
    let dir = tempfile::tempdir().unwrap();
    let (_, router) = loaded_app(&dir).await;

    let (status, body) = get_json(&router, "/api/summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["count"], OBSERVATIONS);
    assert_eq!(body["rolling_window"], 30);
    assert_eq!(body["histogram"].as_array().unwrap().len(), 30);

    let (status, body) =
        get_json(&router, "/api/summary?start=2022-02-01&end=2022-02-28&window=7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_date"], "2022-02-01");
    assert_eq!(body["last_date"], "2022-02-28");
    assert_eq!(body["summary"]["count"], 28);
    assert_eq!(body["rolling_window"], 7);
    assert_eq!(body["series"][6]["rolling_mean"].is_number(), true);
    assert_eq!(body["series"][5]["rolling_mean"], Value::Null);

    let (status, _) = get_json(&router, "/api/summary?start=2030-01-01").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for uri in [
        "/api/summary?start=01/02/2022",
        "/api/summary?start=2022-03-01&end=2022-02-01",
        "/api/summary?window=0",
    ] {
        let (status, _) = get_json(&router, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn model_endpoint_describes_both_models() {
    let dir = tempfile::tempdir().unwrap();
    let (_, router) = loaded_app(&dir).await;

    let (status, body) = get_json(&router, "/api/model").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["additive"]["name"], "Additive (trend + seasonality)");
    assert_eq!(body["additive"]["history_len"], OBSERVATIONS);
    assert_eq!(body["additive"]["origin"]["kind"], "fitted_locally");
    assert_eq!(body["arima"]["ar_coefficients"].as_array().unwrap().len(), 1);

    let validation = body["validation"].as_array().unwrap();
    assert_eq!(validation.len(), 2);
    assert_eq!(validation[0]["test_size"], 40);
    assert!(validation[0]["metrics"]["mae"].is_number());
}

#[tokio::test]
async fn downloads_model_artifact_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("published.json");

    let start = start_date();
    let dates = (0..60)
        .map(|i| start.checked_add_days(Days::new(i)).unwrap())
        .collect();
    let values = (0..60).map(|i| price(i as usize)).collect();
    let data = TimeSeriesData::new(dates, values).unwrap();
    AdditiveModel::new()
        .with_uncertainty_samples(20)
        .train(&data)
        .unwrap()
        .save(&artifact)
        .unwrap();

    let config = test_config(
        dir.path(),
        &[
            ("MODEL_URL", artifact.to_str().unwrap().to_string()),
            ("INTERVAL_WIDTH", "0.9".to_string()),
        ],
    );
    let cache = config.model_cache_path.clone();
    let state = AppState::new(config);
    loader::reload(state.clone(), Fetcher::new().unwrap())
        .await
        .unwrap();

    assert!(cache.exists());
    let router = server::build_router(state);
    let (_, body) = get_json(&router, "/api/model").await;
    assert_eq!(body["additive"]["origin"]["kind"], "downloaded");
    assert_eq!(body["additive"]["history_len"], 60);
    assert_eq!(body["additive"]["interval_width"], 0.9);

    let (status, body) = get_json(&router, "/api/forecast?periods=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["interval_width"], 0.9);
}

#[tokio::test]
async fn invalid_artifact_keeps_cached_model() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("broken.json");
    std::fs::write(&artifact, "{\"name\": 1}").unwrap();

    let config = test_config(
        dir.path(),
        &[("MODEL_URL", artifact.to_str().unwrap().to_string())],
    );
    let cache = config.model_cache_path.clone();
    std::fs::write(&cache, "previous artifact").unwrap();

    let state = AppState::new(config);
    let result = loader::reload(state.clone(), Fetcher::new().unwrap()).await;

    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("invalid model artifact"));
    assert_eq!(std::fs::read_to_string(&cache).unwrap(), "previous artifact");
    assert_eq!(state.phase(), LoadPhase::Failed);
}

#[tokio::test]
async fn short_series_serves_additive_without_arima() {
    let dir = tempfile::tempdir().unwrap();
    let short = write_rows(dir.path(), "short.csv", 6);
    let config = test_config(
        dir.path(),
        &[("DATASET_URL", short), ("ARIMA_ORDER", "5,1,0".to_string())],
    );
    let state = AppState::new(config);
    loader::reload(state.clone(), Fetcher::new().unwrap())
        .await
        .unwrap();
    assert_eq!(state.phase(), LoadPhase::Ready);
    assert!(state.snapshot().unwrap().arima.is_none());

    let router = server::build_router(state.clone());
    let (status, body) = get_json(&router, "/api/summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["count"], 6);

    let (status, body) = get_json(&router, "/api/forecast").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows"].as_array().unwrap().len(), 6 + 30);

    let (status, body) = get_json(&router, "/api/forecast?model=arima").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("ARIMA"));

    let (status, body) = get_json(&router, "/api/model").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["arima"], Value::Null);
    assert_eq!(body["additive"]["history_len"], 6);

    let events = state.events();
    let ready = events.iter().find(|e| e.kind == "ready").unwrap();
    assert!(ready.detail.contains("ARIMA unavailable"));
}

#[tokio::test]
async fn failed_load_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.csv");
    let config = test_config(
        dir.path(),
        &[("DATASET_URL", missing.to_str().unwrap().to_string())],
    );
    let state = AppState::new(config);

    let result = loader::reload(state.clone(), Fetcher::new().unwrap()).await;
    assert!(result.is_err());
    assert_eq!(state.phase(), LoadPhase::Failed);

    let router = server::build_router(state);
    let (_, status) = get_json(&router, "/api/status").await;
    assert_eq!(status["phase"], "failed");
    assert!(status["error"]
        .as_str()
        .unwrap()
        .contains("failed to fetch dataset"));

    let (code, body) = get_json(&router, "/api/summary").await;
    assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("not available"));
}

#[tokio::test]
async fn reload_endpoint_replaces_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let (state, router) = loaded_app(&dir).await;
    let before = state.snapshot().unwrap().loaded_at;

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/reload")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let after = state.snapshot().unwrap().loaded_at;
    assert!(after >= before);
    assert_eq!(state.events().len(), 4);
}
