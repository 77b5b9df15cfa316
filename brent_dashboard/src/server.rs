use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, NaiveDate, Utc};
use price_forecast::analysis::{DashboardReport, ReportOptions};
use price_forecast::metrics::HoldoutReport;
use price_forecast::models::additive::FittedSeasonality;
use price_forecast::utils::parse_date;
use price_forecast::{ForecastError, TrainedForecastModel};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::fetch::Fetcher;
use crate::forecast::{self, ForecastTable, ModelChoice};
use crate::loader;
use crate::state::{AppState, EventEntry, LoadPhase, ModelOrigin, Snapshot};
use crate::web;

type S = Arc<AppState>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    NotReady(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = %status, error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<ForecastError> for ApiError {
    fn from(err: ForecastError) -> Self {
        match &err {
            ForecastError::ValidationError(_)
            | ForecastError::InvalidParameter(_)
            | ForecastError::ParseError(_) => ApiError::BadRequest(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

pub fn build_router(state: S) -> Router {
    Router::new()
        .route("/", get(serve_ui))
        .route("/api/status", get(get_status))
        .route("/api/summary", get(get_summary))
        .route("/api/forecast", get(get_forecast))
        .route("/api/forecast.csv", get(get_forecast_csv))
        .route("/api/model", get(get_model))
        .route("/api/events", get(get_events))
        .route("/api/reload", post(post_reload))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn ready_snapshot(state: &AppState) -> Result<Arc<Snapshot>, ApiError> {
    state.snapshot().ok_or_else(|| match state.last_error() {
        Some(error) => ApiError::NotReady(format!("data is not available: {error}")),
        None => ApiError::NotReady("model and dataset are still loading".into()),
    })
}

fn parse_param<T: FromStr>(name: &str, raw: Option<&str>) -> Result<Option<T>, ApiError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("invalid {name}: {v}"))),
    }
}

fn parse_day(name: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => parse_date(v, Some("%Y-%m-%d"))
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("invalid {name}: {v}, expected YYYY-MM-DD"))),
    }
}

// ── UI ──────────────────────────────────────────────────────────────────────

async fn serve_ui() -> Html<&'static str> {
    Html(web::INDEX_HTML)
}

// ── Status ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct StatusResponse {
    phase: LoadPhase,
    page_title: String,
    dataset_url: String,
    model_loaded: bool,
    model_origin: Option<ModelOrigin>,
    observations: Option<usize>,
    first_date: Option<NaiveDate>,
    last_date: Option<NaiveDate>,
    loaded_at: Option<DateTime<Utc>>,
    error: Option<String>,
    default_periods: usize,
    max_periods: usize,
}

async fn get_status(State(state): State<S>) -> Json<StatusResponse> {
    let status = state.status();
    let snapshot = status.snapshot;
    let config = &state.config;

    Json(StatusResponse {
        phase: status.phase,
        page_title: config.page_title.clone(),
        dataset_url: config.dataset_url.clone(),
        model_loaded: snapshot.is_some(),
        model_origin: snapshot.as_ref().map(|s| s.origin.clone()),
        observations: snapshot.as_ref().map(|s| s.data.len()),
        first_date: snapshot.as_ref().map(|s| s.data.first_date()),
        last_date: snapshot.as_ref().map(|s| s.data.last_date()),
        loaded_at: snapshot.as_ref().map(|s| s.loaded_at),
        error: status.last_error,
        default_periods: config.default_periods,
        max_periods: config.max_periods,
    })
}

async fn get_events(State(state): State<S>) -> Json<Vec<EventEntry>> {
    Json(state.events())
}

// ── Summary ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct SummaryQuery {
    start: Option<String>,
    end: Option<String>,
    window: Option<String>,
}

async fn get_summary(
    State(state): State<S>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<DashboardReport>, ApiError> {
    let snapshot = ready_snapshot(&state)?;

    let start = parse_day("start", query.start.as_deref())?;
    let end = parse_day("end", query.end.as_deref())?;
    let window = parse_param::<usize>("window", query.window.as_deref())?
        .unwrap_or(state.config.rolling_window);
    if window == 0 {
        return Err(ApiError::BadRequest("window must be at least 1".into()));
    }

    let data = snapshot
        .data
        .filter_range(start, end)?
        .ok_or_else(|| ApiError::NotFound("no observations in the selected range".into()))?;

    let options = ReportOptions {
        rolling_window: window,
        histogram_bins: state.config.histogram_bins,
        ..ReportOptions::default()
    };
    Ok(Json(DashboardReport::build(&data, &options)?))
}

// ── Forecast ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct ForecastQuery {
    periods: Option<String>,
    model: Option<String>,
    include_history: Option<String>,
}

struct ForecastRequest {
    periods: usize,
    model: ModelChoice,
    include_history: bool,
}

impl ForecastQuery {
    fn validate(&self, default_periods: usize, max_periods: usize) -> Result<ForecastRequest, ApiError> {
        let periods = parse_param::<i64>("periods", self.periods.as_deref())?
            .unwrap_or(default_periods as i64);
        if periods < 1 {
            return Err(ApiError::BadRequest("periods must be at least 1".into()));
        }
        if periods as u64 > max_periods as u64 {
            return Err(ApiError::BadRequest(format!(
                "periods must be at most {max_periods}"
            )));
        }

        let model = match self.model.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            Some(raw) => raw.parse::<ModelChoice>().map_err(ApiError::BadRequest)?,
            None => ModelChoice::Additive,
        };

        let include_history =
            parse_param::<bool>("include_history", self.include_history.as_deref())?
                .unwrap_or(true);

        Ok(ForecastRequest {
            periods: periods as usize,
            model,
            include_history,
        })
    }
}

async fn run_forecast(state: &S, query: &ForecastQuery) -> Result<ForecastTable, ApiError> {
    let request = query.validate(state.config.default_periods, state.config.max_periods)?;
    let snapshot = ready_snapshot(state)?;
    if request.model == ModelChoice::Arima && snapshot.arima.is_none() {
        return Err(ApiError::NotFound(forecast::ARIMA_UNAVAILABLE.into()));
    }
    let interval_width = state.config.interval_width;

    let table = tokio::task::spawn_blocking(move || {
        forecast::forecast(
            &snapshot,
            request.model,
            request.periods,
            request.include_history,
            interval_width,
        )
    })
    .await
    .map_err(|e| ApiError::Internal(format!("forecast task failed: {e}")))??;

    state.push_event(
        "forecast",
        &format!("{} for {} days", table.model, table.periods),
    );
    Ok(table)
}

async fn get_forecast(
    State(state): State<S>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<ForecastTable>, ApiError> {
    run_forecast(&state, &query).await.map(Json)
}

async fn get_forecast_csv(
    State(state): State<S>,
    Query(query): Query<ForecastQuery>,
) -> Result<Response, ApiError> {
    let table = run_forecast(&state, &query).await?;
    let body = forecast::rows_to_csv(&table.rows)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"forecast.csv\"",
            ),
        ],
        body,
    )
        .into_response())
}

// ── Model ───────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChangepointInfo {
    ds: NaiveDate,
    slope_change: f64,
}

#[derive(Serialize)]
struct AdditiveInfo<'a> {
    name: &'a str,
    origin: &'a ModelOrigin,
    history_start: NaiveDate,
    history_end: NaiveDate,
    history_len: usize,
    noise_std: f64,
    interval_width: f64,
    changepoints: Vec<ChangepointInfo>,
    seasonalities: &'a [FittedSeasonality],
}

#[derive(Serialize)]
struct ArimaInfo<'a> {
    name: &'a str,
    ar_coefficients: &'a [f64],
    ma_coefficients: &'a [f64],
    sigma2: f64,
}

#[derive(Serialize)]
struct ModelResponse<'a> {
    additive: AdditiveInfo<'a>,
    arima: Option<ArimaInfo<'a>>,
    validation: &'a [HoldoutReport],
}

async fn get_model(State(state): State<S>) -> Result<Response, ApiError> {
    let snapshot = ready_snapshot(&state)?;
    let additive = &snapshot.additive;

    let response = ModelResponse {
        additive: AdditiveInfo {
            name: additive.name(),
            origin: &snapshot.origin,
            history_start: additive.start(),
            history_end: additive.history_end(),
            history_len: additive.history_len(),
            noise_std: additive.noise_std(),
            interval_width: additive.interval_width(),
            changepoints: additive
                .changepoints()
                .into_iter()
                .map(|(ds, slope_change)| ChangepointInfo { ds, slope_change })
                .collect(),
            seasonalities: additive.seasonalities(),
        },
        arima: snapshot.arima.as_ref().map(|arima| ArimaInfo {
            name: arima.name(),
            ar_coefficients: arima.ar_coefficients(),
            ma_coefficients: arima.ma_coefficients(),
            sigma2: arima.sigma2(),
        }),
        validation: &snapshot.validation,
    };

    Ok(Json(response).into_response())
}

// ── Reload ──────────────────────────────────────────────────────────────────

async fn post_reload(State(state): State<S>) -> Result<Json<serde_json::Value>, ApiError> {
    let fetcher = Fetcher::new().map_err(|e| ApiError::Internal(format!("{e:#}")))?;
    loader::reload(state.clone(), fetcher)
        .await
        .map_err(|e| ApiError::Internal(format!("reload failed: {e:#}")))?;

    let observations = state.snapshot().map(|s| s.data.len());
    Ok(Json(serde_json::json!({ "ok": true, "observations": observations })))
}
