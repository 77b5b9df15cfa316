//! Additive regression model: piecewise-linear trend plus Fourier seasonality
//!
//! The model decomposes a daily series as `y(t) = trend(t) + yearly(t) +
//! weekly(t) + noise`. The trend is linear with slope changes at a set of
//! changepoints placed in the first part of the history. Seasonal effects are
//! truncated Fourier series over calendar days. Parameters are the MAP
//! estimate under Gaussian priors, obtained as a penalised least squares fit
//! on scaled data.
//!
//! Uncertainty intervals come from Monte Carlo simulation: future trend paths
//! draw new changepoints at the historical rate with Laplace slope changes,
//! and every path adds Gaussian observation noise.
//!
//! A trained model is a plain serde value, so a model fitted once can be
//! stored as JSON and loaded later without the training data.

use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
use crate::utils::{days_since_epoch, future_dates};
use chrono::NaiveDate;
use price_math::stats::quantile_sorted;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal, Poisson};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::Path;

const YEARLY_PERIOD: f64 = 365.25;
const WEEKLY_PERIOD: f64 = 7.0;
const FIRST_PASS_PENALTY: f64 = 1e-6;
const MIN_NOISE_VARIANCE: f64 = 1e-12;

/// Whether a seasonal component is fitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Seasonality {
    /// Decide from the length and spacing of the history
    Auto,
    /// Always fit, with the given Fourier order
    Enabled(usize),
    /// Never fit
    Disabled,
}

/// Seasonal component kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalityKind {
    Yearly,
    Weekly,
}

impl SeasonalityKind {
    fn period(self) -> f64 {
        match self {
            SeasonalityKind::Yearly => YEARLY_PERIOD,
            SeasonalityKind::Weekly => WEEKLY_PERIOD,
        }
    }

    fn default_order(self) -> usize {
        match self {
            SeasonalityKind::Yearly => 10,
            SeasonalityKind::Weekly => 3,
        }
    }
}

/// Additive trend + seasonality model configuration
#[derive(Debug, Clone)]
pub struct AdditiveModel {
    name: String,
    n_changepoints: usize,
    changepoint_range: f64,
    changepoint_prior_scale: f64,
    seasonality_prior_scale: f64,
    yearly: Seasonality,
    weekly: Seasonality,
    interval_width: f64,
    uncertainty_samples: usize,
    seed: u64,
}

/// A fitted Fourier seasonality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedSeasonality {
    pub kind: SeasonalityKind,
    pub period: f64,
    pub order: usize,
    /// Interleaved sin/cos coefficients, `2 * order` of them
    pub coefficients: Vec<f64>,
}

impl FittedSeasonality {
    fn value_at(&self, day: f64) -> f64 {
        fourier_terms(day, self.period, self.order)
            .iter()
            .zip(&self.coefficients)
            .map(|(x, b)| x * b)
            .sum()
    }
}

/// Trained additive model; this is the serialisable model artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedAdditiveModel {
    name: String,
    /// First history date; time zero of the trend
    start: NaiveDate,
    /// Length of the history in days; time one of the trend
    t_scale_days: f64,
    /// Divisor applied to prices before fitting
    y_scale: f64,
    /// Base slope
    k: f64,
    /// Base offset
    m: f64,
    /// Changepoint locations in scaled time
    changepoints_t: Vec<f64>,
    /// Slope change at each changepoint
    deltas: Vec<f64>,
    seasonalities: Vec<FittedSeasonality>,
    /// Observation noise standard deviation in scaled units
    sigma_obs: f64,
    interval_width: f64,
    uncertainty_samples: usize,
    seed: u64,
    history_dates: Vec<NaiveDate>,
}

/// One predicted date with its decomposition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdditivePoint {
    pub ds: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
    pub trend: f64,
    pub yearly: f64,
    pub weekly: f64,
}

impl Default for AdditiveModel {
    fn default() -> Self {
        Self::new()
    }
}

impl AdditiveModel {
    /// Create a model with the customary defaults
    pub fn new() -> Self {
        Self {
            name: "Additive (trend + seasonality)".to_string(),
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            yearly: Seasonality::Auto,
            weekly: Seasonality::Auto,
            interval_width: 0.8,
            uncertainty_samples: 1000,
            seed: 0,
        }
    }

    /// Maximum number of potential trend changepoints
    pub fn with_changepoints(mut self, n_changepoints: usize) -> Self {
        self.n_changepoints = n_changepoints;
        self
    }

    /// Fraction of the history in which changepoints are placed
    pub fn with_changepoint_range(mut self, range: f64) -> Result<Self> {
        if range <= 0.0 || range > 1.0 {
            return Err(ForecastError::InvalidParameter(
                "Changepoint range must be in (0, 1]".to_string(),
            ));
        }
        self.changepoint_range = range;
        Ok(self)
    }

    /// Prior scale of the slope changes; larger values give a more flexible trend
    pub fn with_changepoint_prior_scale(mut self, scale: f64) -> Result<Self> {
        if scale <= 0.0 || !scale.is_finite() {
            return Err(ForecastError::InvalidParameter(
                "Changepoint prior scale must be positive".to_string(),
            ));
        }
        self.changepoint_prior_scale = scale;
        Ok(self)
    }

    /// Prior scale of the seasonal coefficients
    pub fn with_seasonality_prior_scale(mut self, scale: f64) -> Result<Self> {
        if scale <= 0.0 || !scale.is_finite() {
            return Err(ForecastError::InvalidParameter(
                "Seasonality prior scale must be positive".to_string(),
            ));
        }
        self.seasonality_prior_scale = scale;
        Ok(self)
    }

    pub fn with_yearly_seasonality(mut self, seasonality: Seasonality) -> Self {
        self.yearly = seasonality;
        self
    }

    pub fn with_weekly_seasonality(mut self, seasonality: Seasonality) -> Self {
        self.weekly = seasonality;
        self
    }

    /// Coverage of the uncertainty interval
    pub fn with_interval_width(mut self, width: f64) -> Result<Self> {
        if width <= 0.0 || width >= 1.0 {
            return Err(ForecastError::InvalidParameter(
                "Interval width must be between 0 and 1".to_string(),
            ));
        }
        self.interval_width = width;
        Ok(self)
    }

    /// Number of simulated paths; zero disables intervals
    pub fn with_uncertainty_samples(mut self, samples: usize) -> Self {
        self.uncertainty_samples = samples;
        self
    }

    /// Seed of the interval simulation
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn resolve_order(
        setting: Seasonality,
        kind: SeasonalityKind,
        span_days: f64,
        median_spacing: f64,
    ) -> Option<usize> {
        match setting {
            Seasonality::Disabled | Seasonality::Enabled(0) => None,
            Seasonality::Enabled(order) => Some(order),
            Seasonality::Auto => {
                let enabled = match kind {
                    SeasonalityKind::Yearly => span_days >= 2.0 * YEARLY_PERIOD,
                    SeasonalityKind::Weekly => {
                        span_days >= 2.0 * WEEKLY_PERIOD && median_spacing < WEEKLY_PERIOD
                    }
                };
                enabled.then(|| kind.default_order())
            }
        }
    }

    /// History positions of the potential changepoints
    fn changepoint_indexes(&self, n: usize) -> Vec<usize> {
        let hist_size = (n as f64 * self.changepoint_range).floor() as usize;
        let count = self.n_changepoints.min(hist_size.saturating_sub(1));
        if count == 0 {
            return Vec::new();
        }

        (1..=count)
            .map(|j| ((j * (hist_size - 1)) as f64 / count as f64).round() as usize)
            .collect()
    }
}

fn fourier_terms(day: f64, period: f64, order: usize) -> Vec<f64> {
    let mut terms = Vec::with_capacity(2 * order);
    for r in 1..=order {
        let angle = 2.0 * PI * r as f64 * day / period;
        terms.push(angle.sin());
        terms.push(angle.cos());
    }
    terms
}

fn median_spacing(dates: &[NaiveDate]) -> f64 {
    let mut gaps: Vec<f64> = dates
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days() as f64)
        .collect();
    if gaps.is_empty() {
        return 0.0;
    }
    gaps.sort_by(|a, b| a.total_cmp(b));
    quantile_sorted(&gaps, 0.5)
}

fn residual_variance(rows: &[Vec<f64>], targets: &[f64], beta: &[f64], dof: usize) -> f64 {
    let sse: f64 = rows
        .iter()
        .zip(targets)
        .map(|(row, y)| {
            let fitted: f64 = row.iter().zip(beta).map(|(x, b)| x * b).sum();
            (y - fitted).powi(2)
        })
        .sum();
    sse / dof.max(1) as f64
}

impl ForecastModel for AdditiveModel {
    type Trained = TrainedAdditiveModel;

    fn train(&self, data: &TimeSeriesData) -> Result<TrainedAdditiveModel> {
        let dates = data.dates();
        let values = data.values();
        let n = values.len();
        if n < 2 {
            return Err(ForecastError::ValidationError(
                "Insufficient data for the additive model. Need at least 2 observations."
                    .to_string(),
            ));
        }

        let start = dates[0];
        let t_scale_days = (dates[n - 1] - start).num_days() as f64;
        let y_scale = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };

        let t: Vec<f64> = dates
            .iter()
            .map(|d| (*d - start).num_days() as f64 / t_scale_days)
            .collect();
        let y: Vec<f64> = values.iter().map(|v| v / y_scale).collect();

        let changepoints_t: Vec<f64> = self
            .changepoint_indexes(n)
            .into_iter()
            .map(|i| t[i])
            .collect();

        let spacing = median_spacing(dates);
        let seasonal_specs: Vec<(SeasonalityKind, usize)> = [
            (SeasonalityKind::Yearly, self.yearly),
            (SeasonalityKind::Weekly, self.weekly),
        ]
        .into_iter()
        .filter_map(|(kind, setting)| {
            Self::resolve_order(setting, kind, t_scale_days, spacing).map(|order| (kind, order))
        })
        .collect();

        // Design matrix: [offset, slope, changepoint hinges..., fourier terms...]
        let rows: Vec<Vec<f64>> = dates
            .iter()
            .zip(&t)
            .map(|(date, &ti)| {
                let day = days_since_epoch(*date) as f64;
                let mut row = vec![1.0, ti];
                row.extend(changepoints_t.iter().map(|&s| (ti - s).max(0.0)));
                for (kind, order) in &seasonal_specs {
                    row.extend(fourier_terms(day, kind.period(), *order));
                }
                row
            })
            .collect();

        let n_deltas = changepoints_t.len();
        let n_features = rows[0].len();
        let n_seasonal = n_features - 2 - n_deltas;

        let first_pass: Vec<f64> = std::iter::repeat(0.0)
            .take(2)
            .chain(std::iter::repeat(FIRST_PASS_PENALTY).take(n_deltas + n_seasonal))
            .collect();
        let beta = price_math::least_squares(&rows, &y, &first_pass)?;
        let noise_variance = residual_variance(&rows, &y, &beta, n.saturating_sub(n_features))
            .max(MIN_NOISE_VARIANCE);

        let delta_penalty = noise_variance / self.changepoint_prior_scale.powi(2);
        let seasonal_penalty = noise_variance / self.seasonality_prior_scale.powi(2);
        let penalties: Vec<f64> = std::iter::repeat(0.0)
            .take(2)
            .chain(std::iter::repeat(delta_penalty).take(n_deltas))
            .chain(std::iter::repeat(seasonal_penalty).take(n_seasonal))
            .collect();
        let beta = price_math::least_squares(&rows, &y, &penalties)?;
        let sigma_obs = residual_variance(&rows, &y, &beta, n).sqrt();

        let mut offset = 2 + n_deltas;
        let seasonalities = seasonal_specs
            .iter()
            .map(|&(kind, order)| {
                let coefficients = beta[offset..offset + 2 * order].to_vec();
                offset += 2 * order;
                FittedSeasonality {
                    kind,
                    period: kind.period(),
                    order,
                    coefficients,
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            observations = n,
            changepoints = n_deltas,
            seasonalities = seasonalities.len(),
            sigma_obs,
            "fitted additive model"
        );

        Ok(TrainedAdditiveModel {
            name: self.name.clone(),
            start,
            t_scale_days,
            y_scale,
            m: beta[0],
            k: beta[1],
            changepoints_t,
            deltas: beta[2..2 + n_deltas].to_vec(),
            seasonalities,
            sigma_obs,
            interval_width: self.interval_width,
            uncertainty_samples: self.uncertainty_samples,
            seed: self.seed,
            history_dates: dates.to_vec(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Trend changes drawn for one simulated future path
struct TrendPath {
    changes: Vec<(f64, f64)>,
}

impl TrendPath {
    fn offset_at(&self, t: f64) -> f64 {
        self.changes
            .iter()
            .map(|&(s, delta)| delta * (t - s).max(0.0))
            .sum()
    }
}

impl TrainedAdditiveModel {
    /// First history date
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last history date
    pub fn history_end(&self) -> NaiveDate {
        self.history_dates
            .last()
            .copied()
            .unwrap_or(self.start)
    }

    /// Number of observations the model was fitted on
    pub fn history_len(&self) -> usize {
        self.history_dates.len()
    }

    /// Fitted changepoint dates and their slope changes in price units per day
    pub fn changepoints(&self) -> Vec<(NaiveDate, f64)> {
        self.changepoints_t
            .iter()
            .zip(&self.deltas)
            .map(|(&s, &delta)| {
                let days = (s * self.t_scale_days).round() as u64;
                let date = self
                    .start
                    .checked_add_days(chrono::Days::new(days))
                    .unwrap_or(self.start);
                (date, delta * self.y_scale / self.t_scale_days)
            })
            .collect()
    }

    /// Fitted seasonal components
    pub fn seasonalities(&self) -> &[FittedSeasonality] {
        &self.seasonalities
    }

    /// Observation noise standard deviation in price units
    pub fn noise_std(&self) -> f64 {
        self.sigma_obs * self.y_scale
    }

    /// Coverage of the uncertainty interval
    pub fn interval_width(&self) -> f64 {
        self.interval_width
    }

    /// Number of simulated paths behind the intervals
    pub fn uncertainty_samples(&self) -> usize {
        self.uncertainty_samples
    }

    /// Replace the interval settings stored in the artifact
    pub fn with_uncertainty(mut self, width: f64, samples: usize) -> Result<Self> {
        if width <= 0.0 || width >= 1.0 {
            return Err(ForecastError::InvalidParameter(
                "Interval width must be between 0 and 1".to_string(),
            ));
        }
        self.interval_width = width;
        self.uncertainty_samples = samples;
        Ok(self)
    }

    /// History dates followed by `periods` days after the last one
    pub fn make_future_dates(&self, periods: usize, include_history: bool) -> Result<Vec<NaiveDate>> {
        let mut dates = if include_history {
            self.history_dates.clone()
        } else {
            Vec::new()
        };
        dates.extend(future_dates(self.history_end(), periods)?);
        Ok(dates)
    }

    fn scaled_time(&self, date: NaiveDate) -> f64 {
        (date - self.start).num_days() as f64 / self.t_scale_days
    }

    fn trend_at(&self, t: f64) -> f64 {
        let hinges: f64 = self
            .changepoints_t
            .iter()
            .zip(&self.deltas)
            .map(|(&s, &delta)| delta * (t - s).max(0.0))
            .sum();
        self.k * t + self.m + hinges
    }

    fn seasonal_at(&self, date: NaiveDate, kind: SeasonalityKind) -> f64 {
        let day = days_since_epoch(date) as f64;
        self.seasonalities
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.value_at(day))
            .sum()
    }

    fn sample_trend_paths(&self, rng: &mut StdRng, t_max: f64) -> Result<Vec<TrendPath>> {
        let samples = self.uncertainty_samples;
        let rate = self.changepoints_t.len() as f64 * (t_max - 1.0);
        let mean_abs_delta = if self.deltas.is_empty() {
            0.0
        } else {
            self.deltas.iter().map(|d| d.abs()).sum::<f64>() / self.deltas.len() as f64
        };

        if t_max <= 1.0 || rate <= 0.0 || mean_abs_delta <= 0.0 {
            return Ok((0..samples).map(|_| TrendPath { changes: Vec::new() }).collect());
        }

        let poisson = Poisson::new(rate)
            .map_err(|e| ForecastError::ForecastingError(e.to_string()))?;
        let laplace_tail = Exp::new(1.0 / mean_abs_delta)
            .map_err(|e| ForecastError::ForecastingError(e.to_string()))?;

        let mut paths = Vec::with_capacity(samples);
        for _ in 0..samples {
            let draws: f64 = poisson.sample(rng);
            let changes = (0..draws as usize)
                .map(|_| {
                    let at = rng.gen_range(1.0..t_max);
                    let magnitude: f64 = laplace_tail.sample(rng);
                    let delta = if rng.gen_bool(0.5) { magnitude } else { -magnitude };
                    (at, delta)
                })
                .collect();
            paths.push(TrendPath { changes });
        }
        Ok(paths)
    }

    /// Predict the given dates with interval bounds and components
    pub fn predict_dates(&self, dates: &[NaiveDate]) -> Result<Vec<AdditivePoint>> {
        if dates.is_empty() {
            return Err(ForecastError::ValidationError(
                "No dates to predict".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let t_max = dates
            .iter()
            .map(|d| self.scaled_time(*d))
            .fold(f64::NEG_INFINITY, f64::max);
        let paths = self.sample_trend_paths(&mut rng, t_max)?;
        let noise = Normal::new(0.0, self.sigma_obs)
            .map_err(|e| ForecastError::ForecastingError(e.to_string()))?;

        let lower_q = (1.0 - self.interval_width) / 2.0;
        let upper_q = (1.0 + self.interval_width) / 2.0;
        let mut draws = Vec::with_capacity(paths.len());

        let points = dates
            .iter()
            .map(|&ds| {
                let t = self.scaled_time(ds);
                let trend = self.trend_at(t);
                let yearly = self.seasonal_at(ds, SeasonalityKind::Yearly);
                let weekly = self.seasonal_at(ds, SeasonalityKind::Weekly);
                let yhat = trend + yearly + weekly;

                let (lower, upper) = if paths.is_empty() {
                    (yhat, yhat)
                } else {
                    draws.clear();
                    draws.extend(
                        paths
                            .iter()
                            .map(|path| yhat + path.offset_at(t) + noise.sample(&mut rng)),
                    );
                    draws.sort_by(|a, b| a.total_cmp(b));
                    (
                        quantile_sorted(&draws, lower_q),
                        quantile_sorted(&draws, upper_q),
                    )
                };

                AdditivePoint {
                    ds,
                    yhat: yhat * self.y_scale,
                    yhat_lower: lower * self.y_scale,
                    yhat_upper: upper * self.y_scale,
                    trend: trend * self.y_scale,
                    yearly: yearly * self.y_scale,
                    weekly: weekly * self.y_scale,
                }
            })
            .collect();

        Ok(points)
    }

    fn to_result(points: &[AdditivePoint]) -> Result<ForecastResult> {
        let values = points.iter().map(|p| p.yhat).collect::<Vec<_>>();
        let intervals = points.iter().map(|p| (p.yhat_lower, p.yhat_upper)).collect();
        let dates = points.iter().map(|p| p.ds).collect();

        ForecastResult::new_with_intervals(values, points.len(), intervals)?.with_timestamps(dates)
    }

    /// Serialize the model artifact
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize and validate a model artifact
    pub fn from_json(json: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    /// Write the model artifact to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read a model artifact from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<()> {
        if self.history_dates.is_empty() {
            return Err(ForecastError::DataError(
                "Model artifact has no history".to_string(),
            ));
        }
        if self.t_scale_days <= 0.0 || self.y_scale <= 0.0 {
            return Err(ForecastError::DataError(
                "Model artifact has invalid scaling".to_string(),
            ));
        }
        if self.changepoints_t.len() != self.deltas.len() {
            return Err(ForecastError::DataError(format!(
                "Model artifact has {} changepoints but {} deltas",
                self.changepoints_t.len(),
                self.deltas.len()
            )));
        }
        if let Some(bad) = self
            .seasonalities
            .iter()
            .find(|s| s.coefficients.len() != 2 * s.order)
        {
            return Err(ForecastError::DataError(format!(
                "Seasonality {:?} of order {} has {} coefficients",
                bad.kind,
                bad.order,
                bad.coefficients.len()
            )));
        }
        if !(self.sigma_obs >= 0.0) || !(0.0..1.0).contains(&self.interval_width) {
            return Err(ForecastError::DataError(
                "Model artifact has invalid uncertainty settings".to_string(),
            ));
        }
        Ok(())
    }
}

impl TrainedForecastModel for TrainedAdditiveModel {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let dates = self.make_future_dates(horizon, false)?;
        Self::to_result(&self.predict_dates(&dates)?)
    }

    fn predict(&self, data: &TimeSeriesData) -> Result<ForecastResult> {
        Self::to_result(&self.predict_dates(data.dates())?)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
