//! ARIMA models for time series forecasting

use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
use crate::utils::future_dates;
use chrono::NaiveDate;
use statrs::distribution::{ContinuousCDF, Normal};

/// ARIMA model (AutoRegressive Integrated Moving Average)
#[derive(Debug, Clone)]
pub struct ArimaModel {
    /// Name of the model
    name: String,
    /// AR order (p)
    p: usize,
    /// Differencing order (d)
    d: usize,
    /// MA order (q)
    q: usize,
    /// Significance level of the forecast intervals
    alpha: f64,
}

/// Trained ARIMA model
#[derive(Debug, Clone)]
pub struct TrainedArimaModel {
    /// Name of the model
    name: String,
    /// Differencing order (d)
    d: usize,
    /// Significance level of the forecast intervals
    alpha: f64,
    /// Fitted AR coefficients
    ar_coefficients: Vec<f64>,
    /// Fitted MA coefficients
    ma_coefficients: Vec<f64>,
    /// Constant of the undifferenced series (only when d == 0)
    mean: f64,
    /// Innovation variance
    sigma2: f64,
    /// Historical data, in levels
    historical_data: Vec<f64>,
    /// Differenced and demeaned history
    differenced: Vec<f64>,
    /// Residuals from fitting, aligned with `differenced`
    residuals: Vec<f64>,
    /// Date of the last observation
    last_date: NaiveDate,
}

/// Difference a series `order` times
pub fn difference(data: &[f64], order: usize) -> Vec<f64> {
    let mut series = data.to_vec();
    for _ in 0..order {
        series = series.windows(2).map(|w| w[1] - w[0]).collect();
    }
    series
}

/// Lagged design rows for an AR(`p`) regression starting at `start`
fn ar_rows(series: &[f64], p: usize, start: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    (start..series.len())
        .map(|t| ((1..=p).map(|i| series[t - i]).collect(), series[t]))
        .unzip()
}

impl ArimaModel {
    /// Create a new ARIMA model
    pub fn new(p: usize, d: usize, q: usize) -> Result<Self> {
        if d > 2 {
            return Err(ForecastError::InvalidParameter(
                "Differencing order above 2 is not supported".to_string(),
            ));
        }
        if p + q == 0 && d == 0 {
            return Err(ForecastError::InvalidParameter(
                "ARIMA(0,0,0) has nothing to fit".to_string(),
            ));
        }

        Ok(Self {
            name: format!("ARIMA({},{},{})", p, d, q),
            p,
            d,
            q,
            alpha: 0.05,
        })
    }

    /// Significance level of the forecast intervals (0.05 gives 95% intervals)
    pub fn with_alpha(mut self, alpha: f64) -> Result<Self> {
        if alpha <= 0.0 || alpha >= 1.0 {
            return Err(ForecastError::InvalidParameter(
                "Alpha must be between 0 and 1".to_string(),
            ));
        }
        self.alpha = alpha;
        Ok(self)
    }

    /// Model order as `(p, d, q)`
    pub fn order(&self) -> (usize, usize, usize) {
        (self.p, self.d, self.q)
    }

    /// Order of the long autoregression used to estimate innovations
    fn long_ar_order(&self, n: usize) -> usize {
        let by_length = (n as f64).ln().powi(2).floor() as usize;
        by_length.max(2 * self.p.max(self.q)).min(n / 2)
    }

    /// Innovations estimated from a long autoregression; zero during warm-up
    fn estimate_innovations(&self, series: &[f64]) -> Result<(Vec<f64>, usize)> {
        let order = self.long_ar_order(series.len());
        if order == 0 || series.len() <= 2 * order {
            return Err(ForecastError::ValidationError(format!(
                "Insufficient data for {}: cannot estimate innovations from {} observations",
                self.name,
                series.len()
            )));
        }

        let (rows, targets) = ar_rows(series, order, order);
        let coefficients = price_math::least_squares(&rows, &targets, &vec![0.0; order])?;

        let mut innovations = vec![0.0; series.len()];
        for (offset, (row, target)) in rows.iter().zip(&targets).enumerate() {
            let fitted: f64 = row.iter().zip(&coefficients).map(|(x, b)| x * b).sum();
            innovations[order + offset] = target - fitted;
        }
        Ok((innovations, order))
    }
}

impl ForecastModel for ArimaModel {
    type Trained = TrainedArimaModel;

    fn train(&self, data: &TimeSeriesData) -> Result<TrainedArimaModel> {
        let prices = data.values();
        let required = self.p + self.d + self.q + 2;
        if prices.len() < required {
            return Err(ForecastError::ValidationError(format!(
                "Insufficient data for {}. Need at least {} observations.",
                self.name, required
            )));
        }

        let mut differenced = difference(prices, self.d);
        let mean = if self.d == 0 {
            price_math::stats::mean(&differenced)?
        } else {
            0.0
        };
        differenced.iter_mut().for_each(|w| *w -= mean);

        let (innovations, warmup) = if self.q > 0 {
            let (innovations, order) = self.estimate_innovations(&differenced)?;
            (innovations, order + self.q)
        } else {
            (vec![0.0; differenced.len()], 0)
        };
        let start = warmup.max(self.p);

        let (ar_coefficients, ma_coefficients) = if self.p + self.q == 0 {
            (Vec::new(), Vec::new())
        } else {
            if differenced.len() <= start + self.p + self.q {
                return Err(ForecastError::ValidationError(format!(
                    "Insufficient data for {} after differencing",
                    self.name
                )));
            }

            let (rows, targets): (Vec<Vec<f64>>, Vec<f64>) = (start..differenced.len())
                .map(|t| {
                    let mut row: Vec<f64> = (1..=self.p).map(|i| differenced[t - i]).collect();
                    row.extend((1..=self.q).map(|j| innovations[t - j]));
                    (row, differenced[t])
                })
                .unzip();
            let beta =
                price_math::least_squares(&rows, &targets, &vec![0.0; self.p + self.q])?;
            (beta[..self.p].to_vec(), beta[self.p..].to_vec())
        };

        let residuals = recursive_residuals(&differenced, &ar_coefficients, &ma_coefficients);
        let burn_in = self.p.max(self.q).min(residuals.len().saturating_sub(1));
        let scored = &residuals[burn_in..];
        let sigma2 = scored.iter().map(|e| e * e).sum::<f64>() / scored.len() as f64;
        if !sigma2.is_finite() {
            return Err(ForecastError::ForecastingError(format!(
                "{} diverged while computing residuals",
                self.name
            )));
        }

        tracing::debug!(
            model = %self.name,
            ar = ?ar_coefficients,
            ma = ?ma_coefficients,
            sigma2,
            "fitted arima model"
        );

        Ok(TrainedArimaModel {
            name: self.name.clone(),
            d: self.d,
            alpha: self.alpha,
            ar_coefficients,
            ma_coefficients,
            mean,
            sigma2,
            historical_data: prices.to_vec(),
            differenced,
            residuals,
            last_date: data.last_date(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// One-step-ahead residuals with pre-sample values taken as zero
fn recursive_residuals(series: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let mut residuals = vec![0.0; series.len()];
    for t in 0..series.len() {
        let prediction = one_step(series, &residuals, t, ar, ma);
        residuals[t] = series[t] - prediction;
    }
    residuals
}

fn one_step(series: &[f64], residuals: &[f64], t: usize, ar: &[f64], ma: &[f64]) -> f64 {
    let ar_part: f64 = ar
        .iter()
        .enumerate()
        .filter(|(i, _)| t > *i)
        .map(|(i, phi)| phi * series[t - i - 1])
        .sum();
    let ma_part: f64 = ma
        .iter()
        .enumerate()
        .filter(|(j, _)| t > *j)
        .map(|(j, theta)| theta * residuals[t - j - 1])
        .sum();
    ar_part + ma_part
}

impl TrainedArimaModel {
    /// Fitted AR coefficients
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    /// Fitted MA coefficients
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    /// Innovation variance
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Forecast of the differenced, demeaned series
    fn forecast_differenced(&self, horizon: usize) -> Vec<f64> {
        let n = self.differenced.len();
        let mut series = self.differenced.clone();
        let mut residuals = self.residuals.clone();

        for t in n..n + horizon {
            let forecast = one_step(
                &series,
                &residuals,
                t,
                &self.ar_coefficients,
                &self.ma_coefficients,
            );
            series.push(forecast);
            residuals.push(0.0);
        }

        series[n..].to_vec()
    }

    /// Undo differencing, anchoring on the last observed values
    fn integrate(&self, forecast: Vec<f64>) -> Vec<f64> {
        let mut values = forecast;
        for level in (0..self.d).rev() {
            let series = difference(&self.historical_data, level);
            let mut last = series.last().copied().unwrap_or(0.0);
            values = values
                .iter()
                .map(|v| {
                    last += v;
                    last
                })
                .collect();
        }
        values
    }

    /// Psi weights of the integrated process, `psi[0] == 1`
    fn psi_weights(&self, horizon: usize) -> Vec<f64> {
        // (1 - phi_1 B - ... - phi_p B^p)(1 - B)^d
        let mut polynomial: Vec<f64> = std::iter::once(1.0)
            .chain(self.ar_coefficients.iter().map(|phi| -phi))
            .collect();
        for _ in 0..self.d {
            let mut next = vec![0.0; polynomial.len() + 1];
            for (i, c) in polynomial.iter().enumerate() {
                next[i] += c;
                next[i + 1] -= c;
            }
            polynomial = next;
        }
        let ar_star: Vec<f64> = polynomial[1..].iter().map(|c| -c).collect();

        let mut psi = vec![1.0];
        for j in 1..horizon {
            let ma_term = self.ma_coefficients.get(j - 1).copied().unwrap_or(0.0);
            let ar_term: f64 = (1..=j.min(ar_star.len()))
                .map(|i| ar_star[i - 1] * psi[j - i])
                .sum();
            psi.push(ma_term + ar_term);
        }
        psi
    }
}

impl TrainedForecastModel for TrainedArimaModel {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let dates = future_dates(self.last_date, horizon)?;

        let differenced: Vec<f64> = self
            .forecast_differenced(horizon)
            .into_iter()
            .map(|w| w + self.mean)
            .collect();
        let values = self.integrate(differenced);

        let z = Normal::new(0.0, 1.0)
            .map_err(|e| ForecastError::ForecastingError(e.to_string()))?
            .inverse_cdf(1.0 - self.alpha / 2.0);
        let mut cumulative = 0.0;
        let intervals = self
            .psi_weights(horizon)
            .iter()
            .zip(&values)
            .map(|(psi, value)| {
                cumulative += psi * psi;
                let margin = z * (self.sigma2 * cumulative).sqrt();
                (value - margin, value + margin)
            })
            .collect();

        ForecastResult::new_with_intervals(values, horizon, intervals)?.with_timestamps(dates)
    }

    fn predict(&self, data: &TimeSeriesData) -> Result<ForecastResult> {
        let prices = data.values();
        if prices.len() <= self.d {
            return Err(ForecastError::DataError(format!(
                "Need more than {} observations to predict in-sample",
                self.d
            )));
        }

        let mut differenced = difference(prices, self.d);
        differenced.iter_mut().for_each(|w| *w -= self.mean);
        let residuals =
            recursive_residuals(&differenced, &self.ar_coefficients, &self.ma_coefficients);

        // Fitted level = observed level minus the one-step innovation; the
        // first `d` observations have no differenced counterpart.
        let mut predictions = prices[..self.d].to_vec();
        predictions.extend(
            prices[self.d..]
                .iter()
                .zip(&residuals)
                .map(|(price, residual)| price - residual),
        );

        ForecastResult::new(predictions, prices.len())?.with_timestamps(data.dates().to_vec())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
