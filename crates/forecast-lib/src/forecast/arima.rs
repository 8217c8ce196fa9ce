//! ARIMA(p, d, q) regression model
//!
//! Fitting differences the series `d` times and estimates the ARMA(p, q)
//! coefficients with the two-stage Hannan-Rissanen procedure: a long
//! autoregression supplies innovation estimates, then the coefficients come
//! from ordinary least squares on lagged values and lagged innovations.
//!
//! A fitted model is a plain value. Forecasting re-runs the ARMA filter over
//! whatever series it is given, so a fit can be reused across ticks while the
//! window moves on.

use super::linalg::{self, difference};
use crate::error::FitError;
use serde::{Deserialize, Serialize};

/// Extra samples beyond p + d + q required before fitting
const WARMUP_MARGIN: usize = 5;

/// Lower bound on the order of the stage-one long autoregression
const MIN_LONG_AR_ORDER: usize = 4;

/// Structural order of an ARIMA model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self { p: 2, d: 1, q: 2 }
    }
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// The window must hold strictly more samples than this
    pub fn warmup(&self) -> usize {
        self.p + self.d + self.q + WARMUP_MARGIN
    }
}

impl std::fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

/// Unfitted ARIMA model of a given order
#[derive(Debug, Clone, Copy)]
pub struct ArimaModel {
    order: ArimaOrder,
}

/// Fitted ARIMA coefficients
#[derive(Debug, Clone, PartialEq)]
pub struct ArimaFit {
    order: ArimaOrder,
    ar: Vec<f64>,
    ma: Vec<f64>,
    /// Mean removed before fitting (only when d = 0)
    mean: f64,
    /// Innovation variance of the stage-two regression
    sigma2: f64,
    /// Number of samples the fit was estimated on
    trained_on: usize,
}

impl ArimaModel {
    pub fn new(order: ArimaOrder) -> Self {
        Self { order }
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    /// Estimate coefficients against the full series
    pub fn fit(&self, values: &[f64]) -> Result<ArimaFit, FitError> {
        let ArimaOrder { p, d, q } = self.order;
        if values.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFinite("regression input"));
        }
        if values.len() <= self.order.warmup() {
            return Err(FitError::Degenerate(format!(
                "{} samples, need more than {}",
                values.len(),
                self.order.warmup()
            )));
        }

        let mut w = difference(values, d);
        let mean = if d == 0 {
            w.iter().sum::<f64>() / w.len() as f64
        } else {
            0.0
        };
        for v in w.iter_mut() {
            *v -= mean;
        }

        let innovations = if q > 0 {
            long_ar_innovations(&w, p + q)?
        } else {
            vec![0.0; w.len()]
        };

        // Stage two: regress w_t on w_{t-1..t-p} and e_{t-1..t-q}
        let long_order = if q > 0 { long_ar_order(w.len(), p + q) } else { 0 };
        // Prefer rows whose lagged innovations are all estimated; short windows
        // fall back to treating the missing early innovations as zero.
        // Every start is at least max(p, q) so all lags index into the series.
        let start = [p.max(long_order + q), p.max(long_order).max(q), p.max(q)]
            .into_iter()
            .find(|s| w.len().saturating_sub(*s) >= p + q)
            .unwrap_or(p.max(q));
        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for t in start..w.len() {
            let mut row = Vec::with_capacity(p + q);
            row.extend((1..=p).map(|i| w[t - i]));
            row.extend((1..=q).map(|j| innovations[t - j]));
            rows.push(row);
            targets.push(w[t]);
        }

        let coef = if p + q == 0 {
            Vec::new()
        } else {
            linalg::least_squares(&rows, &targets)?
        };
        let (ar, ma) = coef.split_at(p);

        let sigma2 = if targets.is_empty() {
            0.0
        } else {
            rows.iter()
                .zip(&targets)
                .map(|(row, y)| {
                    let fitted: f64 = row.iter().zip(&coef).map(|(x, c)| x * c).sum();
                    (y - fitted).powi(2)
                })
                .sum::<f64>()
                / targets.len() as f64
        };
        if !sigma2.is_finite() {
            return Err(FitError::NonFinite("regression residuals"));
        }

        Ok(ArimaFit {
            order: self.order,
            ar: ar.to_vec(),
            ma: ma.to_vec(),
            mean,
            sigma2,
            trained_on: values.len(),
        })
    }
}

/// Order of the stage-one autoregression for a differenced series of length `n`
fn long_ar_order(n: usize, arma_terms: usize) -> usize {
    arma_terms.max(MIN_LONG_AR_ORDER).min(n / 2).max(1)
}

/// Residuals of a long autoregression, zero where no lags are available
fn long_ar_innovations(w: &[f64], arma_terms: usize) -> Result<Vec<f64>, FitError> {
    let m = long_ar_order(w.len(), arma_terms);
    let rows: Vec<Vec<f64>> = (m..w.len())
        .map(|t| (1..=m).map(|i| w[t - i]).collect())
        .collect();
    let targets: Vec<f64> = w[m..].to_vec();
    let phi = linalg::least_squares(&rows, &targets)?;

    let mut innovations = vec![0.0; w.len()];
    for t in m..w.len() {
        let predicted: f64 = (1..=m).map(|i| phi[i - 1] * w[t - i]).sum();
        innovations[t] = w[t] - predicted;
    }
    Ok(innovations)
}

impl ArimaFit {
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn trained_on(&self) -> usize {
        self.trained_on
    }

    /// Forecast `steps` points after the end of `values` (h = 1..=steps)
    pub fn forecast(&self, values: &[f64], steps: usize) -> Result<Vec<f64>, FitError> {
        let ArimaOrder { p, d, q } = self.order;
        if values.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFinite("regression input"));
        }
        if values.len() <= d {
            return Err(FitError::Degenerate(format!(
                "{} samples cannot be differenced {} times",
                values.len(),
                d
            )));
        }

        // Last value of each differencing level 0..d-1, used to integrate back
        let mut anchors = Vec::with_capacity(d);
        let mut level = values.to_vec();
        for _ in 0..d {
            anchors.push(level[level.len() - 1]);
            level = difference(&level, 1);
        }
        let mut w: Vec<f64> = level.iter().map(|v| v - self.mean).collect();
        let n = w.len();

        // Conditional innovations over the observed part
        let mut e = vec![0.0; n];
        for t in p..n {
            let ar: f64 = (1..=p).map(|i| self.ar[i - 1] * w[t - i]).sum();
            let ma: f64 = (1..=q)
                .filter(|j| t >= *j)
                .map(|j| self.ma[j - 1] * e[t - j])
                .sum();
            e[t] = w[t] - ar - ma;
        }

        // Recursive forecast with zero future innovations
        for h in 0..steps {
            let t = n + h;
            let ar: f64 = (1..=p)
                .filter(|i| t >= *i)
                .map(|i| self.ar[i - 1] * w[t - i])
                .sum();
            let ma: f64 = (1..=q)
                .filter(|j| t >= *j && t - j < n)
                .map(|j| self.ma[j - 1] * e[t - j])
                .sum();
            w.push(ar + ma);
        }

        let mut forecast: Vec<f64> = w[n..].iter().map(|v| v + self.mean).collect();
        for anchor in anchors.into_iter().rev() {
            let mut acc = anchor;
            for v in forecast.iter_mut() {
                acc += *v;
                *v = acc;
            }
        }

        if forecast.iter().all(|v| v.is_finite()) {
            Ok(forecast)
        } else {
            Err(FitError::NonFinite("regression forecast"))
        }
    }
}
