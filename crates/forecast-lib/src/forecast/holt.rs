//! Holt double exponential smoothing
//!
//! Additive level + trend model. The smoothing weights come from
//! configuration; the initial level and trend are estimated from the data by
//! minimising the one-step-ahead squared error. Because the recursion is
//! linear in the initial state for fixed weights, that minimisation reduces
//! to a 2x2 least-squares problem.

use super::linalg;
use crate::error::FitError;

/// Minimum samples before the smoothing path produces a forecast
pub const MIN_SMOOTHING_SAMPLES: usize = 5;

/// Holt model with fixed level/trend weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoltModel {
    level_weight: f64,
    trend_weight: f64,
}

/// Result of fitting a Holt model to a series
#[derive(Debug, Clone, PartialEq)]
pub struct HoltFit {
    pub level: f64,
    pub trend: f64,
    pub initial_level: f64,
    pub initial_trend: f64,
    /// Sum of squared one-step-ahead errors
    pub sse: f64,
}

impl HoltModel {
    pub fn new(level_weight: f64, trend_weight: f64) -> Self {
        Self {
            level_weight,
            trend_weight,
        }
    }

    /// Fit level and trend over the full series
    pub fn fit(&self, values: &[f64]) -> Result<HoltFit, FitError> {
        let (alpha, beta) = (self.level_weight, self.trend_weight);
        if !(0.0..=1.0).contains(&alpha) || !(0.0..=1.0).contains(&beta) {
            return Err(FitError::InvalidParameter(format!(
                "smoothing weights ({alpha}, {beta}) outside [0, 1]"
            )));
        }
        if values.len() < 2 {
            return Err(FitError::Degenerate(format!(
                "{} samples, need at least 2",
                values.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFinite("smoothing input"));
        }

        let (initial_level, initial_trend) = self.estimate_initial_state(values);
        let (level, trend, sse) = self.run(values, initial_level, initial_trend);

        if !level.is_finite() || !trend.is_finite() {
            return Err(FitError::NonFinite("smoothing state"));
        }

        Ok(HoltFit {
            level,
            trend,
            initial_level,
            initial_trend,
            sse,
        })
    }

    /// Least-squares initial (level, trend), falling back to the first two samples
    fn estimate_initial_state(&self, values: &[f64]) -> (f64, f64) {
        let fallback = (values[0], values[1] - values[0]);

        // Predictions split into data-driven part + contributions of l0 and b0
        let data = self.one_step_predictions(values, 0.0, 0.0, true);
        let from_level = self.one_step_predictions(values, 1.0, 0.0, false);
        let from_trend = self.one_step_predictions(values, 0.0, 1.0, false);

        let rows: Vec<Vec<f64>> = from_level
            .iter()
            .zip(&from_trend)
            .map(|(u, v)| vec![*u, *v])
            .collect();
        let residuals: Vec<f64> = values.iter().zip(&data).map(|(y, c)| y - c).collect();

        match linalg::least_squares(&rows, &residuals) {
            Ok(coef) if coef.len() == 2 && coef.iter().all(|c| c.is_finite()) => {
                (coef[0], coef[1])
            }
            _ => fallback,
        }
    }

    /// One-step-ahead predictions for every observation.
    ///
    /// With `with_data = false` the observations are replaced by zeros, which
    /// isolates the effect of the initial state.
    fn one_step_predictions(
        &self,
        values: &[f64],
        level0: f64,
        trend0: f64,
        with_data: bool,
    ) -> Vec<f64> {
        let (alpha, beta) = (self.level_weight, self.trend_weight);
        let mut level = level0;
        let mut trend = trend0;
        let mut predictions = Vec::with_capacity(values.len());

        for &y in values {
            let y = if with_data { y } else { 0.0 };
            predictions.push(level + trend);
            let prev_level = level;
            level = alpha * y + (1.0 - alpha) * (level + trend);
            trend = beta * (level - prev_level) + (1.0 - beta) * trend;
        }
        predictions
    }

    /// Run the recursion from an initial state, returning final (level, trend, sse)
    fn run(&self, values: &[f64], level0: f64, trend0: f64) -> (f64, f64, f64) {
        let (alpha, beta) = (self.level_weight, self.trend_weight);
        let mut level = level0;
        let mut trend = trend0;
        let mut sse = 0.0;

        for &y in values {
            let err = y - (level + trend);
            sse += err * err;
            let prev_level = level;
            level = alpha * y + (1.0 - alpha) * (level + trend);
            trend = beta * (level - prev_level) + (1.0 - beta) * trend;
        }
        (level, trend, sse)
    }
}

impl HoltFit {
    /// Extrapolate `steps` points ahead: level + h * trend for h = 1..=steps
    pub fn forecast(&self, steps: usize) -> Vec<f64> {
        (1..=steps)
            .map(|h| self.level + self.trend * h as f64)
            .collect()
    }
}
