//! Per-metric forecast production
//!
//! Produces the smoothing and regression trajectories for one tick from a
//! single window snapshot, and owns the regression retrain cadence.

use super::{ArimaFit, ArimaModel, HoltModel, MIN_SMOOTHING_SAMPLES};
use crate::config::EngineConfig;
use crate::error::FitError;
use crate::models::{ForecastMethod, ForecastResult, ModelDiagnostic};
use crate::window::SampleWindow;
use chrono::Duration as ChronoDuration;
use std::time::{Duration, Instant};
use tracing::debug;

/// Lower and upper bound of the metric domain
pub const DOMAIN_MIN: f64 = 0.0;
pub const DOMAIN_MAX: f64 = 100.0;

/// Clamp every point to the metric domain and pin the first one to `latest`
pub fn anchor_and_clip(mut trajectory: Vec<f64>, latest: f64) -> Vec<f64> {
    for v in trajectory.iter_mut() {
        *v = v.clamp(DOMAIN_MIN, DOMAIN_MAX);
    }
    if let Some(first) = trajectory.first_mut() {
        *first = latest;
    }
    trajectory
}

/// How long each fit took this tick (None when the step did not run)
#[derive(Debug, Clone, Copy, Default)]
pub struct FitTimings {
    pub smoothing: Option<Duration>,
    pub regression_fit: Option<Duration>,
}

/// Everything produced by one call to [`ModelState::tick`]
#[derive(Debug, Clone)]
pub struct ProducerOutput {
    pub result: ForecastResult,
    pub timings: FitTimings,
    /// Raw smoothing change exceeded the surge threshold; next tick refits
    pub surge_detected: bool,
    /// Total un-anchored, unclamped smoothing change (last - first)
    pub smoothing_change: Option<f64>,
}

/// Forecast model state for one metric
#[derive(Debug, Clone)]
pub struct ModelState {
    smoothing: HoltModel,
    regression: ArimaModel,
    retrain_interval: u64,
    surge_threshold: f64,
    horizon: usize,
    step: ChronoDuration,
    tick_counter: u64,
    fitted: Option<ArimaFit>,
    force_retrain: bool,
}

impl ModelState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            smoothing: HoltModel::new(
                config.smoothing.level_weight,
                config.smoothing.trend_weight,
            ),
            regression: ArimaModel::new(config.regression.order),
            retrain_interval: config.regression.retrain_interval.max(1),
            surge_threshold: config.regression.surge_threshold,
            horizon: config.horizon_steps(),
            step: ChronoDuration::seconds(config.sampling_interval_secs as i64),
            tick_counter: 0,
            fitted: None,
            force_retrain: false,
        }
    }

    pub fn tick_counter(&self) -> u64 {
        self.tick_counter
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn has_fitted_model(&self) -> bool {
        self.fitted.is_some()
    }

    pub fn fitted_model(&self) -> Option<&ArimaFit> {
        self.fitted.as_ref()
    }

    /// A surge was seen and the next eligible tick will refit
    pub fn retrain_pending(&self) -> bool {
        self.force_retrain
    }

    /// Advance the tick counter and produce both trajectories from `window`
    pub fn tick(&mut self, window: &SampleWindow) -> ProducerOutput {
        self.tick_counter += 1;

        let values = window.values();
        let Some(latest) = window.last().copied() else {
            return ProducerOutput {
                result: ForecastResult::default(),
                timings: FitTimings::default(),
                surge_detected: false,
                smoothing_change: None,
            };
        };

        let mut result = ForecastResult {
            timestamps: (0..self.horizon)
                .map(|i| latest.timestamp + self.step * i as i32)
                .collect(),
            ..Default::default()
        };
        let mut timings = FitTimings::default();

        // Smoothing path: refit from the full window every tick
        let mut smoothing_change = None;
        if values.len() >= MIN_SMOOTHING_SAMPLES {
            let start = Instant::now();
            match self.smoothing.fit(&values) {
                Ok(fit) => {
                    let raw = fit.forecast(self.horizon);
                    smoothing_change = match (raw.first(), raw.last()) {
                        (Some(first), Some(last)) => Some(last - first),
                        _ => None,
                    };
                    result.smoothing = anchor_and_clip(raw, latest.value);
                }
                Err(e) => result.diagnostics.push(diagnostic(ForecastMethod::Smoothing, &e)),
            }
            timings.smoothing = Some(start.elapsed());
        }

        // Regression path: refit on cadence, forecast every tick
        if values.len() > self.regression.order().warmup() {
            let due = self.fitted.is_none()
                || self.tick_counter % self.retrain_interval == 0
                || self.force_retrain;

            let mut refit_failed = false;
            if due {
                let forced = self.force_retrain;
                self.force_retrain = false;
                let start = Instant::now();
                match self.regression.fit(&values) {
                    Ok(fit) => {
                        debug!(
                            tick = self.tick_counter,
                            forced = forced,
                            samples = values.len(),
                            "Regression model refit"
                        );
                        self.fitted = Some(fit);
                        result.retrained = true;
                    }
                    // The previous fit stays in place but does not forecast this tick
                    Err(e) => {
                        refit_failed = true;
                        result.diagnostics.push(diagnostic(ForecastMethod::Regression, &e));
                    }
                }
                timings.regression_fit = Some(start.elapsed());
            }

            if let (false, Some(fit)) = (refit_failed, &self.fitted) {
                match fit.forecast(&values, self.horizon) {
                    Ok(raw) => result.regression = anchor_and_clip(raw, latest.value),
                    Err(e) => result.diagnostics.push(diagnostic(ForecastMethod::Regression, &e)),
                }
            }
        }

        // A large smoothing move pre-empts the regression cadence on the next tick
        let surge_detected = smoothing_change
            .map(|change| change > self.surge_threshold)
            .unwrap_or(false);
        if surge_detected {
            self.force_retrain = true;
        }

        ProducerOutput {
            result,
            timings,
            surge_detected,
            smoothing_change,
        }
    }
}

fn diagnostic(method: ForecastMethod, error: &FitError) -> ModelDiagnostic {
    ModelDiagnostic {
        method,
        message: format!("{} fit failed: {}", method.label(), error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RegressionConfig, SmoothingConfig};
    use crate::forecast::ArimaOrder;
    use chrono::{DateTime, Utc};
    use proptest::prelude::*;

    fn ts(i: usize) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + i as i64 * 15, 0).unwrap()
    }

    fn filled_window(values: &[f64], capacity: usize) -> SampleWindow {
        let mut window = SampleWindow::new(capacity).unwrap();
        for (i, v) in values.iter().enumerate() {
            window.append(ts(i), *v);
        }
        window
    }

    fn wavy(i: usize) -> f64 {
        50.0 + 8.0 * ((i as f64) * 0.5).sin() + (i % 4) as f64
    }

    fn config_with_interval(retrain_interval: u64) -> EngineConfig {
        EngineConfig {
            regression: RegressionConfig {
                retrain_interval,
                // Keep surges out of cadence tests
                surge_threshold: f64::INFINITY,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_anchor_and_clip() {
        let out = anchor_and_clip(vec![12.0, 105.0, -3.0, 50.0], 40.0);
        assert_eq!(out, vec![40.0, 100.0, 0.0, 50.0]);
        assert!(anchor_and_clip(Vec::new(), 40.0).is_empty());
    }

    #[test]
    fn test_too_few_samples_gives_empty_trajectories() {
        let mut state = ModelState::new(&EngineConfig::default());
        let window = filled_window(&[10.0, 11.0, 12.0, 13.0], 100);

        let out = state.tick(&window);
        assert!(out.result.smoothing.is_empty());
        assert!(out.result.regression.is_empty());
        assert!(out.result.diagnostics.is_empty());
        assert_eq!(state.tick_counter(), 1);
    }

    #[test]
    fn test_smoothing_starts_at_five_samples() {
        let mut state = ModelState::new(&EngineConfig::default());
        let window = filled_window(&[10.0, 11.0, 12.0, 13.0, 14.0], 100);

        let out = state.tick(&window);
        assert_eq!(out.result.smoothing.len(), 20);
        assert_eq!(out.result.smoothing[0], 14.0);
        // Regression needs more than p + d + q + 5 = 10 samples
        assert!(out.result.regression.is_empty());
    }

    #[test]
    fn test_regression_starts_after_warmup() {
        let mut state = ModelState::new(&EngineConfig::default());
        let values: Vec<f64> = (0..10).map(wavy).collect();
        assert!(state.tick(&filled_window(&values, 100)).result.regression.is_empty());

        let values: Vec<f64> = (0..11).map(wavy).collect();
        let out = state.tick(&filled_window(&values, 100));
        assert_eq!(out.result.regression.len(), 20);
        assert!(out.result.retrained);
        assert!(state.has_fitted_model());
    }

    #[test]
    fn test_timestamps_start_at_last_sample() {
        let mut state = ModelState::new(&EngineConfig::default());
        let values: Vec<f64> = (0..12).map(wavy).collect();
        let out = state.tick(&filled_window(&values, 100));

        assert_eq!(out.result.timestamps.len(), 20);
        assert_eq!(out.result.timestamps[0], ts(11));
        assert_eq!(out.result.timestamps[1], ts(12));
    }

    #[test]
    fn test_retrain_cadence() {
        let k = 4;
        let mut state = ModelState::new(&config_with_interval(k));
        let mut window = SampleWindow::new(100).unwrap();
        for i in 0..20 {
            window.append(ts(i), wavy(i));
        }

        let mut retrained_at = Vec::new();
        for i in 20..40 {
            window.append(ts(i), wavy(i));
            let out = state.tick(&window);
            assert!(!out.result.regression.is_empty());
            if out.result.retrained {
                retrained_at.push(state.tick_counter());
            }
        }

        // First tick (no model yet), then every multiple of k
        assert_eq!(retrained_at, vec![1, 4, 8, 12, 16, 20]);
    }

    #[test]
    fn test_surge_forces_retrain_next_tick() {
        let config = EngineConfig {
            regression: RegressionConfig {
                retrain_interval: 100,
                surge_threshold: 15.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut state = ModelState::new(&config);

        // Flat history: first tick fits, no surge
        let mut window = SampleWindow::new(100).unwrap();
        for i in 0..30 {
            window.append(ts(i), 20.0 + (i % 2) as f64 * 0.5);
        }
        let out = state.tick(&window);
        assert!(out.result.retrained);
        assert!(!out.surge_detected);

        // Steep climb: smoothing projects a big rise
        for i in 30..38 {
            window.append(ts(i), 20.0 + (i - 29) as f64 * 6.0);
        }
        let out = state.tick(&window);
        assert!(out.surge_detected);
        assert!(out.smoothing_change.unwrap() > 15.0);
        assert!(!out.result.retrained, "surge only affects the next tick");
        assert!(state.retrain_pending());

        window.append(ts(38), 75.0);
        let out = state.tick(&window);
        assert!(out.result.retrained);
    }

    #[test]
    fn test_failed_refit_keeps_previous_model() {
        let config = config_with_interval(2);
        let mut state = ModelState::new(&config);
        let values: Vec<f64> = (0..30).map(wavy).collect();
        let out = state.tick(&filled_window(&values, 100));
        assert!(out.result.retrained);
        let before = state.fitted_model().cloned();

        // Tick 2 is a cadence refit; poison the window so fitting fails
        let mut poisoned = values.clone();
        poisoned[3] = f64::NAN;
        let out = state.tick(&filled_window(&poisoned, 100));

        assert!(!out.result.retrained);
        assert!(out.result.regression.is_empty());
        assert!(out.result.smoothing.is_empty());
        assert_eq!(out.result.diagnostics.len(), 2);
        assert_eq!(state.fitted_model().cloned(), before);
    }

    #[test]
    fn test_failed_refit_on_finite_input_gives_empty_regression() {
        let config = config_with_interval(2);
        let mut state = ModelState::new(&config);
        let values: Vec<f64> = (0..30).map(wavy).collect();
        assert!(state.tick(&filled_window(&values, 100)).result.retrained);
        let before = state.fitted_model().cloned();

        // Finite but huge: the normal equations overflow on the cadence refit
        let huge: Vec<f64> = (0..30).map(|i| 1e160 * (1.0 + (i % 3) as f64)).collect();
        let out = state.tick(&filled_window(&huge, 100));

        assert!(!out.result.retrained);
        assert!(out.result.regression.is_empty());
        assert!(out
            .result
            .diagnostics
            .iter()
            .any(|d| d.method == ForecastMethod::Regression));
        assert_eq!(state.fitted_model().cloned(), before);

        // Next tick on sane data forecasts again
        let out = state.tick(&filled_window(&values, 100));
        assert_eq!(out.result.regression.len(), 20);
    }

    #[test]
    fn test_degenerate_smoothing_weights_reported() {
        let config = EngineConfig {
            smoothing: SmoothingConfig {
                level_weight: 2.0,
                trend_weight: 0.2,
            },
            regression: RegressionConfig {
                order: ArimaOrder::new(1, 1, 0),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut state = ModelState::new(&config);
        let values: Vec<f64> = (0..20).map(wavy).collect();
        let out = state.tick(&filled_window(&values, 100));

        assert!(out.result.smoothing.is_empty());
        assert!(!out.result.regression.is_empty());
        assert_eq!(out.result.diagnostics.len(), 1);
        assert_eq!(out.result.diagnostics[0].method, ForecastMethod::Smoothing);
    }

    proptest! {
        #[test]
        fn prop_smoothing_anchored_and_clipped(
            values in proptest::collection::vec(0.0f64..100.0, 5..80),
        ) {
            let mut state = ModelState::new(&EngineConfig::default());
            let window = filled_window(&values, 100);
            let out = state.tick(&window);

            let smoothing = &out.result.smoothing;
            prop_assert_eq!(smoothing.len(), state.horizon());
            prop_assert_eq!(smoothing[0], *values.last().unwrap());
            prop_assert!(smoothing.iter().all(|v| (DOMAIN_MIN..=DOMAIN_MAX).contains(v)));
        }

        #[test]
        fn prop_regression_anchored_and_clipped(
            values in proptest::collection::vec(0.0f64..100.0, 11..80),
        ) {
            let mut state = ModelState::new(&EngineConfig::default());
            let window = filled_window(&values, 100);
            let out = state.tick(&window);

            let regression = &out.result.regression;
            if !regression.is_empty() {
                prop_assert_eq!(regression.len(), state.horizon());
                prop_assert_eq!(regression[0], *values.last().unwrap());
                prop_assert!(regression.iter().all(|v| (DOMAIN_MIN..=DOMAIN_MAX).contains(v)));
            }
        }
    }
}
