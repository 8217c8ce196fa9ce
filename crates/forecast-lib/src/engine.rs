//! Per-metric engine loop
//!
//! One [`MetricEngine`] owns the window and model state of a single metric.
//! A tick appends the sample, produces both forecasts and derives alerts.

use crate::alerting::AlertAnalyzer;
use crate::config::EngineConfig;
use crate::error::ConfigError;
use crate::forecast::ModelState;
use crate::models::{ForecastMethod, Sample, TickReport};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::window::SampleWindow;
use chrono::{DateTime, Utc};
use std::time::Instant;

/// Outcome of one fit attempt during the last tick
#[derive(Debug, Clone, PartialEq)]
pub struct FitOutcome {
    pub method: ForecastMethod,
    /// Failure message, `None` when the fit succeeded
    pub error: Option<String>,
}

/// Forecasting and alerting state for one metric
pub struct MetricEngine {
    name: String,
    window: SampleWindow,
    state: ModelState,
    analyzer: AlertAnalyzer,
    metrics: EngineMetrics,
    logger: StructuredLogger,
    last_fits: Vec<FitOutcome>,
}

impl MetricEngine {
    pub fn new(name: impl Into<String>, config: &EngineConfig) -> Result<Self, ConfigError> {
        Self::with_logger(name, config, StructuredLogger::new("local"))
    }

    pub fn with_logger(
        name: impl Into<String>,
        config: &EngineConfig,
        logger: StructuredLogger,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            window: SampleWindow::new(config.window_capacity)?,
            state: ModelState::new(config),
            analyzer: AlertAnalyzer::new(config.thresholds, config.sampling_interval_secs as f64),
            metrics: EngineMetrics::new(),
            logger,
            last_fits: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    pub fn model_state(&self) -> &ModelState {
        &self.state
    }

    /// Fit attempts made by the most recent tick
    pub fn last_fits(&self) -> &[FitOutcome] {
        &self.last_fits
    }

    /// Seed the window with history without ticking. Non-finite samples are
    /// skipped; returns how many were kept.
    pub fn bootstrap<I>(&mut self, history: I) -> usize
    where
        I: IntoIterator<Item = Sample>,
    {
        let before = self.window.len();
        let mut kept = 0;
        self.window.extend(history.into_iter().filter(|s| {
            let finite = s.value.is_finite();
            kept += usize::from(finite);
            finite
        }));
        self.metrics
            .set_window_samples(&self.name, self.window.len() as i64);
        tracing::debug!(
            metric = %self.name,
            before = before,
            kept = kept,
            window = self.window.len(),
            "Window bootstrapped from history"
        );
        kept
    }

    /// Ingest one sample and recompute forecasts and alerts
    pub fn tick(&mut self, timestamp: DateTime<Utc>, value: f64) -> TickReport {
        let start = Instant::now();

        self.window.append(timestamp, value);
        let output = self.state.tick(&self.window);
        let forecast = output.result;
        let alerts = self
            .analyzer
            .analyze(&forecast.smoothing, &forecast.regression);
        let tick = self.state.tick_counter();

        self.last_fits.clear();
        if let Some(elapsed) = output.timings.smoothing {
            self.metrics
                .observe_fit_latency(ForecastMethod::Smoothing, elapsed.as_secs_f64());
            self.last_fits.push(FitOutcome {
                method: ForecastMethod::Smoothing,
                error: None,
            });
        }
        if let Some(elapsed) = output.timings.regression_fit {
            self.metrics
                .observe_fit_latency(ForecastMethod::Regression, elapsed.as_secs_f64());
            self.last_fits.push(FitOutcome {
                method: ForecastMethod::Regression,
                error: None,
            });
            if forecast.retrained {
                self.metrics.inc_retrains();
                self.logger.log_retrain(
                    &self.name,
                    tick,
                    self.window.len(),
                    elapsed.as_secs_f64(),
                );
            }
        }
        for diagnostic in &forecast.diagnostics {
            self.metrics.inc_fit_failures(diagnostic.method);
            self.logger
                .log_fit_failure(&self.name, diagnostic.method, &diagnostic.message);
            match self
                .last_fits
                .iter_mut()
                .find(|f| f.method == diagnostic.method)
            {
                Some(outcome) => outcome.error = Some(diagnostic.message.clone()),
                None => self.last_fits.push(FitOutcome {
                    method: diagnostic.method,
                    error: Some(diagnostic.message.clone()),
                }),
            }
        }
        if output.surge_detected {
            self.metrics.inc_forced_retrains();
            self.logger.log_forced_retrain(
                &self.name,
                tick,
                output.smoothing_change.unwrap_or_default(),
            );
        }
        for alert in &alerts {
            self.metrics.inc_alerts(alert.level);
            self.logger.log_alert(&self.name, tick, alert);
        }

        self.metrics
            .set_window_samples(&self.name, self.window.len() as i64);
        self.metrics.observe_tick_latency(start.elapsed().as_secs_f64());
        self.logger.log_tick(
            &self.name,
            tick,
            value,
            forecast.smoothing.len(),
            forecast.regression.len(),
            alerts.len(),
            forecast.retrained,
        );

        TickReport {
            metric: self.name.clone(),
            tick,
            sample: Sample::new(timestamp, value),
            forecast,
            alerts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertLevel;
    use chrono::Duration;

    fn ts(i: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap() + Duration::seconds(15 * i)
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = EngineConfig {
            window_capacity: 0,
            ..Default::default()
        };
        assert!(MetricEngine::new("cpu", &config).is_err());
    }

    #[test]
    fn test_first_ticks_have_no_forecast() {
        let mut engine = MetricEngine::new("cpu", &EngineConfig::default()).unwrap();
        for i in 0..4 {
            let report = engine.tick(ts(i), 30.0);
            assert!(report.forecast.is_empty());
            assert!(report.alerts.is_empty());
            assert_eq!(report.tick, (i + 1) as u64);
        }
        assert!(engine.last_fits().is_empty());
    }

    #[test]
    fn test_report_timestamps_follow_last_sample() {
        let mut engine = MetricEngine::new("cpu", &EngineConfig::default()).unwrap();
        engine.bootstrap((0..30).map(|i| Sample::new(ts(i), 40.0 + 3.0 * (i as f64 * 0.7).sin())));

        let report = engine.tick(ts(30), 41.0);
        assert_eq!(report.forecast.timestamps.len(), 20);
        assert_eq!(report.forecast.timestamps[0], ts(30));
        assert_eq!(report.forecast.timestamps[19], ts(49));
        assert_eq!(report.forecast.smoothing[0], 41.0);
        assert_eq!(report.forecast.regression[0], 41.0);
        assert!(report.forecast.retrained);
        assert_eq!(engine.last_fits().len(), 2);
        assert!(engine.last_fits().iter().all(|f| f.error.is_none()));
    }

    #[test]
    fn test_bootstrap_skips_non_finite() {
        let mut engine = MetricEngine::new("cpu", &EngineConfig::default()).unwrap();
        let kept = engine.bootstrap(vec![
            Sample::new(ts(0), 10.0),
            Sample::new(ts(1), f64::NAN),
            Sample::new(ts(2), 12.0),
        ]);
        assert_eq!(kept, 2);
        assert_eq!(engine.window().len(), 2);
        assert_eq!(engine.model_state().tick_counter(), 0);
    }

    #[test]
    fn test_steep_climb_raises_alerts() {
        let mut engine = MetricEngine::new("cpu", &EngineConfig::default()).unwrap();
        engine.bootstrap((0..20).map(|i| Sample::new(ts(i), 20.0 + 3.0 * i as f64)));

        let report = engine.tick(ts(20), 80.0);
        assert!(!report.alerts.is_empty());
        assert_eq!(report.max_level(), Some(AlertLevel::Error));
        assert!(report
            .alerts
            .iter()
            .any(|a| a.message.starts_with("High peak detected")));
        assert!(engine.model_state().retrain_pending());
    }
}
