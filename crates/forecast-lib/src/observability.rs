//! Observability infrastructure for the forecast engine
//!
//! Provides:
//! - Prometheus metrics (tick latency, fit latency, retrains, fit failures, alerts)
//! - Structured JSON logging with tracing

use crate::models::{Alert, AlertLevel, ForecastMethod};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    register_int_gauge_vec, Histogram, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{debug, error, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    tick_latency_seconds: Histogram,
    smoothing_fit_latency_seconds: Histogram,
    regression_fit_latency_seconds: Histogram,
    regression_retrains: IntCounter,
    forced_retrains: IntCounter,
    fit_failures: IntCounterVec,
    alerts_raised: IntCounterVec,
    metrics_monitored: IntGauge,
    window_samples: IntGaugeVec,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            tick_latency_seconds: register_histogram!(
                "forecast_engine_tick_latency_seconds",
                "Time spent running one engine tick",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register tick_latency_seconds"),

            smoothing_fit_latency_seconds: register_histogram!(
                "forecast_engine_smoothing_fit_latency_seconds",
                "Time spent fitting the Holt smoothing model",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register smoothing_fit_latency_seconds"),

            regression_fit_latency_seconds: register_histogram!(
                "forecast_engine_regression_fit_latency_seconds",
                "Time spent refitting the ARIMA regression model",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register regression_fit_latency_seconds"),

            regression_retrains: register_int_counter!(
                "forecast_engine_regression_retrains_total",
                "Total number of successful regression refits"
            )
            .expect("Failed to register regression_retrains"),

            forced_retrains: register_int_counter!(
                "forecast_engine_forced_retrains_total",
                "Total number of retrains scheduled by a smoothing surge"
            )
            .expect("Failed to register forced_retrains"),

            fit_failures: register_int_counter_vec!(
                "forecast_engine_fit_failures_total",
                "Total number of failed model fits",
                &["method"]
            )
            .expect("Failed to register fit_failures"),

            alerts_raised: register_int_counter_vec!(
                "forecast_engine_alerts_total",
                "Total number of alerts raised",
                &["level"]
            )
            .expect("Failed to register alerts_raised"),

            metrics_monitored: register_int_gauge!(
                "forecast_engine_metrics_monitored",
                "Number of metrics currently being forecast"
            )
            .expect("Failed to register metrics_monitored"),

            window_samples: register_int_gauge_vec!(
                "forecast_engine_window_samples",
                "Number of samples held in a metric's window",
                &["metric"]
            )
            .expect("Failed to register window_samples"),
        }
    }
}

/// Engine metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new)
    }

    pub fn observe_tick_latency(&self, duration_secs: f64) {
        self.inner().tick_latency_seconds.observe(duration_secs);
    }

    pub fn observe_fit_latency(&self, method: ForecastMethod, duration_secs: f64) {
        match method {
            ForecastMethod::Smoothing => self
                .inner()
                .smoothing_fit_latency_seconds
                .observe(duration_secs),
            ForecastMethod::Regression => self
                .inner()
                .regression_fit_latency_seconds
                .observe(duration_secs),
        }
    }

    pub fn inc_retrains(&self) {
        self.inner().regression_retrains.inc();
    }

    pub fn inc_forced_retrains(&self) {
        self.inner().forced_retrains.inc();
    }

    pub fn inc_fit_failures(&self, method: ForecastMethod) {
        self.inner()
            .fit_failures
            .with_label_values(&[&method.to_string()])
            .inc();
    }

    pub fn inc_alerts(&self, level: AlertLevel) {
        self.inner()
            .alerts_raised
            .with_label_values(&[&level.to_string()])
            .inc();
    }

    pub fn set_metrics_monitored(&self, count: i64) {
        self.inner().metrics_monitored.set(count);
    }

    pub fn set_window_samples(&self, metric: &str, samples: i64) {
        self.inner()
            .window_samples
            .with_label_values(&[metric])
            .set(samples);
    }
}

/// Structured logger for engine events
///
/// Every record carries an `event` field so downstream log pipelines can
/// filter without parsing messages.
#[derive(Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn log_tick(
        &self,
        metric: &str,
        tick: u64,
        value: f64,
        smoothing_points: usize,
        regression_points: usize,
        alerts: usize,
        retrained: bool,
    ) {
        debug!(
            event = "tick_completed",
            node = %self.node_name,
            metric = %metric,
            tick = tick,
            value = value,
            smoothing_points = smoothing_points,
            regression_points = regression_points,
            alerts = alerts,
            retrained = retrained,
            "Forecast tick completed"
        );
    }

    pub fn log_alert(&self, metric: &str, tick: u64, alert: &Alert) {
        match alert.level {
            AlertLevel::Error => {
                error!(
                    event = "alert_raised",
                    node = %self.node_name,
                    metric = %metric,
                    tick = tick,
                    level = %alert.level,
                    message = %alert.message,
                    "Forecast alert raised"
                );
            }
            AlertLevel::Warning => {
                warn!(
                    event = "alert_raised",
                    node = %self.node_name,
                    metric = %metric,
                    tick = tick,
                    level = %alert.level,
                    message = %alert.message,
                    "Forecast alert raised"
                );
            }
            AlertLevel::Info => {
                info!(
                    event = "alert_raised",
                    node = %self.node_name,
                    metric = %metric,
                    tick = tick,
                    level = %alert.level,
                    message = %alert.message,
                    "Forecast alert raised"
                );
            }
        }
    }

    /// Fit failures are diagnostics, never alerts
    pub fn log_fit_failure(&self, metric: &str, method: ForecastMethod, details: &str) {
        warn!(
            event = "model_fit_failed",
            node = %self.node_name,
            metric = %metric,
            method = %method,
            details = %details,
            "Model fit failed, trajectory empty for this tick"
        );
    }

    pub fn log_retrain(&self, metric: &str, tick: u64, samples: usize, fit_secs: f64) {
        info!(
            event = "regression_retrained",
            node = %self.node_name,
            metric = %metric,
            tick = tick,
            samples = samples,
            fit_secs = fit_secs,
            "Regression model refit"
        );
    }

    pub fn log_forced_retrain(&self, metric: &str, tick: u64, projected_change: f64) {
        info!(
            event = "forced_retrain_scheduled",
            node = %self.node_name,
            metric = %metric,
            tick = tick,
            projected_change = projected_change,
            "Smoothing surge, regression refit scheduled for next tick"
        );
    }

    pub fn log_startup(&self, version: &str, metrics: usize) {
        info!(
            event = "agent_started",
            node = %self.node_name,
            agent_version = %version,
            metrics = metrics,
            "Forecast agent started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Forecast agent shutting down"
        );
    }
}
