//! Engine configuration
//!
//! Every tunable of the forecasting core lives here with its default. The
//! agent deserializes these structures from its config file/environment,
//! the CLI builds them from flags.

use crate::error::ConfigError;
use crate::forecast::ArimaOrder;
use serde::{Deserialize, Serialize};

/// Default number of samples kept per metric
pub const DEFAULT_WINDOW_CAPACITY: usize = 100;

/// Default sampling interval (seconds)
pub const DEFAULT_SAMPLING_INTERVAL_SECS: u64 = 15;

/// Default forecast horizon (5 minutes)
pub const DEFAULT_FORECAST_HORIZON_SECS: u64 = 5 * 60;

/// Default ticks between regression refits
pub const DEFAULT_RETRAIN_INTERVAL: u64 = 5;

/// Smoothing-trajectory change (percentage points) that forces a regression refit
pub const DEFAULT_SURGE_THRESHOLD: f64 = 15.0;

/// Full configuration of a per-metric forecast engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    #[serde(default = "default_sampling_interval_secs")]
    pub sampling_interval_secs: u64,

    #[serde(default = "default_forecast_horizon_secs")]
    pub forecast_horizon_secs: u64,

    #[serde(default)]
    pub smoothing: SmoothingConfig,

    #[serde(default)]
    pub regression: RegressionConfig,

    #[serde(default)]
    pub thresholds: AlertThresholds,

    /// Consecutive fit failures before a model is reported unhealthy
    #[serde(default = "default_unhealthy_after")]
    pub unhealthy_after: u32,
}

fn default_window_capacity() -> usize {
    DEFAULT_WINDOW_CAPACITY
}

fn default_sampling_interval_secs() -> u64 {
    DEFAULT_SAMPLING_INTERVAL_SECS
}

fn default_forecast_horizon_secs() -> u64 {
    DEFAULT_FORECAST_HORIZON_SECS
}

fn default_unhealthy_after() -> u32 {
    5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            sampling_interval_secs: DEFAULT_SAMPLING_INTERVAL_SECS,
            forecast_horizon_secs: DEFAULT_FORECAST_HORIZON_SECS,
            smoothing: SmoothingConfig::default(),
            regression: RegressionConfig::default(),
            thresholds: AlertThresholds::default(),
            unhealthy_after: default_unhealthy_after(),
        }
    }
}

impl EngineConfig {
    /// Number of forecast steps: horizon divided by the sampling interval
    pub fn horizon_steps(&self) -> usize {
        if self.sampling_interval_secs == 0 {
            return 1;
        }
        ((self.forecast_horizon_secs / self.sampling_interval_secs) as usize).max(1)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.sampling_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.forecast_horizon_secs < self.sampling_interval_secs {
            return Err(ConfigError::HorizonTooShort {
                horizon_secs: self.forecast_horizon_secs,
                interval_secs: self.sampling_interval_secs,
            });
        }
        self.smoothing.validate()?;
        self.regression.validate()?;
        self.thresholds.validate()
    }
}

/// Holt smoothing weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingConfig {
    #[serde(default = "default_level_weight")]
    pub level_weight: f64,

    #[serde(default = "default_trend_weight")]
    pub trend_weight: f64,
}

fn default_level_weight() -> f64 {
    0.8
}

fn default_trend_weight() -> f64 {
    0.2
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            level_weight: default_level_weight(),
            trend_weight: default_trend_weight(),
        }
    }
}

impl SmoothingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("level_weight", self.level_weight),
            ("trend_weight", self.trend_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::WeightOutOfRange { name, value });
            }
        }
        Ok(())
    }
}

/// ARIMA structure and retrain cadence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionConfig {
    #[serde(default)]
    pub order: ArimaOrder,

    #[serde(default = "default_retrain_interval")]
    pub retrain_interval: u64,

    /// Un-anchored smoothing change that schedules a refit on the next tick
    #[serde(default = "default_surge_threshold")]
    pub surge_threshold: f64,
}

fn default_retrain_interval() -> u64 {
    DEFAULT_RETRAIN_INTERVAL
}

fn default_surge_threshold() -> f64 {
    DEFAULT_SURGE_THRESHOLD
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            order: ArimaOrder::default(),
            retrain_interval: DEFAULT_RETRAIN_INTERVAL,
            surge_threshold: DEFAULT_SURGE_THRESHOLD,
        }
    }
}

impl RegressionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.retrain_interval == 0 {
            return Err(ConfigError::ZeroRetrainInterval);
        }
        Ok(())
    }
}

/// Thresholds used by the alert detectors (percent of the metric domain)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    #[serde(default = "default_saturation")]
    pub saturation: f64,

    #[serde(default = "default_ramp_info")]
    pub ramp_info: f64,

    #[serde(default = "default_ramp_warning")]
    pub ramp_warning: f64,

    #[serde(default = "default_ramp_error")]
    pub ramp_error: f64,

    #[serde(default = "default_high_usage")]
    pub high_usage: f64,

    /// Share of the horizon that must sit above `high_usage`
    #[serde(default = "default_high_usage_fraction")]
    pub high_usage_fraction: f64,

    #[serde(default = "default_disagreement")]
    pub disagreement: f64,
}

fn default_saturation() -> f64 {
    90.0
}

fn default_ramp_info() -> f64 {
    5.0
}

fn default_ramp_warning() -> f64 {
    10.0
}

fn default_ramp_error() -> f64 {
    20.0
}

fn default_high_usage() -> f64 {
    80.0
}

fn default_high_usage_fraction() -> f64 {
    0.8
}

fn default_disagreement() -> f64 {
    10.0
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            saturation: default_saturation(),
            ramp_info: default_ramp_info(),
            ramp_warning: default_ramp_warning(),
            ramp_error: default_ramp_error(),
            high_usage: default_high_usage(),
            high_usage_fraction: default_high_usage_fraction(),
            disagreement: default_disagreement(),
        }
    }
}

impl AlertThresholds {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.ramp_info <= self.ramp_warning && self.ramp_warning <= self.ramp_error) {
            return Err(ConfigError::Thresholds(format!(
                "ramp breakpoints must be ordered info <= warning <= error, got {} / {} / {}",
                self.ramp_info, self.ramp_warning, self.ramp_error
            )));
        }
        if !(0.0..=1.0).contains(&self.high_usage_fraction) {
            return Err(ConfigError::Thresholds(format!(
                "high_usage_fraction must lie in [0, 1], got {}",
                self.high_usage_fraction
            )));
        }
        if self.disagreement < 0.0 {
            return Err(ConfigError::Thresholds(format!(
                "disagreement threshold must be non-negative, got {}",
                self.disagreement
            )));
        }
        Ok(())
    }
}
