//! Core data models for the forecast engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single observed metric sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Forecasting method that produced a trajectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    /// Holt double exponential smoothing, refit every tick
    Smoothing,
    /// ARIMA(p,d,q), refit on the retrain cadence
    Regression,
}

impl ForecastMethod {
    /// Short upper-case label used in alert messages
    pub fn label(&self) -> &'static str {
        match self {
            ForecastMethod::Smoothing => "HOLT",
            ForecastMethod::Regression => "ARIMA",
        }
    }
}

impl std::fmt::Display for ForecastMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForecastMethod::Smoothing => write!(f, "smoothing"),
            ForecastMethod::Regression => write!(f, "regression"),
        }
    }
}

/// A fit failure surfaced to the operator for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDiagnostic {
    pub method: ForecastMethod,
    pub message: String,
}

/// Both forecast trajectories produced in one tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    /// Holt trajectory, empty if not enough samples or the fit failed
    pub smoothing: Vec<f64>,
    /// ARIMA trajectory, empty if not enough samples or the fit failed
    pub regression: Vec<f64>,
    /// One timestamp per horizon step, starting at the last observed sample
    pub timestamps: Vec<DateTime<Utc>>,
    /// Whether the regression model was refit this tick
    pub retrained: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<ModelDiagnostic>,
}

impl ForecastResult {
    pub fn trajectory(&self, method: ForecastMethod) -> &[f64] {
        match method {
            ForecastMethod::Smoothing => &self.smoothing,
            ForecastMethod::Regression => &self.regression,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.smoothing.is_empty() && self.regression.is_empty()
    }
}

/// Alert severity, ordered info < warning < error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Info => write!(f, "info"),
            AlertLevel::Warning => write!(f, "warning"),
            AlertLevel::Error => write!(f, "error"),
        }
    }
}

/// Aggregated, user-facing alert for one detector type in one tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
}

impl Alert {
    pub fn new(level: AlertLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Everything a single engine tick hands back to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickReport {
    pub metric: String,
    pub tick: u64,
    pub sample: Sample,
    pub forecast: ForecastResult,
    pub alerts: Vec<Alert>,
}

impl TickReport {
    /// Highest alert level raised this tick, if any
    pub fn max_level(&self) -> Option<AlertLevel> {
        self.alerts.iter().map(|a| a.level).max()
    }
}
