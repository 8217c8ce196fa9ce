//! Error types for model fitting and configuration

use thiserror::Error;

/// Tagged failure of a single fit or forecast attempt.
///
/// Never fatal: the engine turns it into an empty trajectory for the tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("degenerate series: {0}")]
    Degenerate(String),

    #[error("non-finite value in {0}")]
    NonFinite(&'static str),

    #[error("invalid model parameter: {0}")]
    InvalidParameter(String),
}

/// Rejected engine configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("window capacity must be at least 1")]
    ZeroCapacity,

    #[error("sampling interval must be greater than zero")]
    ZeroInterval,

    #[error("forecast horizon {horizon_secs}s is shorter than one sampling interval {interval_secs}s")]
    HorizonTooShort { horizon_secs: u64, interval_secs: u64 },

    #[error("{name} must lie in [0, 1], got {value}")]
    WeightOutOfRange { name: &'static str, value: f64 },

    #[error("retrain interval must be at least 1 tick")]
    ZeroRetrainInterval,

    #[error("invalid alert thresholds: {0}")]
    Thresholds(String),
}
