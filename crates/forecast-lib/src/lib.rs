//! Forecasting and alerting core for bounded utilization metrics
//!
//! This crate provides the core functionality for:
//! - A bounded sample window per metric
//! - Holt smoothing and ARIMA regression forecasts with a retrain cadence
//! - Alert derivation from both forecast trajectories
//! - A per-metric engine loop and a registry for many metrics
//! - Health checks and observability

pub mod alerting;
pub mod config;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod health;
pub mod models;
pub mod observability;
pub mod registry;
pub mod window;

pub use alerting::AlertAnalyzer;
pub use config::{AlertThresholds, EngineConfig, RegressionConfig, SmoothingConfig};
pub use engine::{FitOutcome, MetricEngine};
pub use error::{ConfigError, FitError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
pub use registry::{EngineRegistry, MetricSummary};
pub use window::SampleWindow;
