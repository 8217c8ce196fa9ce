//! Dual-model forecasting
//!
//! - Holt double exponential smoothing, refit from the full window every tick
//! - ARIMA(p, d, q), refit on a tick cadence and reused in between
//! - Per-metric model state tying both together

mod arima;
mod holt;
mod linalg;
mod producer;

pub use arima::{ArimaFit, ArimaModel, ArimaOrder};
pub use holt::{HoltFit, HoltModel, MIN_SMOOTHING_SAMPLES};
pub use linalg::{difference, least_squares};
pub use producer::{
    anchor_and_clip, FitTimings, ModelState, ProducerOutput, DOMAIN_MAX, DOMAIN_MIN,
};
