//! Forecast agent: HTTP surface over the forecasting engine

pub mod api;
pub mod config;
