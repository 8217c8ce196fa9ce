//! Forecast Agent - per-metric utilization forecasting and alerting
//!
//! Receives samples over HTTP, keeps a sliding window per metric, and
//! answers each sample with fresh forecasts and alerts.

use anyhow::{Context, Result};
use forecast_agent::{api, config};
use forecast_lib::{
    health::HealthRegistry,
    observability::{EngineMetrics, StructuredLogger},
    EngineRegistry,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting forecast-agent");

    let config = config::AgentConfig::load()?;
    info!(
        node_name = %config.node_name,
        window_capacity = config.engine.window_capacity,
        horizon_steps = config.engine.horizon_steps(),
        "Agent configured"
    );

    let health_registry = HealthRegistry::with_threshold(config.engine.unhealthy_after);
    let metrics = EngineMetrics::new();
    let logger = StructuredLogger::new(&config.node_name);

    let engines = Arc::new(
        EngineRegistry::new(config.engine.clone(), health_registry.clone(), logger.clone())
            .context("Failed to build engine registry")?,
    );
    for metric in &config.metrics {
        engines
            .register(metric)
            .await
            .with_context(|| format!("Failed to register metric {metric}"))?;
    }
    logger.log_startup(AGENT_VERSION, engines.len());

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics,
        engines,
    ));

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.listen_port, app_state));

    tokio::select! {
        result = api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server stopped"),
                Ok(Err(e)) => {
                    error!(error = %e, "API server failed");
                    logger.log_shutdown("API server failed");
                    return Err(e);
                }
                Err(e) => {
                    logger.log_shutdown("API task panicked");
                    return Err(e.into());
                }
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
