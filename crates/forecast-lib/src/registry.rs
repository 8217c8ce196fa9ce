//! Registry of metric engines
//!
//! Distinct metrics tick in parallel; ticks of one metric are serialized by
//! the engine's async mutex.

use crate::config::EngineConfig;
use crate::engine::MetricEngine;
use crate::error::ConfigError;
use crate::health::HealthRegistry;
use crate::models::{Sample, TickReport};
use crate::observability::{EngineMetrics, StructuredLogger};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Read-only view of one registered metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub name: String,
    pub samples: usize,
    pub capacity: usize,
    pub ticks: u64,
    pub regression_fitted: bool,
}

/// All metric engines of one process
pub struct EngineRegistry {
    config: EngineConfig,
    engines: DashMap<String, Arc<Mutex<MetricEngine>>>,
    reports: DashMap<String, TickReport>,
    health: HealthRegistry,
    metrics: EngineMetrics,
    logger: StructuredLogger,
}

impl EngineRegistry {
    pub fn new(
        config: EngineConfig,
        health: HealthRegistry,
        logger: StructuredLogger,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            engines: DashMap::new(),
            reports: DashMap::new(),
            health,
            metrics: EngineMetrics::new(),
            logger,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    /// Get the engine for `name`, creating it on first use
    pub async fn register(&self, name: &str) -> Result<Arc<Mutex<MetricEngine>>, ConfigError> {
        if let Some(engine) = self.engines.get(name) {
            return Ok(engine.value().clone());
        }

        let engine = MetricEngine::with_logger(name, &self.config, self.logger.clone())?;
        let engine = self
            .engines
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(engine)))
            .value()
            .clone();

        debug!(metric = %name, "Registered metric engine");
        self.health.register_metric(name).await;
        self.metrics.set_metrics_monitored(self.engines.len() as i64);
        Ok(engine)
    }

    /// Seed a metric's window with history, registering it if needed
    pub async fn bootstrap(&self, name: &str, history: Vec<Sample>) -> Result<usize, ConfigError> {
        let engine = self.register(name).await?;
        let mut engine = engine.lock().await;
        Ok(engine.bootstrap(history))
    }

    /// Run one tick for a metric, registering it if needed
    pub async fn tick(
        &self,
        name: &str,
        timestamp: DateTime<Utc>,
        value: f64,
    ) -> Result<TickReport, ConfigError> {
        let engine = self.register(name).await?;
        // Health and the stored report are updated under the engine lock so
        // they follow tick order.
        let mut engine = engine.lock().await;
        let report = engine.tick(timestamp, value);

        for fit in engine.last_fits() {
            self.health
                .record_fit(name, fit.method, fit.error.as_deref())
                .await;
        }
        self.reports.insert(name.to_string(), report.clone());
        Ok(report)
    }

    /// Most recent report for a metric
    pub fn last_report(&self, name: &str) -> Option<TickReport> {
        self.reports.get(name).map(|r| r.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.engines.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Summaries of every registered metric, sorted by name
    pub async fn list(&self) -> Vec<MetricSummary> {
        let engines: Vec<Arc<Mutex<MetricEngine>>> =
            self.engines.iter().map(|e| e.value().clone()).collect();

        let mut summaries = Vec::with_capacity(engines.len());
        for engine in engines {
            let engine = engine.lock().await;
            summaries.push(MetricSummary {
                name: engine.name().to_string(),
                samples: engine.window().len(),
                capacity: engine.window().capacity(),
                ticks: engine.model_state().tick_counter(),
                regression_fitted: engine.model_state().has_fitted_model(),
            });
        }
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }
}
