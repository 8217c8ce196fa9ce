//! Agent configuration

use anyhow::{Context, Result};
use forecast_lib::EngineConfig;
use serde::Deserialize;
use std::path::Path;

/// Environment variable naming the optional config file
pub const CONFIG_PATH_ENV: &str = "FORECAST_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "forecast-agent.toml";

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Node name attached to every structured log record
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// API server port for the forecast API, health and metrics
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Metrics registered at startup, before any sample arrives
    #[serde(default)]
    pub metrics: Vec<String>,

    /// Forecasting and alerting parameters
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_node_name() -> String {
    std::env::var("NODE_NAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_listen_port() -> u16 {
    8080
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            node_name: default_node_name(),
            listen_port: default_listen_port(),
            metrics: Vec::new(),
            engine: EngineConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from the optional config file and environment
    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    /// Load from `path` (if it exists) layered under `FORECAST__*` variables
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("FORECAST")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("metrics")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

        let agent: AgentConfig = config
            .try_deserialize()
            .context("Invalid agent configuration")?;
        agent
            .engine
            .validate()
            .context("Invalid engine configuration")?;

        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AgentConfig::load_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.listen_port, 8080);
        assert!(config.metrics.is_empty());
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_file_overrides_nested_engine() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
node_name = "edge-1"
listen_port = 9100
metrics = ["cpu", "memory"]

[engine]
window_capacity = 50
sampling_interval_secs = 10

[engine.regression]
retrain_interval = 3

[engine.thresholds]
saturation = 95.0
"#
        )
        .unwrap();

        let config = AgentConfig::load_from(file.path()).unwrap();
        assert_eq!(config.node_name, "edge-1");
        assert_eq!(config.listen_port, 9100);
        assert_eq!(config.metrics, vec!["cpu", "memory"]);
        assert_eq!(config.engine.window_capacity, 50);
        assert_eq!(config.engine.horizon_steps(), 30);
        assert_eq!(config.engine.regression.retrain_interval, 3);
        assert_eq!(config.engine.thresholds.saturation, 95.0);
        // Untouched fields keep their defaults
        assert_eq!(config.engine.smoothing.level_weight, 0.8);
        assert_eq!(config.engine.thresholds.high_usage, 80.0);
    }

    #[test]
    fn test_invalid_engine_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[engine]\nwindow_capacity = 0").unwrap();

        assert!(AgentConfig::load_from(file.path()).is_err());
    }
}
