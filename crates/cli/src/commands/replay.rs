//! Offline replay of a recorded series through the forecast engine
//!
//! Input is CSV with `timestamp,value` rows. Timestamps are unix seconds or
//! RFC 3339. Blank lines, `#` comments and a header row are ignored.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use forecast_lib::{
    forecast::{DOMAIN_MAX, DOMAIN_MIN},
    AlertLevel, EngineConfig, MetricEngine, Sample, TickReport,
};
use serde::Serialize;
use thiserror::Error;

use crate::output::{color_level, format_time, print_info, print_report, print_warning, OutputFormat};

#[derive(Debug, Error, PartialEq)]
pub enum ReplayError {
    #[error("line {line}: expected `timestamp,value`")]
    MissingField { line: usize },

    #[error("line {line}: invalid timestamp '{value}'")]
    InvalidTimestamp { line: usize, value: String },

    #[error("line {line}: invalid value '{value}'")]
    InvalidValue { line: usize, value: String },
}

/// Options for one replay run
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub metric: String,
    /// Leading samples loaded as history instead of ticked
    pub history: usize,
    pub interval_secs: Option<u64>,
    pub horizon_secs: Option<u64>,
}

/// One alert raised during replay
#[derive(Debug, Clone, Serialize)]
pub struct ReplayAlert {
    pub tick: u64,
    pub timestamp: DateTime<Utc>,
    pub level: AlertLevel,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    pub metric: String,
    pub ticks: u64,
    pub skipped: usize,
    pub alerts: Vec<ReplayAlert>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_report: Option<TickReport>,
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(secs) = raw.parse::<i64>() {
        return Utc.timestamp_opt(secs, 0).single();
    }
    if let Ok(secs) = raw.parse::<f64>() {
        if secs.is_finite() {
            let whole = secs.trunc() as i64;
            let nanos = ((secs - secs.trunc()) * 1e9).round() as u32;
            return Utc.timestamp_opt(whole, nanos).single();
        }
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Parse CSV content into samples in file order
pub fn parse_samples(content: &str) -> Result<Vec<Sample>, ReplayError> {
    let mut samples = Vec::new();

    for (idx, raw_line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.splitn(2, ',').map(str::trim);
        let (Some(ts_raw), Some(value_raw)) = (fields.next(), fields.next()) else {
            return Err(ReplayError::MissingField { line: line_no });
        };

        let Some(timestamp) = parse_timestamp(ts_raw) else {
            // Header row
            if samples.is_empty() && ts_raw.eq_ignore_ascii_case("timestamp") {
                continue;
            }
            return Err(ReplayError::InvalidTimestamp {
                line: line_no,
                value: ts_raw.to_string(),
            });
        };
        let value = value_raw
            .parse::<f64>()
            .map_err(|_| ReplayError::InvalidValue {
                line: line_no,
                value: value_raw.to_string(),
            })?;

        samples.push(Sample::new(timestamp, value));
    }

    Ok(samples)
}

/// Read and parse a CSV file
pub fn read_samples(path: &str) -> Result<Vec<Sample>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    parse_samples(&content).with_context(|| format!("Failed to parse {path}"))
}

/// Run every sample through a local engine, mirroring the agent's validation
pub fn replay(samples: Vec<Sample>, options: &ReplayOptions) -> Result<ReplaySummary> {
    let mut config = EngineConfig::default();
    if let Some(interval) = options.interval_secs {
        config.sampling_interval_secs = interval;
    }
    if let Some(horizon) = options.horizon_secs {
        config.forecast_horizon_secs = horizon;
    }

    let mut engine =
        MetricEngine::new(&options.metric, &config).context("Invalid replay configuration")?;

    let (valid, skipped): (Vec<Sample>, Vec<Sample>) = samples
        .into_iter()
        .partition(|s| s.value.is_finite() && (DOMAIN_MIN..=DOMAIN_MAX).contains(&s.value));

    let split = options.history.min(valid.len());
    let (history, live) = valid.split_at(split);
    engine.bootstrap(history.iter().copied());

    let mut alerts = Vec::new();
    let mut last_report = None;
    for sample in live {
        let report = engine.tick(sample.timestamp, sample.value);
        alerts.extend(report.alerts.iter().map(|a| ReplayAlert {
            tick: report.tick,
            timestamp: sample.timestamp,
            level: a.level,
            message: a.message.clone(),
        }));
        last_report = Some(report);
    }

    Ok(ReplaySummary {
        metric: options.metric.clone(),
        ticks: engine.model_state().tick_counter(),
        skipped: skipped.len(),
        alerts,
        last_report,
    })
}

/// `fcast replay` entry point
pub fn run_replay(path: &str, options: &ReplayOptions, format: OutputFormat) -> Result<()> {
    let samples = read_samples(path)?;
    let summary = replay(samples, options)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Table => {
            print_info(&format!(
                "Replayed {} ticks of {}",
                summary.ticks, summary.metric
            ));
            if summary.skipped > 0 {
                print_warning(&format!(
                    "Skipped {} samples outside [{DOMAIN_MIN}, {DOMAIN_MAX}]",
                    summary.skipped
                ));
            }
            for alert in &summary.alerts {
                println!(
                    "#{:<5} {}  [{}] {}",
                    alert.tick,
                    format_time(&alert.timestamp),
                    color_level(alert.level),
                    alert.message
                );
            }
            if let Some(report) = &summary.last_report {
                println!();
                print_report(report);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(history: usize) -> ReplayOptions {
        ReplayOptions {
            metric: "cpu".to_string(),
            history,
            interval_secs: None,
            horizon_secs: None,
        }
    }

    #[test]
    fn test_parse_mixed_timestamps() {
        let content = "timestamp,value\n\
                       # recorded on node-3\n\
                       1709287200,12.5\n\
                       \n\
                       2024-03-01T10:00:15Z, 13.0\n\
                       1709287230.5,14\n";
        let samples = parse_samples(content).unwrap();

        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].timestamp.to_rfc3339(), "2024-03-01T10:00:00+00:00");
        assert_eq!(samples[1].value, 13.0);
        assert_eq!(samples[2].timestamp.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_parse_errors_name_the_line() {
        assert_eq!(
            parse_samples("1709287200,1.0\n1709287215\n"),
            Err(ReplayError::MissingField { line: 2 })
        );
        assert_eq!(
            parse_samples("yesterday,1.0\n"),
            Err(ReplayError::InvalidTimestamp {
                line: 1,
                value: "yesterday".to_string()
            })
        );
        assert_eq!(
            parse_samples("1709287200,lots\n"),
            Err(ReplayError::InvalidValue {
                line: 1,
                value: "lots".to_string()
            })
        );
    }

    #[test]
    fn test_replay_ticks_live_samples_only() {
        let samples: Vec<Sample> = (0..30)
            .map(|i| {
                Sample::new(
                    Utc.timestamp_opt(1_709_287_200 + i * 15, 0).unwrap(),
                    40.0 + 2.0 * ((i as f64) * 0.5).sin(),
                )
            })
            .collect();

        let summary = replay(samples, &options(20)).unwrap();
        assert_eq!(summary.ticks, 10);
        assert_eq!(summary.skipped, 0);

        let report = summary.last_report.unwrap();
        assert_eq!(report.forecast.smoothing.len(), 20);
        assert_eq!(report.forecast.regression.len(), 20);
    }

    #[test]
    fn test_replay_skips_out_of_domain() {
        let ts = |i: i64| Utc.timestamp_opt(1_709_287_200 + i * 15, 0).unwrap();
        let samples = vec![
            Sample::new(ts(0), 10.0),
            Sample::new(ts(1), 180.0),
            Sample::new(ts(2), f64::NAN),
            Sample::new(ts(3), 12.0),
        ];

        let summary = replay(samples, &options(0)).unwrap();
        assert_eq!(summary.ticks, 2);
        assert_eq!(summary.skipped, 2);
        assert!(summary.alerts.is_empty());
    }

    #[test]
    fn test_replay_collects_alerts_from_climb() {
        let samples: Vec<Sample> = (0..25)
            .map(|i| {
                Sample::new(
                    Utc.timestamp_opt(1_709_287_200 + i * 15, 0).unwrap(),
                    10.0 + 3.0 * i as f64,
                )
            })
            .collect();

        let summary = replay(samples, &options(5)).unwrap();
        assert!(summary
            .alerts
            .iter()
            .any(|a| a.level == AlertLevel::Error && a.message.contains("ramp")));
    }

    #[test]
    fn test_replay_rejects_bad_interval() {
        let opts = ReplayOptions {
            interval_secs: Some(0),
            ..options(0)
        };
        assert!(replay(Vec::new(), &opts).is_err());
    }
}
