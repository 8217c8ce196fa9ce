//! Commands talking to a running agent

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::commands::replay::read_samples;
use crate::output::{color_status, print_report, print_success, print_warning, OutputFormat};

/// Row for the metrics table
#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    name: String,
    #[tabled(rename = "Window")]
    window: String,
    #[tabled(rename = "Ticks")]
    ticks: u64,
    #[tabled(rename = "Regression")]
    regression: String,
}

/// Push one sample and show the resulting forecast
pub async fn push_sample(
    client: &ApiClient,
    metric: &str,
    value: f64,
    timestamp: Option<DateTime<Utc>>,
    format: OutputFormat,
) -> Result<()> {
    let report = client.push_sample(metric, value, timestamp).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => print_report(&report),
    }

    Ok(())
}

/// Show the last report of a metric
pub async fn show_report(client: &ApiClient, metric: &str, format: OutputFormat) -> Result<()> {
    let report = client
        .report(metric)
        .await
        .with_context(|| format!("Failed to fetch report for {metric}"))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => print_report(&report),
    }

    Ok(())
}

/// List metrics registered on the agent
pub async fn list_metrics(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let list = client.list_metrics().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&list.metrics)?),
        OutputFormat::Table => {
            if list.metrics.is_empty() {
                print_warning("No metrics registered");
                return Ok(());
            }

            let rows: Vec<MetricRow> = list
                .metrics
                .iter()
                .map(|m| MetricRow {
                    name: m.name.clone(),
                    window: format!("{}/{}", m.samples, m.capacity),
                    ticks: m.ticks,
                    regression: color_status(if m.regression_fitted {
                        "fitted"
                    } else {
                        "warming up"
                    }),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} metrics", list.metrics.len());
        }
    }

    Ok(())
}

/// Seed a metric's window on the agent from a CSV file
pub async fn seed_history(
    client: &ApiClient,
    metric: &str,
    path: &str,
    format: OutputFormat,
) -> Result<()> {
    let samples = read_samples(path)?;
    let response = client.push_history(metric, samples).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        OutputFormat::Table => {
            print_success(&format!(
                "Seeded {} with {} samples",
                response.metric, response.accepted
            ));
            if response.rejected > 0 {
                print_warning(&format!(
                    "{} samples rejected by the agent",
                    response.rejected
                ));
            }
        }
    }

    Ok(())
}
