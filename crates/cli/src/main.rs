//! Forecast CLI
//!
//! A command-line tool for pushing samples to a forecast agent, reading its
//! forecasts and alerts, and replaying recorded series offline.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use commands::{metrics, replay};

/// Forecast CLI
#[derive(Parser)]
#[command(name = "fcast")]
#[command(author, version, about = "CLI for the Forecast Agent", long_about = None)]
pub struct Cli {
    /// Agent URL (can also be set via FCAST_API_URL env var or ~/.config/fcast/config.json)
    #[arg(long, env = "FCAST_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Push one sample and print the resulting forecast
    Push {
        /// Metric name
        metric: String,

        /// Observed value in [0, 100]
        value: f64,

        /// Sample time (RFC 3339); defaults to now
        #[arg(long)]
        timestamp: Option<DateTime<Utc>>,
    },

    /// Show the last forecast report of a metric
    Report {
        /// Metric name
        metric: String,
    },

    /// List metrics registered on the agent
    Metrics,

    /// Seed a metric's window on the agent from a CSV file
    Seed {
        /// Metric name
        metric: String,

        /// CSV file with `timestamp,value` rows
        file: String,
    },

    /// Replay a CSV series through a local engine without an agent
    Replay {
        /// CSV file with `timestamp,value` rows
        file: String,

        /// Metric name used in reports
        #[arg(long, default_value = "replay")]
        metric: String,

        /// Leading samples loaded as history instead of ticked
        #[arg(long, default_value_t = 0)]
        history: usize,

        /// Sampling interval in seconds
        #[arg(long)]
        interval_secs: Option<u64>,

        /// Forecast horizon in seconds
        #[arg(long)]
        horizon_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{e:#}"));
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let Cli {
        api_url,
        format,
        command,
    } = cli;

    // Replay runs entirely offline
    if let Commands::Replay {
        file,
        metric,
        history,
        interval_secs,
        horizon_secs,
    } = command
    {
        let options = replay::ReplayOptions {
            metric,
            history,
            interval_secs,
            horizon_secs,
        };
        return replay::run_replay(&file, &options, format);
    }

    let api_url = config::Config::load()?.resolve_api_url(api_url);
    let client = client::ApiClient::new(&api_url)?;

    match command {
        Commands::Push {
            metric,
            value,
            timestamp,
        } => {
            metrics::push_sample(&client, &metric, value, timestamp, format).await?;
        }
        Commands::Report { metric } => {
            metrics::show_report(&client, &metric, format).await?;
        }
        Commands::Metrics => {
            metrics::list_metrics(&client, format).await?;
        }
        Commands::Seed { metric, file } => {
            metrics::seed_history(&client, &metric, &file, format).await?;
        }
        Commands::Replay { .. } => {}
    }

    Ok(())
}
