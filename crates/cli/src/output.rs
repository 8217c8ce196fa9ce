//! Output formatting utilities

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use forecast_lib::{Alert, AlertLevel, TickReport};
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Row for the forecast table
#[derive(Tabled)]
struct ForecastRow {
    #[tabled(rename = "Step")]
    step: usize,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "HOLT")]
    smoothing: String,
    #[tabled(rename = "ARIMA")]
    regression: String,
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a utilization value, or a dash when the method has no point
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v),
        None => "-".to_string(),
    }
}

pub fn format_time(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Color an alert level label
pub fn color_level(level: AlertLevel) -> String {
    let label = level.to_string().to_uppercase();
    match level {
        AlertLevel::Info => label.blue().to_string(),
        AlertLevel::Warning => label.yellow().to_string(),
        AlertLevel::Error => label.red().bold().to_string(),
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "fitted" => status.green().to_string(),
        "degraded" | "warming up" => status.yellow().to_string(),
        "unhealthy" => status.red().to_string(),
        _ => status.to_string(),
    }
}

pub fn print_alert(alert: &Alert) {
    println!("  [{}] {}", color_level(alert.level), alert.message);
}

/// Render a tick report as a forecast table followed by its alerts
pub fn print_report(report: &TickReport) {
    println!(
        "{} {} tick {} at {}: {}",
        "Metric".bold(),
        report.metric,
        report.tick,
        format_time(&report.sample.timestamp),
        format_percent(Some(report.sample.value))
    );

    let forecast = &report.forecast;
    if forecast.is_empty() {
        print_warning("Not enough samples for a forecast yet");
    } else {
        let rows: Vec<ForecastRow> = forecast
            .timestamps
            .iter()
            .enumerate()
            .map(|(step, ts)| ForecastRow {
                step,
                time: format_time(ts),
                smoothing: format_percent(forecast.smoothing.get(step).copied()),
                regression: format_percent(forecast.regression.get(step).copied()),
            })
            .collect();

        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{}", table);
        if forecast.retrained {
            print_info("Regression model refit this tick");
        }
    }

    for diagnostic in &forecast.diagnostics {
        print_warning(&diagnostic.message);
    }

    if report.alerts.is_empty() {
        print_success("No alerts");
    } else {
        println!("{}", "Alerts:".bold());
        for alert in &report.alerts {
            print_alert(alert);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(Some(42.345)), "42.3%");
        assert_eq!(format_percent(None), "-");
    }

    #[test]
    fn test_color_level_contains_label() {
        assert!(color_level(AlertLevel::Error).contains("ERROR"));
        assert!(color_level(AlertLevel::Info).contains("INFO"));
    }
}
