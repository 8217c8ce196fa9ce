//! CLI integration tests

use std::io::Write;
use std::process::Command;

fn fcast() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_fcast"));
    cmd.env_remove("FCAST_API_URL");
    cmd
}

fn climbing_csv(rows: usize) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "timestamp,value").unwrap();
    for i in 0..rows {
        writeln!(file, "{},{:.1}", 1_709_287_200 + i * 15, 20.0 + 2.5 * i as f64).unwrap();
    }
    file
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = fcast().arg("--help").output().expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Forecast Agent"), "Should show app name");
    assert!(stdout.contains("push"), "Should show push command");
    assert!(stdout.contains("report"), "Should show report command");
    assert!(stdout.contains("metrics"), "Should show metrics command");
    assert!(stdout.contains("seed"), "Should show seed command");
    assert!(stdout.contains("replay"), "Should show replay command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = fcast()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("fcast"), "Should show binary name");
}

/// Test replay subcommand help
#[test]
fn test_replay_help() {
    let output = fcast()
        .args(["replay", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Replay help should succeed");
    assert!(stdout.contains("--metric"), "Should show metric option");
    assert!(stdout.contains("--history"), "Should show history option");
    assert!(
        stdout.contains("--interval-secs"),
        "Should show interval option"
    );
}

/// Test push requires a value
#[test]
fn test_push_requires_value() {
    let output = fcast()
        .args(["push", "cpu"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Push without value should fail");
}

/// Test invalid output format is rejected
#[test]
fn test_invalid_format() {
    let output = fcast()
        .args(["--format", "yaml", "metrics"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Unknown format should fail");
}

/// Test offline replay with JSON output
#[test]
fn test_replay_json_output() {
    let csv = climbing_csv(30);

    let output = fcast()
        .args(["--format", "json", "replay", "--metric", "cpu", "--history", "10"])
        .arg(csv.path())
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Replay should succeed");

    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Replay JSON should parse");
    assert_eq!(summary["metric"], "cpu");
    assert_eq!(summary["ticks"], 20);
    assert_eq!(summary["skipped"], 0);
    assert!(!summary["alerts"].as_array().unwrap().is_empty());
    assert_eq!(
        summary["last_report"]["forecast"]["smoothing"]
            .as_array()
            .unwrap()
            .len(),
        20
    );
}

/// Test replay table output lists alerts and the forecast
#[test]
fn test_replay_table_output() {
    let csv = climbing_csv(25);

    let output = fcast()
        .arg("replay")
        .arg(csv.path())
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Replay should succeed");
    assert!(stdout.contains("Replayed 25 ticks"));
    assert!(stdout.contains("HOLT"));
    assert!(stdout.contains("Detected increasing ramp"));
}

/// Test replay reports the offending line of a malformed file
#[test]
fn test_replay_malformed_file() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "1709287200,10\n1709287215,abc").unwrap();

    let output = fcast()
        .arg("replay")
        .arg(file.path())
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Malformed replay should fail");
    assert!(stderr.contains("line 2"), "Should name the bad line");
}

/// Test replay of a missing file fails cleanly
#[test]
fn test_replay_missing_file() {
    let output = fcast()
        .args(["replay", "/nonexistent/series.csv"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read"));
}
