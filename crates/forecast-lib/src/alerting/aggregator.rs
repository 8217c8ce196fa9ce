//! Finding aggregation
//!
//! Collapses raw findings into at most one alert per detector kind, emitted
//! in the fixed order saturation, ramp, persistent-high, disagreement.

use super::detectors::{Finding, FindingKind};
use crate::config::AlertThresholds;
use crate::models::{Alert, AlertLevel};

const GROUP_ORDER: [FindingKind; 4] = [
    FindingKind::Saturation,
    FindingKind::Ramp,
    FindingKind::PersistentHigh,
    FindingKind::Disagreement,
];

/// Merge findings into user-facing alerts
pub fn aggregate(findings: &[Finding], thresholds: &AlertThresholds) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for kind in GROUP_ORDER {
        let group: Vec<&Finding> = findings.iter().filter(|f| f.kind() == kind).collect();
        if group.is_empty() {
            continue;
        }

        match kind {
            FindingKind::Saturation => alerts.push(saturation_alert(&group, thresholds)),
            FindingKind::Ramp => alerts.push(ramp_alert(&group)),
            FindingKind::PersistentHigh => {
                alerts.push(persistent_high_alert(&group, thresholds))
            }
            FindingKind::Disagreement => {
                alerts.extend(group.iter().filter_map(|f| disagreement_alert(f)))
            }
        }
    }

    alerts
}

/// Error when several methods fired, otherwise the single finding's level
fn merged_level(group: &[&Finding]) -> AlertLevel {
    if group.len() > 1 {
        AlertLevel::Error
    } else {
        group[0].level()
    }
}

fn saturation_alert(group: &[&Finding], thresholds: &AlertThresholds) -> Alert {
    let parts: Vec<String> = group
        .iter()
        .filter_map(|f| match f {
            Finding::Saturation {
                method,
                value,
                seconds,
                ..
            } => Some(format!("{}: {:.1}% in {:.1}s", method.label(), value, seconds)),
            _ => None,
        })
        .collect();

    Alert::new(
        merged_level(group),
        format!(
            "High peak detected above {:.1}% -> {}",
            thresholds.saturation,
            parts.join(" and ")
        ),
    )
}

fn ramp_alert(group: &[&Finding]) -> Alert {
    let parts: Vec<String> = group
        .iter()
        .filter_map(|f| match f {
            Finding::Ramp {
                method,
                total_change,
                ..
            } => Some(format!("{}: {:.1}%", method.label(), total_change)),
            _ => None,
        })
        .collect();

    let level = group
        .iter()
        .map(|f| f.level())
        .max()
        .unwrap_or(AlertLevel::Info);

    Alert::new(
        level,
        format!("Detected increasing ramp -> {}", parts.join(" and ")),
    )
}

fn persistent_high_alert(group: &[&Finding], thresholds: &AlertThresholds) -> Alert {
    let horizon_seconds = group
        .iter()
        .filter_map(|f| match f {
            Finding::PersistentHigh {
                horizon_seconds, ..
            } => Some(*horizon_seconds),
            _ => None,
        })
        .fold(0.0_f64, f64::max);
    let methods: Vec<&str> = group
        .iter()
        .filter_map(|f| f.method())
        .map(|m| m.label())
        .collect();

    Alert::new(
        merged_level(group),
        format!(
            "Persistent high usage >= {:.1}% during the next {:.1}s -> {}",
            thresholds.high_usage,
            horizon_seconds,
            methods.join(" and ")
        ),
    )
}

fn disagreement_alert(finding: &Finding) -> Option<Alert> {
    match finding {
        Finding::Disagreement {
            average,
            horizon_seconds,
        } => Some(Alert::new(
            finding.level(),
            format!(
                "HOLT vs ARIMA average difference is {:.2} over the next {:.1}s",
                average, horizon_seconds
            ),
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ForecastMethod;

    fn saturation(method: ForecastMethod, value: f64, step: usize) -> Finding {
        Finding::Saturation {
            method,
            step,
            value,
            seconds: step as f64 * 15.0,
        }
    }

    #[test]
    fn test_single_saturation_keeps_warning() {
        let findings = vec![saturation(ForecastMethod::Smoothing, 91.0, 2)];
        let alerts = aggregate(&findings, &AlertThresholds::default());

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, AlertLevel::Warning);
        assert_eq!(
            alerts[0].message,
            "High peak detected above 90.0% -> HOLT: 91.0% in 30.0s"
        );
    }

    #[test]
    fn test_dual_saturation_escalates() {
        let findings = vec![
            saturation(ForecastMethod::Smoothing, 91.0, 2),
            saturation(ForecastMethod::Regression, 93.5, 4),
        ];
        let alerts = aggregate(&findings, &AlertThresholds::default());

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, AlertLevel::Error);
        assert!(alerts[0].message.contains("HOLT: 91.0% in 30.0s"));
        assert!(alerts[0].message.contains("ARIMA: 93.5% in 60.0s"));
    }

    #[test]
    fn test_ramp_takes_max_level() {
        let findings = vec![
            Finding::Ramp {
                method: ForecastMethod::Smoothing,
                total_change: 6.0,
                level: AlertLevel::Info,
            },
            Finding::Ramp {
                method: ForecastMethod::Regression,
                total_change: 12.0,
                level: AlertLevel::Warning,
            },
        ];
        let alerts = aggregate(&findings, &AlertThresholds::default());

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, AlertLevel::Warning);
        assert_eq!(
            alerts[0].message,
            "Detected increasing ramp -> HOLT: 6.0% and ARIMA: 12.0%"
        );
    }

    #[test]
    fn test_groups_in_fixed_order() {
        let findings = vec![
            Finding::Disagreement {
                average: 12.0,
                horizon_seconds: 300.0,
            },
            Finding::PersistentHigh {
                method: ForecastMethod::Regression,
                high_steps: 20,
                horizon_seconds: 300.0,
            },
            saturation(ForecastMethod::Regression, 95.0, 1),
        ];
        let alerts = aggregate(&findings, &AlertThresholds::default());

        assert_eq!(alerts.len(), 3);
        assert!(alerts[0].message.starts_with("High peak"));
        assert!(alerts[1].message.starts_with("Persistent high usage >= 80.0%"));
        assert!(alerts[1].message.ends_with("-> ARIMA"));
        assert_eq!(alerts[2].level, AlertLevel::Info);
        assert!(alerts[2].message.contains("12.00"));
    }

    #[test]
    fn test_no_findings_no_alerts() {
        assert!(aggregate(&[], &AlertThresholds::default()).is_empty());
    }
}
