//! Forecast detectors
//!
//! Each detector inspects forecast trajectories and emits raw findings. An
//! empty trajectory never produces a finding.

use crate::config::AlertThresholds;
use crate::models::{AlertLevel, ForecastMethod};

/// Detector that produced a finding, in aggregation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FindingKind {
    Saturation,
    Ramp,
    PersistentHigh,
    Disagreement,
}

/// Raw output of a single detector before aggregation
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    /// First step at or above the saturation threshold
    Saturation {
        method: ForecastMethod,
        step: usize,
        value: f64,
        seconds: f64,
    },
    /// Positive change between first and last forecast point
    Ramp {
        method: ForecastMethod,
        total_change: f64,
        level: AlertLevel,
    },
    /// Most of the horizon sits at or above the high-usage threshold
    PersistentHigh {
        method: ForecastMethod,
        high_steps: usize,
        horizon_seconds: f64,
    },
    /// Mean absolute gap between the two trajectories
    Disagreement {
        average: f64,
        horizon_seconds: f64,
    },
}

impl Finding {
    pub fn kind(&self) -> FindingKind {
        match self {
            Finding::Saturation { .. } => FindingKind::Saturation,
            Finding::Ramp { .. } => FindingKind::Ramp,
            Finding::PersistentHigh { .. } => FindingKind::PersistentHigh,
            Finding::Disagreement { .. } => FindingKind::Disagreement,
        }
    }

    pub fn level(&self) -> AlertLevel {
        match self {
            Finding::Saturation { .. } | Finding::PersistentHigh { .. } => AlertLevel::Warning,
            Finding::Ramp { level, .. } => *level,
            Finding::Disagreement { .. } => AlertLevel::Info,
        }
    }

    pub fn method(&self) -> Option<ForecastMethod> {
        match self {
            Finding::Saturation { method, .. }
            | Finding::Ramp { method, .. }
            | Finding::PersistentHigh { method, .. } => Some(*method),
            Finding::Disagreement { .. } => None,
        }
    }
}

/// Flags the first forecast step that reaches saturation
#[derive(Debug, Clone, Copy)]
pub struct SaturationDetector {
    pub threshold: f64,
}

impl SaturationDetector {
    pub fn detect(
        &self,
        method: ForecastMethod,
        trajectory: &[f64],
        step_seconds: f64,
    ) -> Option<Finding> {
        trajectory
            .iter()
            .position(|v| *v >= self.threshold)
            .map(|step| Finding::Saturation {
                method,
                step,
                value: trajectory[step],
                seconds: step as f64 * step_seconds,
            })
    }
}

/// Grades the total rise across the horizon by fixed breakpoints
#[derive(Debug, Clone, Copy)]
pub struct RampDetector {
    pub info: f64,
    pub warning: f64,
    pub error: f64,
}

impl RampDetector {
    pub fn detect(&self, method: ForecastMethod, trajectory: &[f64]) -> Option<Finding> {
        if trajectory.len() < 2 {
            return None;
        }
        let total_change = trajectory[trajectory.len() - 1] - trajectory[0];
        // Decreases never raise a ramp
        if total_change <= 0.0 {
            return None;
        }

        let level = if total_change >= self.error {
            AlertLevel::Error
        } else if total_change >= self.warning {
            AlertLevel::Warning
        } else if total_change >= self.info {
            AlertLevel::Info
        } else {
            return None;
        };

        Some(Finding::Ramp {
            method,
            total_change,
            level,
        })
    }
}

/// Fires when a large share of the horizon stays at or above high usage
#[derive(Debug, Clone, Copy)]
pub struct PersistentHighDetector {
    pub threshold: f64,
    pub fraction: f64,
}

impl PersistentHighDetector {
    pub fn detect(
        &self,
        method: ForecastMethod,
        trajectory: &[f64],
        step_seconds: f64,
    ) -> Option<Finding> {
        if trajectory.is_empty() {
            return None;
        }
        let high_steps = trajectory.iter().filter(|v| **v >= self.threshold).count();
        if (high_steps as f64) < self.fraction * trajectory.len() as f64 {
            return None;
        }
        Some(Finding::PersistentHigh {
            method,
            high_steps,
            horizon_seconds: trajectory.len() as f64 * step_seconds,
        })
    }
}

/// Compares the two methods point by point over their common length
#[derive(Debug, Clone, Copy)]
pub struct DisagreementDetector {
    pub threshold: f64,
}

impl DisagreementDetector {
    pub fn detect(&self, smoothing: &[f64], regression: &[f64], step_seconds: f64) -> Option<Finding> {
        let common = smoothing.len().min(regression.len());
        if common == 0 {
            return None;
        }
        let average = smoothing
            .iter()
            .zip(regression)
            .map(|(s, r)| (s - r).abs())
            .sum::<f64>()
            / common as f64;

        if average >= self.threshold {
            Some(Finding::Disagreement {
                average,
                horizon_seconds: common as f64 * step_seconds,
            })
        } else {
            None
        }
    }
}

/// All detectors configured from one set of thresholds
#[derive(Debug, Clone, Copy)]
pub struct DetectorSet {
    pub saturation: SaturationDetector,
    pub ramp: RampDetector,
    pub persistent_high: PersistentHighDetector,
    pub disagreement: DisagreementDetector,
}

impl DetectorSet {
    pub fn new(thresholds: &AlertThresholds) -> Self {
        Self {
            saturation: SaturationDetector {
                threshold: thresholds.saturation,
            },
            ramp: RampDetector {
                info: thresholds.ramp_info,
                warning: thresholds.ramp_warning,
                error: thresholds.ramp_error,
            },
            persistent_high: PersistentHighDetector {
                threshold: thresholds.high_usage,
                fraction: thresholds.high_usage_fraction,
            },
            disagreement: DisagreementDetector {
                threshold: thresholds.disagreement,
            },
        }
    }

    /// Run every detector; per-method findings first, then the cross-method one
    pub fn run(&self, smoothing: &[f64], regression: &[f64], step_seconds: f64) -> Vec<Finding> {
        let mut findings = Vec::new();

        for (method, trajectory) in [
            (ForecastMethod::Smoothing, smoothing),
            (ForecastMethod::Regression, regression),
        ] {
            findings.extend(self.saturation.detect(method, trajectory, step_seconds));
            findings.extend(self.ramp.detect(method, trajectory));
            findings.extend(self.persistent_high.detect(method, trajectory, step_seconds));
        }
        findings.extend(self.disagreement.detect(smoothing, regression, step_seconds));

        findings
    }
}
