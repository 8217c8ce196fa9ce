//! Alert derivation from forecast trajectories
//!
//! This module provides:
//! - Per-method detectors (saturation, ramp, persistent high usage)
//! - A cross-method disagreement detector
//! - Aggregation of raw findings into one leveled alert per detector kind

mod aggregator;
mod detectors;

pub use aggregator::aggregate;
pub use detectors::{
    DetectorSet, DisagreementDetector, Finding, FindingKind, PersistentHighDetector,
    RampDetector, SaturationDetector,
};

use crate::config::AlertThresholds;
use crate::models::Alert;

/// Stateless analyzer turning two trajectories into alerts
#[derive(Debug, Clone)]
pub struct AlertAnalyzer {
    thresholds: AlertThresholds,
    detectors: DetectorSet,
    step_seconds: f64,
}

impl AlertAnalyzer {
    pub fn new(thresholds: AlertThresholds, step_seconds: f64) -> Self {
        let detectors = DetectorSet::new(&thresholds);
        Self {
            thresholds,
            detectors,
            step_seconds,
        }
    }

    /// Raw findings before aggregation
    pub fn findings(&self, smoothing: &[f64], regression: &[f64]) -> Vec<Finding> {
        self.detectors.run(smoothing, regression, self.step_seconds)
    }

    pub fn analyze(&self, smoothing: &[f64], regression: &[f64]) -> Vec<Alert> {
        aggregate(&self.findings(smoothing, regression), &self.thresholds)
    }
}
