//! Fixed-capacity sample window
//!
//! Ring buffer of the most recent samples for one metric. Appending at
//! capacity evicts the oldest sample first.

use crate::error::ConfigError;
use crate::models::Sample;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Bounded, time-ordered buffer of recent samples
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SampleWindow {
    /// Create an empty window; capacity must be at least 1
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Append a sample, evicting the oldest one when full
    pub fn append(&mut self, timestamp: DateTime<Utc>, value: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(Sample::new(timestamp, value));
    }

    /// Append a batch of historical samples in order
    pub fn extend<I>(&mut self, history: I)
    where
        I: IntoIterator<Item = Sample>,
    {
        for sample in history {
            self.append(sample.timestamp, sample.value);
        }
    }

    /// Ordered values, oldest first
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    /// Ordered timestamps, oldest first
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.samples.iter().map(|s| s.timestamp).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Most recent sample
    pub fn last(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
