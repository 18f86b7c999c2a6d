//! Sliding sample window feeding the vitals estimator.
//!
//! The estimator needs a fixed-length view of the most recent pulse samples.
//! The window is a true sliding window: it is never cleared after a
//! computation, each new sample just shifts it by one.

use crate::sensor::PulseSample;
use std::collections::VecDeque;

/// Number of pulse samples the estimator consumes per computation.
pub const WINDOW_CAPACITY: usize = 100;

/// Fixed-capacity FIFO of pulse samples; the oldest sample is evicted once
/// capacity is exceeded.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<PulseSample>,
    capacity: usize,
}

impl SampleWindow {
    pub fn new() -> Self {
        Self::with_capacity(WINDOW_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest one past capacity.
    pub fn push(&mut self, sample: PulseSample) {
        self.samples.push_back(sample);
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// True only once the window holds exactly `capacity` samples.
    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Infrared intensities, oldest first.
    pub fn ir(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.ir as f64)
    }

    /// Red intensities, oldest first.
    pub fn red(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.red as f64)
    }
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new()
    }
}
