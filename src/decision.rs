//! Anomaly decision
//!
//! Applies the calibrated threshold to a test-set error matrix. A
//! channel flag fires on strict exceedance; a window verdict is the OR
//! across its channels, so one offending channel anomalizes the window.

use serde::{Deserialize, Serialize};

use crate::scoring::ErrorMatrix;
use crate::threshold::Threshold;

/// Per-channel flags and collapsed per-window verdicts. A pure
/// function of the error matrix and threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detections {
    channel_flags: Vec<bool>,
    verdicts: Vec<bool>,
    channels: usize,
}

impl Detections {
    /// Flag every `error[w][c] > threshold`, then collapse each window
    /// to a single boolean verdict.
    pub fn decide(errors: &ErrorMatrix, threshold: &Threshold) -> Self {
        let channels = errors.channels();
        let cutoff = threshold.value();

        let channel_flags: Vec<bool> = errors.values().iter().map(|&e| e > cutoff).collect();
        let verdicts: Vec<bool> = channel_flags
            .chunks(channels.max(1))
            .map(|window| window.iter().any(|&f| f))
            .collect();

        Self {
            channel_flags,
            verdicts,
            channels,
        }
    }

    /// One boolean per window.
    pub fn verdicts(&self) -> &[bool] {
        &self.verdicts
    }

    /// Flag for channel `c` of window `w`.
    pub fn channel_flag(&self, w: usize, c: usize) -> bool {
        self.channel_flags[w * self.channels + c]
    }

    pub fn num_windows(&self) -> usize {
        self.verdicts.len()
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of windows flagged anomalous.
    pub fn count(&self) -> usize {
        self.verdicts.iter().filter(|&&v| v).count()
    }

    /// Indices of flagged windows, in order.
    pub fn flagged_windows(&self) -> Vec<usize> {
        self.verdicts
            .iter()
            .enumerate()
            .filter(|(_, &v)| v)
            .map(|(i, _)| i)
            .collect()
    }
}
