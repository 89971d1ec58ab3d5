//! Threshold calibration
//!
//! Derives the anomaly decision threshold from the training-set error
//! distribution only: the value at a high percentile of the flattened
//! training errors, plus an additive margin of headroom against noise
//! in the percentile estimate. Test errors never enter calibration.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RecwatchError, Result};
use crate::scoring::ErrorMatrix;

/// Calibration parameters. The defaults reproduce the reference
/// deployment; both are tunable, not universal truths.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Percentile of the flattened training errors (0-100).
    pub percentile: f64,
    /// Additive margin on top of the percentile value.
    pub margin: f32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            percentile: 89.5,
            margin: 0.085,
        }
    }
}

/// The calibrated scalar decision threshold, immutable once derived.
/// Records the parameters that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    value: f32,
    /// `None` for a directly supplied cutoff.
    percentile: Option<f64>,
    margin: f32,
}

impl Threshold {
    /// Calibrate from a training-set error matrix.
    ///
    /// Flattens the matrix across windows and channels, takes the
    /// configured percentile (linear interpolation convention:
    /// rank `p/100 * (n - 1)` over the sorted values), and adds the
    /// margin. Monotonic in the percentile for a fixed margin.
    pub fn calibrate(train_errors: &ErrorMatrix, config: &CalibrationConfig) -> Result<Self> {
        if train_errors.is_empty() {
            return Err(RecwatchError::EmptyErrorMatrix);
        }
        if !(0.0..=100.0).contains(&config.percentile) {
            return Err(RecwatchError::Config(format!(
                "percentile {} outside 0-100",
                config.percentile
            )));
        }

        let mut sorted: Vec<f32> = train_errors.values().to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let value = percentile_linear(&sorted, config.percentile) + config.margin;
        debug!(
            percentile = config.percentile,
            margin = config.margin,
            threshold = value,
            samples = sorted.len(),
            "calibrated threshold"
        );

        Ok(Self {
            value,
            percentile: Some(config.percentile),
            margin: config.margin,
        })
    }

    /// Construct directly, bypassing calibration. Mainly for tests and
    /// for re-running decisions with a known cutoff.
    pub fn fixed(value: f32) -> Self {
        Self {
            value,
            percentile: None,
            margin: 0.0,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Percentile the value was calibrated at, when it was.
    pub fn percentile(&self) -> Option<f64> {
        self.percentile
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }
}

/// Linear-interpolation percentile over pre-sorted values.
fn percentile_linear(sorted: &[f32], p: f64) -> f32 {
    debug_assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }

    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }

    let frac = (rank - lo as f64) as f32;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}
