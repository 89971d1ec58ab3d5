//! Pipeline configuration
//!
//! Every constant the reference deployment hard-codes lives here as a
//! named, documented default, injected into the components rather than
//! read from process-wide state.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RecwatchError, Result};
use crate::model::ModelConfig;
use crate::threshold::CalibrationConfig;

/// Top-level configuration for one series-to-metrics run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Sliding-window length.
    #[serde(default = "default_time_steps")]
    pub time_steps: usize,

    /// Leading ground-truth labels dropped before evaluation, aligning
    /// each window with the label at its final index. Defaults to
    /// `time_steps` when unset; a named policy constant so windowing
    /// changes cannot silently desynchronize evaluation.
    #[serde(default)]
    pub label_offset: Option<usize>,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub calibration: CalibrationConfig,
}

fn default_time_steps() -> usize {
    100
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            time_steps: default_time_steps(),
            label_offset: None,
            model: ModelConfig::default(),
            calibration: CalibrationConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// The label-trimming offset actually in force.
    pub fn effective_label_offset(&self) -> usize {
        self.label_offset.unwrap_or(self.time_steps)
    }

    /// Reject parameter combinations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.time_steps == 0 {
            return Err(RecwatchError::InvalidTimeSteps);
        }
        if self.model.channels == 0 {
            return Err(RecwatchError::Config("model.channels must be > 0".into()));
        }
        if self.model.filters.len() != 2 {
            return Err(RecwatchError::Config(format!(
                "filters must name exactly two encoder stage widths, got {}",
                self.model.filters.len()
            )));
        }
        if self.model.kernel_size == 0 || self.model.kernel_size % 2 == 0 {
            return Err(RecwatchError::Config(format!(
                "kernel_size {} must be odd (same padding)",
                self.model.kernel_size
            )));
        }
        if !(0.0..1.0).contains(&self.model.dropout) {
            return Err(RecwatchError::Config(format!(
                "dropout {} outside [0, 1)",
                self.model.dropout
            )));
        }
        if !(0.0..1.0).contains(&self.model.validation_split) {
            return Err(RecwatchError::Config(format!(
                "validation_split {} outside [0, 1)",
                self.model.validation_split
            )));
        }
        if !(0.0..=100.0).contains(&self.calibration.percentile) {
            return Err(RecwatchError::Config(format!(
                "percentile {} outside 0-100",
                self.calibration.percentile
            )));
        }
        Ok(())
    }
}
