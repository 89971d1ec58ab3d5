//! Windowed reconstruction-error anomaly detection
//!
//! Detects anomalous intervals in multivariate telemetry: a
//! convolutional autoencoder learns to reconstruct normal fixed-length
//! windows of the series, windows that reconstruct poorly are flagged
//! against a threshold calibrated from the training-error
//! distribution, and the flags are scored against ground-truth labels.
//!
//! # Example
//! ```ignore
//! use recwatch::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::default();
//! let pipeline = Pipeline::new(config)?;
//! let outcome = pipeline.run(&train_series, &test_series, &labels)?;
//!
//! println!("detected {} anomalous windows", outcome.metrics.detected);
//! ```
//!
//! The pipeline is batch-oriented and single-threaded; every stage
//! after training is a pure transform over immutable inputs, so
//! independent runs may execute in parallel without shared state.

pub mod config;
pub mod dataset;
pub mod decision;
pub mod error;
pub mod evaluate;
pub mod model;
pub mod scoring;
pub mod series;
pub mod storage;
pub mod threshold;

use tracing::{debug, info};

pub use config::PipelineConfig;
pub use dataset::{load_labels, load_series, LoadOptions};
pub use decision::Detections;
pub use error::{RecwatchError, Result};
pub use evaluate::{ConfusionMatrix, Metrics};
pub use model::{ConvAutoencoder, ModelConfig, ReconstructionModel, TrainingReport};
pub use scoring::ErrorMatrix;
pub use series::{Series, WindowSet};
pub use threshold::{CalibrationConfig, Threshold};

/// Everything a run exposes to surrounding tooling: the error
/// matrices, the threshold, both flag granularities, the aligned
/// labels, and the metrics. Plain in-memory data, no imposed
/// serialization format.
#[derive(Debug)]
pub struct RunOutcome {
    pub train_errors: ErrorMatrix,
    pub test_errors: ErrorMatrix,
    pub threshold: Threshold,
    pub detections: Detections,
    pub trimmed_labels: Vec<bool>,
    /// `None` when the run used an already-trained model.
    pub report: Option<TrainingReport>,
    pub metrics: Metrics,
}

/// Wires the stages of one series-to-metrics run.
///
/// Stateless apart from its configuration; construct once, run many
/// independent series through it.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Train a fresh autoencoder on `train` and evaluate on `test`.
    pub fn run(&self, train: &Series, test: &Series, labels: &[bool]) -> Result<RunOutcome> {
        let mut model = ConvAutoencoder::new(self.config.model.clone());
        self.run_with_model(&mut model, train, test, labels)
    }

    /// Run with a caller-supplied model. A model that is already
    /// trained (for example, loaded from [`storage`]) skips the
    /// training stage.
    pub fn run_with_model(
        &self,
        model: &mut dyn ReconstructionModel,
        train: &Series,
        test: &Series,
        labels: &[bool],
    ) -> Result<RunOutcome> {
        self.check_inputs(train, test)?;

        // A pretrained model skips the trainer's own width check, so
        // the mismatch must be caught before inference indexes windows.
        if model.channels() != train.channels() {
            return Err(RecwatchError::ChannelWidth {
                expected: model.channels(),
                got: train.channels(),
            });
        }

        let time_steps = self.config.time_steps;
        let train_windows = WindowSet::slide(train, time_steps)?;
        let test_windows = WindowSet::slide(test, time_steps)?;
        debug!(
            train_windows = train_windows.num_windows(),
            test_windows = test_windows.num_windows(),
            time_steps,
            "windowed input series"
        );

        let report = if model.is_trained() {
            info!("model already trained; skipping fit");
            None
        } else {
            Some(model.fit(&train_windows)?)
        };

        let train_errors = ErrorMatrix::score(&train_windows, &model.reconstruct(&train_windows))?;
        let test_errors = ErrorMatrix::score(&test_windows, &model.reconstruct(&test_windows))?;

        // Calibration sees training errors only; test errors must
        // never leak into the threshold.
        let threshold = Threshold::calibrate(&train_errors, &self.config.calibration)?;
        let detections = Detections::decide(&test_errors, &threshold);

        let offset = self.config.effective_label_offset();
        let trimmed = evaluate::trim_labels(labels, offset).to_vec();
        let metrics = Metrics::from_aligned(detections.verdicts(), &trimmed)?;

        info!(
            threshold = threshold.value(),
            detected = metrics.detected,
            actual = metrics.actual,
            correct = metrics.correct,
            "run complete"
        );

        Ok(RunOutcome {
            train_errors,
            test_errors,
            threshold,
            detections,
            trimmed_labels: trimmed,
            report,
            metrics,
        })
    }

    fn check_inputs(&self, train: &Series, test: &Series) -> Result<()> {
        if train.channels() != test.channels() {
            return Err(RecwatchError::ChannelMismatch {
                train: train.channels(),
                test: test.channels(),
            });
        }
        if train.len() < self.config.time_steps {
            return Err(RecwatchError::SeriesTooShort {
                len: train.len(),
                time_steps: self.config.time_steps,
            });
        }
        Ok(())
    }
}
