//! Reconstruction models
//!
//! The pipeline only requires a model that can learn to reconstruct
//! normal windows and reproduce a window shape at inference time; the
//! convolutional autoencoder is one such strategy behind the
//! [`ReconstructionModel`] seam.

pub mod autoencoder;
pub mod layers;
pub mod trainer;

pub use autoencoder::ConvAutoencoder;
pub use trainer::{Trainer, TrainingReport};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::series::WindowSet;

/// Capability interface for reconstruction-error strategies.
///
/// `reconstruct` must be deterministic given fixed weights and
/// preserve the input shape; `fit` must fail fast on an empty window
/// set rather than silently training on nothing.
pub trait ReconstructionModel {
    /// Train on normal windows.
    fn fit(&mut self, windows: &WindowSet) -> Result<TrainingReport>;

    /// Reconstruct every window in the set.
    fn reconstruct(&self, windows: &WindowSet) -> WindowSet;

    /// Channel width the model was built for.
    fn channels(&self) -> usize;

    /// Model name for logs.
    fn name(&self) -> &str;

    /// Whether training has completed.
    fn is_trained(&self) -> bool;
}

/// Autoencoder architecture and training parameters. Defaults match
/// the reference deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Input channel count (C).
    pub channels: usize,
    /// Encoder stage widths; the decoder mirrors them.
    pub filters: Vec<usize>,
    /// Convolution receptive width (odd, same padding).
    pub kernel_size: usize,
    /// Dropout rate after the first encoder and first decoder stage.
    pub dropout: f32,
    /// Adam learning rate.
    pub learning_rate: f64,
    /// Mini-batch size.
    pub batch_size: usize,
    /// Epoch budget.
    pub epochs: usize,
    /// Fraction of training windows held out for validation.
    pub validation_split: f32,
    /// Epochs without validation improvement before early stop.
    pub patience: usize,
    /// RNG seed for reproducible training; entropy-seeded when unset.
    pub seed: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            channels: 38,
            filters: vec![32, 16],
            kernel_size: 7,
            dropout: 0.2,
            learning_rate: 0.001,
            batch_size: 64,
            epochs: 40,
            validation_split: 0.1,
            patience: 5,
            seed: None,
        }
    }
}
