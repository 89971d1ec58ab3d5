//! Convolutional autoencoder
//!
//! Symmetric encode-decode stack over a `(time_steps x channels)`
//! window:
//!
//! ```text
//! C -> filters[0] -> filters[1] -> filters[1] -> filters[0] -> C
//! ```
//!
//! Every stage is a same-padded stride-1 convolution with a ReLU,
//! except the final projection back to C channels which stays linear.
//! Dropout sits after the first encoder and first decoder stage and is
//! active only during training; inference is deterministic.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::series::WindowSet;

use super::layers::{relu_inplace, Conv1d};
use super::trainer::{Trainer, TrainingReport};
use super::{ModelConfig, ReconstructionModel};

/// Indices (into the layer stack) after which dropout applies during
/// training: the first encoder and first decoder stage.
pub(crate) const DROPOUT_SITES: [usize; 2] = [0, 2];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvAutoencoder {
    config: ModelConfig,
    layers: Vec<Conv1d>,
    trained: bool,
    epochs_trained: usize,
    final_loss: f32,
}

impl ConvAutoencoder {
    /// Build an untrained model from the configuration.
    pub fn new(config: ModelConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let c = config.channels;
        let f0 = config.filters.first().copied().unwrap_or(32);
        let f1 = config.filters.get(1).copied().unwrap_or(16);
        let k = config.kernel_size;

        let widths = [c, f0, f1, f1, f0, c];
        let layers = widths
            .windows(2)
            .map(|pair| Conv1d::new(pair[0], pair[1], k, &mut rng))
            .collect();

        Self {
            config,
            layers,
            trained: false,
            epochs_trained: 0,
            final_loss: 0.0,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn epochs_trained(&self) -> usize {
        self.epochs_trained
    }

    pub fn final_loss(&self) -> f32 {
        self.final_loss
    }

    /// Total trainable parameter count.
    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|l| l.parameter_count()).sum()
    }

    pub(crate) fn layers(&self) -> &[Conv1d] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [Conv1d] {
        &mut self.layers
    }

    pub(crate) fn mark_trained(&mut self, epochs: usize, final_loss: f32) {
        self.trained = true;
        self.epochs_trained = epochs;
        self.final_loss = final_loss;
    }

    /// Inference forward pass over one channel-major window signal.
    /// Dropout is inactive; ReLU after every stage but the last.
    pub(crate) fn forward(&self, x: &[f32], len: usize) -> Vec<f32> {
        let last = self.layers.len() - 1;
        let mut activation = x.to_vec();
        for (idx, layer) in self.layers.iter().enumerate() {
            activation = layer.forward(&activation, len);
            if idx < last {
                relu_inplace(&mut activation);
            }
        }
        activation
    }

    /// Reconstruct a single window given in `[t][c]` order.
    pub fn reconstruct_window(&self, window: &[f32], time_steps: usize) -> Vec<f32> {
        let channels = self.config.channels;
        let x = to_channel_major(window, time_steps, channels);
        let y = self.forward(&x, time_steps);
        to_time_major(&y, time_steps, channels)
    }
}

impl ReconstructionModel for ConvAutoencoder {
    fn fit(&mut self, windows: &WindowSet) -> Result<TrainingReport> {
        let mut trainer = Trainer::new(self.config.clone());
        trainer.train(self, windows)
    }

    fn reconstruct(&self, windows: &WindowSet) -> WindowSet {
        let time_steps = windows.time_steps();
        let channels = windows.channels();
        let mut data = Vec::with_capacity(windows.num_windows() * time_steps * channels);

        for w in 0..windows.num_windows() {
            data.extend(self.reconstruct_window(windows.window(w), time_steps));
        }
        WindowSet::from_raw(data, windows.num_windows(), time_steps, channels)
    }

    fn channels(&self) -> usize {
        self.config.channels
    }

    fn name(&self) -> &str {
        "conv-autoencoder"
    }

    fn is_trained(&self) -> bool {
        self.trained
    }
}

/// `[t][c]` window slice to channel-major `[c][t]`.
pub(crate) fn to_channel_major(window: &[f32], time_steps: usize, channels: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; window.len()];
    for t in 0..time_steps {
        for c in 0..channels {
            out[c * time_steps + t] = window[t * channels + c];
        }
    }
    out
}

/// Channel-major `[c][t]` back to `[t][c]`.
pub(crate) fn to_time_major(x: &[f32], time_steps: usize, channels: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; x.len()];
    for c in 0..channels {
        for t in 0..time_steps {
            out[t * channels + c] = x[c * time_steps + t];
        }
    }
    out
}
