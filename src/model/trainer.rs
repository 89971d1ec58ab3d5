//! Autoencoder training
//!
//! Mini-batch gradient descent on the mean squared reconstruction
//! error with Adam, a held-out validation tail, and patience-based
//! early stopping. Early stopping is a monitored termination path,
//! not a failure; the final weights are kept.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{RecwatchError, Result};
use crate::series::WindowSet;

use super::autoencoder::{to_channel_major, ConvAutoencoder, DROPOUT_SITES};
use super::layers::{
    apply_mask, dropout_mask, relu_backward, relu_inplace, AdamState, ConvGrads,
};
use super::ModelConfig;

/// Outcome of a training run: per-epoch loss histories and how the
/// run terminated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Epochs actually run (<= the epoch budget).
    pub epochs_run: usize,
    /// Whether the patience criterion ended the run early.
    pub stopped_early: bool,
    /// Mean training loss per epoch.
    pub train_loss: Vec<f32>,
    /// Mean validation loss per epoch; empty when no windows were
    /// held out.
    pub val_loss: Vec<f32>,
    /// Best monitored loss seen.
    pub best_loss: f32,
}

/// Drives one training run over a window set.
pub struct Trainer {
    config: ModelConfig,
    rng: StdRng,
}

impl Trainer {
    pub fn new(config: ModelConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { config, rng }
    }

    /// Train the model in place.
    ///
    /// Fails fast on an empty window set or a channel-width mismatch;
    /// training on nothing must never look like success.
    pub fn train(
        &mut self,
        model: &mut ConvAutoencoder,
        windows: &WindowSet,
    ) -> Result<TrainingReport> {
        if windows.is_empty() {
            return Err(RecwatchError::NoTrainingWindows {
                time_steps: windows.time_steps(),
            });
        }
        if windows.channels() != self.config.channels {
            return Err(RecwatchError::ChannelWidth {
                expected: self.config.channels,
                got: windows.channels(),
            });
        }
        if !(0.0..1.0).contains(&self.config.validation_split) {
            return Err(RecwatchError::Config(format!(
                "validation_split {} outside [0, 1)",
                self.config.validation_split
            )));
        }

        let n = windows.num_windows();
        // Final fraction held out, un-shuffled.
        let val_count = ((n as f32 * self.config.validation_split) as usize).min(n - 1);
        let train_count = n - val_count;
        if val_count == 0 {
            warn!("no validation windows held out; monitoring training loss");
        }

        info!(
            windows = n,
            validation = val_count,
            parameters = model.parameter_count(),
            epochs = self.config.epochs,
            batch_size = self.config.batch_size,
            "training conv autoencoder"
        );

        let lr = self.config.learning_rate as f32;
        let time_steps = windows.time_steps();
        let mut indices: Vec<usize> = (0..train_count).collect();

        let mut grads: Vec<ConvGrads> = model.layers().iter().map(ConvGrads::zeros_like).collect();
        let mut adam: Vec<AdamState> = model.layers().iter().map(AdamState::zeros_like).collect();
        let mut step = 0usize;

        let mut report = TrainingReport {
            epochs_run: 0,
            stopped_early: false,
            train_loss: Vec::with_capacity(self.config.epochs),
            val_loss: Vec::with_capacity(self.config.epochs),
            best_loss: f32::MAX,
        };
        let mut wait = 0usize;

        for epoch in 0..self.config.epochs {
            indices.shuffle(&mut self.rng);

            let mut epoch_loss = 0.0f64;
            for batch in indices.chunks(self.config.batch_size.max(1)) {
                for &w in batch {
                    epoch_loss +=
                        self.backprop_sample(model, windows.window(w), time_steps, &mut grads)
                            as f64;
                }
                step += 1;
                for (layer, (g, s)) in model
                    .layers_mut()
                    .iter_mut()
                    .zip(grads.iter_mut().zip(adam.iter_mut()))
                {
                    layer.adam_step(g, s, lr, step, batch.len());
                }
            }
            let train_loss = (epoch_loss / train_count as f64) as f32;
            report.train_loss.push(train_loss);
            report.epochs_run = epoch + 1;

            let monitored = if val_count > 0 {
                let val_loss = validation_loss(model, windows, train_count, n);
                report.val_loss.push(val_loss);
                val_loss
            } else {
                train_loss
            };
            debug!(epoch = epoch + 1, train_loss, monitored, "epoch complete");

            if monitored < report.best_loss {
                report.best_loss = monitored;
                wait = 0;
            } else {
                wait += 1;
                if wait >= self.config.patience {
                    info!(
                        epoch = epoch + 1,
                        patience = self.config.patience,
                        "early stop: monitored loss has not improved"
                    );
                    report.stopped_early = true;
                    break;
                }
            }
        }

        let final_loss = report.train_loss.last().copied().unwrap_or(0.0);
        model.mark_trained(report.epochs_run, final_loss);
        info!(
            epochs = report.epochs_run,
            final_loss,
            best_loss = report.best_loss,
            stopped_early = report.stopped_early,
            "training complete"
        );

        Ok(report)
    }

    /// Forward/backward for one window; returns its MSE loss and
    /// accumulates layer gradients.
    fn backprop_sample(
        &mut self,
        model: &mut ConvAutoencoder,
        window: &[f32],
        time_steps: usize,
        grads: &mut [ConvGrads],
    ) -> f32 {
        let channels = self.config.channels;
        let x = to_channel_major(window, time_steps, channels);
        let num_layers = model.layers().len();
        let last = num_layers - 1;

        // Forward, caching each layer's input.
        let mut activations: Vec<Vec<f32>> = Vec::with_capacity(num_layers + 1);
        let mut masks: Vec<Option<Vec<f32>>> = vec![None; num_layers];
        activations.push(x.clone());

        for idx in 0..num_layers {
            let mut out = model.layers()[idx].forward(&activations[idx], time_steps);
            if idx < last {
                relu_inplace(&mut out);
            }
            if DROPOUT_SITES.contains(&idx) && self.config.dropout > 0.0 {
                let mask = dropout_mask(out.len(), self.config.dropout, &mut self.rng);
                apply_mask(&mut out, &mask);
                masks[idx] = Some(mask);
            }
            activations.push(out);
        }

        let output = &activations[num_layers];
        let n_el = output.len() as f32;
        let mut loss = 0.0f32;
        let mut dy: Vec<f32> = output
            .iter()
            .zip(&x)
            .map(|(&o, &t)| {
                let diff = o - t;
                loss += diff * diff;
                2.0 * diff / n_el
            })
            .collect();
        loss /= n_el;

        // Backward through the stack.
        for idx in (0..num_layers).rev() {
            if let Some(mask) = &masks[idx] {
                apply_mask(&mut dy, mask);
            }
            if idx < last {
                relu_backward(&mut dy, &activations[idx + 1]);
            }
            dy = model.layers()[idx].backward(&activations[idx], &dy, time_steps, &mut grads[idx]);
        }

        loss
    }
}

/// Mean MSE over the held-out windows, dropout inactive.
fn validation_loss(model: &ConvAutoencoder, windows: &WindowSet, start: usize, end: usize) -> f32 {
    let time_steps = windows.time_steps();
    let channels = windows.channels();
    let mut total = 0.0f64;

    for w in start..end {
        let x = to_channel_major(windows.window(w), time_steps, channels);
        let y = model.forward(&x, time_steps);
        let mse: f32 = y
            .iter()
            .zip(&x)
            .map(|(&a, &b)| (a - b) * (a - b))
            .sum::<f32>()
            / x.len() as f32;
        total += mse as f64;
    }
    (total / (end - start) as f64) as f32
}
