//! Convolutional building blocks
//!
//! A same-padded, stride-1 1-D convolution with hand-rolled forward
//! and backward passes, plus the ReLU/dropout helpers and the Adam
//! update the trainer drives. With stride 1 and same padding a
//! transposed convolution is an ordinary convolution, so this one
//! layer kind covers the whole symmetric stack.
//!
//! Activations are laid out channel-major: channel `i` of a length-L
//! signal occupies `x[i * L .. (i + 1) * L]`.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// 1-D convolution, stride 1, zero-padded to preserve length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conv1d {
    in_channels: usize,
    out_channels: usize,
    /// Odd receptive width.
    kernel: usize,
    /// `[out][in][k]`, flattened.
    weight: Vec<f32>,
    bias: Vec<f32>,
}

impl Conv1d {
    /// Glorot-uniform initialized layer.
    pub fn new<R: Rng>(in_channels: usize, out_channels: usize, kernel: usize, rng: &mut R) -> Self {
        let fan_in = (in_channels * kernel) as f32;
        let fan_out = (out_channels * kernel) as f32;
        let limit = (6.0 / (fan_in + fan_out)).sqrt();

        let weight = (0..out_channels * in_channels * kernel)
            .map(|_| rng.random_range(-limit..limit))
            .collect();

        Self {
            in_channels,
            out_channels,
            kernel,
            weight,
            bias: vec![0.0; out_channels],
        }
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    pub fn parameter_count(&self) -> usize {
        self.weight.len() + self.bias.len()
    }

    #[inline]
    fn w(&self, o: usize, i: usize, j: usize) -> f32 {
        self.weight[(o * self.in_channels + i) * self.kernel + j]
    }

    /// Forward pass over a channel-major signal of length `len`.
    pub fn forward(&self, x: &[f32], len: usize) -> Vec<f32> {
        debug_assert_eq!(x.len(), self.in_channels * len);
        let pad = self.kernel / 2;
        let mut y = vec![0.0f32; self.out_channels * len];

        for o in 0..self.out_channels {
            let out_row = &mut y[o * len..(o + 1) * len];
            for t in 0..len {
                out_row[t] = self.bias[o];
            }
            for i in 0..self.in_channels {
                let in_row = &x[i * len..(i + 1) * len];
                for j in 0..self.kernel {
                    let w = self.w(o, i, j);
                    // Output index t reads input index t + j - pad.
                    let lo = pad.saturating_sub(j);
                    let hi = (len + pad).saturating_sub(j).min(len);
                    for t in lo..hi {
                        out_row[t] += w * in_row[t + j - pad];
                    }
                }
            }
        }
        y
    }

    /// Backward pass: accumulates weight/bias gradients into `grads`
    /// and returns the gradient with respect to the input.
    pub fn backward(&self, x: &[f32], dy: &[f32], len: usize, grads: &mut ConvGrads) -> Vec<f32> {
        debug_assert_eq!(x.len(), self.in_channels * len);
        debug_assert_eq!(dy.len(), self.out_channels * len);
        let pad = self.kernel / 2;
        let mut dx = vec![0.0f32; self.in_channels * len];

        for o in 0..self.out_channels {
            let dy_row = &dy[o * len..(o + 1) * len];
            grads.bias[o] += dy_row.iter().sum::<f32>();

            for i in 0..self.in_channels {
                let in_row = &x[i * len..(i + 1) * len];
                let dx_row = &mut dx[i * len..(i + 1) * len];
                for j in 0..self.kernel {
                    let lo = pad.saturating_sub(j);
                    let hi = (len + pad).saturating_sub(j).min(len);

                    let mut dw = 0.0f32;
                    let w = self.w(o, i, j);
                    for t in lo..hi {
                        let s = t + j - pad;
                        dw += dy_row[t] * in_row[s];
                        dx_row[s] += w * dy_row[t];
                    }
                    grads.weight[(o * self.in_channels + i) * self.kernel + j] += dw;
                }
            }
        }
        dx
    }

    /// Apply one Adam step using gradients accumulated over `batch`
    /// samples. `step` is the 1-based optimizer step for bias
    /// correction.
    pub fn adam_step(
        &mut self,
        grads: &mut ConvGrads,
        state: &mut AdamState,
        lr: f32,
        step: usize,
        batch: usize,
    ) {
        let scale = 1.0 / batch.max(1) as f32;
        adam_update(
            &mut self.weight,
            &grads.weight,
            scale,
            &mut state.m_weight,
            &mut state.v_weight,
            lr,
            step,
        );
        adam_update(
            &mut self.bias,
            &grads.bias,
            scale,
            &mut state.m_bias,
            &mut state.v_bias,
            lr,
            step,
        );
        grads.zero();
    }
}

/// Gradient accumulators matching one [`Conv1d`].
#[derive(Debug, Clone)]
pub struct ConvGrads {
    weight: Vec<f32>,
    bias: Vec<f32>,
}

impl ConvGrads {
    pub fn zeros_like(layer: &Conv1d) -> Self {
        Self {
            weight: vec![0.0; layer.weight.len()],
            bias: vec![0.0; layer.bias.len()],
        }
    }

    pub fn zero(&mut self) {
        self.weight.fill(0.0);
        self.bias.fill(0.0);
    }
}

/// First and second Adam moments for one [`Conv1d`].
#[derive(Debug, Clone)]
pub struct AdamState {
    m_weight: Vec<f32>,
    v_weight: Vec<f32>,
    m_bias: Vec<f32>,
    v_bias: Vec<f32>,
}

impl AdamState {
    pub fn zeros_like(layer: &Conv1d) -> Self {
        Self {
            m_weight: vec![0.0; layer.weight.len()],
            v_weight: vec![0.0; layer.weight.len()],
            m_bias: vec![0.0; layer.bias.len()],
            v_bias: vec![0.0; layer.bias.len()],
        }
    }
}

const BETA1: f32 = 0.9;
const BETA2: f32 = 0.999;
const EPSILON: f32 = 1e-8;

fn adam_update(
    params: &mut [f32],
    grads: &[f32],
    grad_scale: f32,
    m: &mut [f32],
    v: &mut [f32],
    lr: f32,
    step: usize,
) {
    let bc1 = 1.0 - BETA1.powi(step as i32);
    let bc2 = 1.0 - BETA2.powi(step as i32);

    for idx in 0..params.len() {
        let g = grads[idx] * grad_scale;
        m[idx] = BETA1 * m[idx] + (1.0 - BETA1) * g;
        v[idx] = BETA2 * v[idx] + (1.0 - BETA2) * g * g;
        let m_hat = m[idx] / bc1;
        let v_hat = v[idx] / bc2;
        params[idx] -= lr * m_hat / (v_hat.sqrt() + EPSILON);
    }
}

/// In-place ReLU.
pub fn relu_inplace(x: &mut [f32]) {
    for v in x.iter_mut() {
        if *v < 0.0 {
            *v = 0.0;
        }
    }
}

/// Zero the gradient wherever the forward activation was clipped.
/// `y` is the post-ReLU activation.
pub fn relu_backward(dy: &mut [f32], y: &[f32]) {
    for (d, &a) in dy.iter_mut().zip(y) {
        if a <= 0.0 {
            *d = 0.0;
        }
    }
}

/// Inverted-dropout mask: kept positions carry `1 / (1 - rate)`,
/// dropped positions zero. Applied identically forward and backward.
pub fn dropout_mask<R: Rng>(len: usize, rate: f32, rng: &mut R) -> Vec<f32> {
    let keep_scale = 1.0 / (1.0 - rate);
    (0..len)
        .map(|_| {
            if rng.random::<f32>() < rate {
                0.0
            } else {
                keep_scale
            }
        })
        .collect()
}

/// Element-wise mask application, used for both passes.
pub fn apply_mask(x: &mut [f32], mask: &[f32]) {
    for (v, &m) in x.iter_mut().zip(mask) {
        *v *= m;
    }
}
