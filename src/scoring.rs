//! Reconstruction error scoring
//!
//! Reduces a window and its reconstruction to a per-window, per-channel
//! mean absolute error. The channel axis is preserved because the
//! decision stage needs channel-level exceedance, not one aggregate.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::series::WindowSet;

/// Per-window, per-channel mean absolute reconstruction error.
///
/// Shape `(num_windows x channels)`, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMatrix {
    data: Vec<f32>,
    num_windows: usize,
    channels: usize,
}

impl ErrorMatrix {
    /// Score reconstructions against their source windows.
    ///
    /// Entry `(w, c)` is `mean_t |window[w][t][c] - recon[w][t][c]|`,
    /// reduced over the time axis only. The two sets must have
    /// identical dimensions.
    pub fn score(windows: &WindowSet, reconstructions: &WindowSet) -> Result<Self> {
        windows.same_shape(reconstructions)?;

        let num_windows = windows.num_windows();
        let time_steps = windows.time_steps();
        let channels = windows.channels();

        let mut data = vec![0.0f32; num_windows * channels];
        for w in 0..num_windows {
            let original = windows.window(w);
            let recon = reconstructions.window(w);
            let row = &mut data[w * channels..(w + 1) * channels];

            for t in 0..time_steps {
                let base = t * channels;
                for c in 0..channels {
                    row[c] += (original[base + c] - recon[base + c]).abs();
                }
            }
            for v in row.iter_mut() {
                *v /= time_steps as f32;
            }
        }

        Ok(Self {
            data,
            num_windows,
            channels,
        })
    }

    /// Assemble from raw per-window, per-channel values.
    pub fn from_parts(data: Vec<f32>, num_windows: usize, channels: usize) -> Result<Self> {
        if data.len() != num_windows * channels {
            return Err(crate::error::RecwatchError::UnevenSeries {
                len: data.len(),
                channels,
            });
        }
        Ok(Self {
            data,
            num_windows,
            channels,
        })
    }

    pub fn num_windows(&self) -> usize {
        self.num_windows
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Error of channel `c` in window `w`.
    pub fn get(&self, w: usize, c: usize) -> f32 {
        self.data[w * self.channels + c]
    }

    /// Per-channel errors for window `w`.
    pub fn row(&self, w: usize) -> &[f32] {
        &self.data[w * self.channels..(w + 1) * self.channels]
    }

    /// Flattened view across windows and channels.
    pub fn values(&self) -> &[f32] {
        &self.data
    }
}
