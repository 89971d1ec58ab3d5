//! Multivariate series and sliding windows
//!
//! A [`Series`] is an ordered sequence of observations, each a fixed-width
//! vector of channel values. [`WindowSet`] turns a series into overlapping
//! fixed-length windows, the unit the model trains and scores on.

use serde::{Deserialize, Serialize};

use crate::error::{RecwatchError, Result};

/// A multivariate time series with a uniform channel count.
///
/// Stored row-major: observation `t` occupies
/// `values[t * channels .. (t + 1) * channels]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    values: Vec<f32>,
    channels: usize,
}

impl Series {
    /// Create an empty series with the given channel width.
    pub fn new(channels: usize) -> Self {
        Self {
            values: Vec::new(),
            channels,
        }
    }

    /// Build from per-timestamp rows. The first row fixes the channel
    /// width; any ragged row is a fatal input-shape error.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let channels = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut values = Vec::with_capacity(rows.len() * channels);

        for (row, r) in rows.iter().enumerate() {
            if r.len() != channels {
                return Err(RecwatchError::RaggedRow {
                    row,
                    expected: channels,
                    got: r.len(),
                });
            }
            values.extend_from_slice(r);
        }

        Ok(Self { values, channels })
    }

    /// Build from a flat row-major buffer.
    pub fn from_flat(values: Vec<f32>, channels: usize) -> Result<Self> {
        if channels == 0 || values.len() % channels != 0 {
            return Err(RecwatchError::UnevenSeries {
                len: values.len(),
                channels,
            });
        }
        Ok(Self { values, channels })
    }

    /// Append one observation.
    pub fn push_row(&mut self, row: &[f32]) -> Result<()> {
        if row.len() != self.channels {
            return Err(RecwatchError::RaggedRow {
                row: self.len(),
                expected: self.channels,
                got: row.len(),
            });
        }
        self.values.extend_from_slice(row);
        Ok(())
    }

    /// Number of timestamps.
    pub fn len(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.values.len() / self.channels
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Observation at timestamp `t`.
    pub fn row(&self, t: usize) -> &[f32] {
        &self.values[t * self.channels..(t + 1) * self.channels]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Overlapping fixed-length windows over a [`Series`].
///
/// Window `i` covers original indices `[i, i + time_steps)`; consecutive
/// windows overlap by `time_steps - 1` samples. Each window is stored
/// row-major (`[t][c]`), windows contiguously.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSet {
    data: Vec<f32>,
    num_windows: usize,
    time_steps: usize,
    channels: usize,
}

impl WindowSet {
    /// Slide a window of `time_steps` over the series.
    ///
    /// A series of length `L` yields exactly `L - time_steps + 1`
    /// windows; a series shorter than `time_steps` yields zero windows,
    /// which is a legitimate boundary rather than an error.
    pub fn slide(series: &Series, time_steps: usize) -> Result<Self> {
        if time_steps == 0 {
            return Err(RecwatchError::InvalidTimeSteps);
        }

        let len = series.len();
        let channels = series.channels();
        let num_windows = (len + 1).saturating_sub(time_steps);
        let stride = time_steps * channels;

        let mut data = Vec::with_capacity(num_windows * stride);
        for i in 0..num_windows {
            let start = i * channels;
            data.extend_from_slice(&series.values()[start..start + stride]);
        }

        Ok(Self {
            data,
            num_windows,
            time_steps,
            channels,
        })
    }

    /// Assemble from a raw buffer holding `num_windows` windows.
    pub(crate) fn from_raw(
        data: Vec<f32>,
        num_windows: usize,
        time_steps: usize,
        channels: usize,
    ) -> Self {
        debug_assert_eq!(data.len(), num_windows * time_steps * channels);
        Self {
            data,
            num_windows,
            time_steps,
            channels,
        }
    }

    pub fn num_windows(&self) -> usize {
        self.num_windows
    }

    pub fn time_steps(&self) -> usize {
        self.time_steps
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.num_windows == 0
    }

    /// Flat `[t][c]` slice for window `w`.
    pub fn window(&self, w: usize) -> &[f32] {
        let stride = self.time_steps * self.channels;
        &self.data[w * stride..(w + 1) * stride]
    }

    /// Value of channel `c` at step `t` of window `w`.
    pub fn value(&self, w: usize, t: usize, c: usize) -> f32 {
        self.data[(w * self.time_steps + t) * self.channels + c]
    }

    /// Check that another set has identical dimensions.
    pub fn same_shape(&self, other: &WindowSet) -> Result<()> {
        if self.num_windows != other.num_windows
            || self.time_steps != other.time_steps
            || self.channels != other.channels
        {
            return Err(RecwatchError::ShapeMismatch {
                expected_windows: self.num_windows,
                expected_steps: self.time_steps,
                expected_channels: self.channels,
                got_windows: other.num_windows,
                got_steps: other.time_steps,
                got_channels: other.channels,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_series(len: usize, channels: usize) -> Series {
        let rows: Vec<Vec<f32>> = (0..len)
            .map(|t| (0..channels).map(|c| (t * channels + c) as f32).collect())
            .collect();
        Series::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_from_rows_ragged() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        match Series::from_rows(&rows) {
            Err(RecwatchError::RaggedRow { row, expected, got }) => {
                assert_eq!((row, expected, got), (1, 2, 1));
            }
            other => panic!("expected RaggedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_window_count() {
        let series = ramp_series(10, 3);
        let windows = WindowSet::slide(&series, 3).unwrap();
        assert_eq!(windows.num_windows(), 8);
        assert_eq!(windows.time_steps(), 3);
        assert_eq!(windows.channels(), 3);
    }

    #[test]
    fn test_window_contents_contiguous() {
        let series = ramp_series(5, 2);
        let windows = WindowSet::slide(&series, 2).unwrap();

        assert_eq!(windows.num_windows(), 4);
        // Window 1 covers timestamps 1 and 2.
        assert_eq!(windows.window(1), &[2.0, 3.0, 4.0, 5.0]);
        assert_eq!(windows.value(1, 1, 0), 4.0);
    }

    #[test]
    fn test_short_series_yields_zero_windows() {
        let series = ramp_series(4, 2);
        let windows = WindowSet::slide(&series, 5).unwrap();
        assert!(windows.is_empty());
        assert_eq!(windows.num_windows(), 0);
    }

    #[test]
    fn test_exact_length_yields_one_window() {
        let series = ramp_series(5, 2);
        let windows = WindowSet::slide(&series, 5).unwrap();
        assert_eq!(windows.num_windows(), 1);
        assert_eq!(windows.window(0), series.values());
    }

    #[test]
    fn test_zero_time_steps_rejected() {
        let series = ramp_series(5, 2);
        assert!(matches!(
            WindowSet::slide(&series, 0),
            Err(RecwatchError::InvalidTimeSteps)
        ));
    }

    #[test]
    fn test_push_row() {
        let mut series = Series::new(2);
        series.push_row(&[1.0, 2.0]).unwrap();
        assert!(series.push_row(&[1.0]).is_err());
        assert_eq!(series.len(), 1);
    }
}
