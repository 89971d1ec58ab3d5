//! Dataset loading
//!
//! Thin collaborators around the core: delimited numeric files become
//! a [`Series`], plain-text label files become a boolean vector. Any
//! malformed row is fatal with a file/line diagnostic, never padded or
//! skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RecwatchError, Result};
use crate::series::Series;

/// Options for delimited series files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Column separator.
    pub delimiter: char,
    /// Whether the first line is a header row to skip.
    pub has_header: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_header: true,
        }
    }
}

/// Read a delimited file of numeric columns into a [`Series`].
///
/// The first data row fixes the channel width; every later row must
/// match it.
pub fn load_series<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Series> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let path_str = path.display().to_string();

    let mut rows: Vec<Vec<f32>> = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if idx == 0 && options.has_header {
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        let mut row = Vec::new();
        for (col, field) in line.split(options.delimiter).enumerate() {
            let value: f32 = field.trim().parse().map_err(|_| RecwatchError::Parse {
                path: path_str.clone(),
                line: idx + 1,
                message: format!("column {}: not a number: {:?}", col + 1, field.trim()),
            })?;
            row.push(value);
        }

        if let Some(expected) = rows.first().map(|r: &Vec<f32>| r.len()) {
            if row.len() != expected {
                return Err(RecwatchError::Parse {
                    path: path_str,
                    line: idx + 1,
                    message: format!("expected {} columns, got {}", expected, row.len()),
                });
            }
        }
        rows.push(row);
    }

    let series = Series::from_rows(&rows)?;
    debug!(
        "loaded series from {}: {} timestamps x {} channels",
        path_str,
        series.len(),
        series.channels()
    );
    Ok(series)
}

/// Read a one-label-per-line ground-truth file.
///
/// Accepts integer and float renderings of 0/1; anything above 0.5 is
/// anomalous.
pub fn load_labels<P: AsRef<Path>>(path: P) -> Result<Vec<bool>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let path_str = path.display().to_string();

    let mut labels = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let value: f32 = trimmed.parse().map_err(|_| RecwatchError::Parse {
            path: path_str.clone(),
            line: idx + 1,
            message: format!("not a label value: {:?}", trimmed),
        })?;
        labels.push(value > 0.5);
    }

    debug!("loaded {} labels from {}", labels.len(), path_str);
    Ok(labels)
}
