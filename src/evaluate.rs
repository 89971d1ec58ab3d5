//! Detection evaluation
//!
//! Aligns window verdicts with per-timestamp ground truth and computes
//! detection counts, precision/recall/F1, and a confusion matrix.
//!
//! A window is associated with the label at its final index, so the
//! ground-truth sequence is trimmed by dropping its first
//! `label_offset` entries before element-wise comparison. Any length
//! mismatch after trimming is a fatal alignment error, reported with
//! both lengths rather than silently truncated.

use serde::{Deserialize, Serialize};

use crate::error::{RecwatchError, Result};

/// 2x2 confusion matrix over {Normal, Anomaly}.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_positives: usize,
}

impl ConfusionMatrix {
    /// Total count across all four cells; equals the number of
    /// compared windows.
    pub fn total(&self) -> usize {
        self.true_negatives + self.false_positives + self.false_negatives + self.true_positives
    }
}

/// Detection quality against ground truth.
///
/// The raw counts are always present; the ratio metrics are `None`
/// when their denominator is zero (undefined, not coerced to 0).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    /// Windows flagged anomalous.
    pub detected: usize,
    /// Trimmed labels marked anomalous.
    pub actual: usize,
    /// Flagged windows whose label is also anomalous.
    pub correct: usize,
    /// `correct / detected`; `None` when nothing was detected.
    pub precision: Option<f64>,
    /// `correct / actual`; `None` when there are no actual anomalies.
    pub recall: Option<f64>,
    /// `2PR / (P + R)`; `None` when either factor is undefined or
    /// both are zero.
    pub f1: Option<f64>,
    pub confusion: ConfusionMatrix,
}

impl Metrics {
    /// Evaluate window verdicts against original-series labels.
    ///
    /// Drops the first `label_offset` labels, then compares
    /// element-wise with `flags`. Mismatched lengths after trimming
    /// are fatal.
    pub fn evaluate(flags: &[bool], labels: &[bool], label_offset: usize) -> Result<Self> {
        let trimmed = trim_labels(labels, label_offset);
        Self::from_aligned(flags, trimmed)
    }

    /// Evaluate against labels that are already window-aligned.
    pub fn from_aligned(flags: &[bool], trimmed: &[bool]) -> Result<Self> {
        if flags.len() != trimmed.len() {
            return Err(RecwatchError::Alignment {
                flags: flags.len(),
                labels: trimmed.len(),
            });
        }

        let mut confusion = ConfusionMatrix::default();
        for (&flag, &label) in flags.iter().zip(trimmed) {
            match (flag, label) {
                (false, false) => confusion.true_negatives += 1,
                (true, false) => confusion.false_positives += 1,
                (false, true) => confusion.false_negatives += 1,
                (true, true) => confusion.true_positives += 1,
            }
        }

        let detected = confusion.true_positives + confusion.false_positives;
        let actual = confusion.true_positives + confusion.false_negatives;
        let correct = confusion.true_positives;

        let precision = (detected > 0).then(|| correct as f64 / detected as f64);
        let recall = (actual > 0).then(|| correct as f64 / actual as f64);
        let f1 = match (precision, recall) {
            (Some(p), Some(r)) if p + r > 0.0 => Some(2.0 * p * r / (p + r)),
            _ => None,
        };

        Ok(Self {
            detected,
            actual,
            correct,
            precision,
            recall,
            f1,
            confusion,
        })
    }
}

/// Labels aligned to window verdicts: the first `label_offset`
/// original-series entries dropped. Returns the whole slice empty when
/// the offset exceeds the label count.
pub fn trim_labels(labels: &[bool], label_offset: usize) -> &[bool] {
    labels.get(label_offset..).unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_scenario() {
        // flags [T,F,T,F] vs trimmed labels [T,T,F,F]
        let flags = [true, false, true, false];
        let labels = [true, true, false, false];
        let metrics = Metrics::from_aligned(&flags, &labels).unwrap();

        assert_eq!(metrics.detected, 2);
        assert_eq!(metrics.actual, 2);
        assert_eq!(metrics.correct, 1);
        assert_eq!(metrics.precision, Some(0.5));
        assert_eq!(metrics.recall, Some(0.5));
        assert_eq!(metrics.f1, Some(0.5));
        assert_eq!(metrics.confusion.total(), 4);
    }

    #[test]
    fn test_count_identities() {
        let flags = [true, true, false, true, false, false];
        let labels = [true, false, false, true, true, false];
        let metrics = Metrics::from_aligned(&flags, &labels).unwrap();

        // precision * detected == correct, recall * actual == correct
        let p = metrics.precision.unwrap();
        let r = metrics.recall.unwrap();
        assert!((p * metrics.detected as f64 - metrics.correct as f64).abs() < 1e-12);
        assert!((r * metrics.actual as f64 - metrics.correct as f64).abs() < 1e-12);
        assert_eq!(metrics.confusion.total(), flags.len());
    }

    #[test]
    fn test_trim_offset() {
        let labels = [true, true, false, true];
        assert_eq!(trim_labels(&labels, 2), &[false, true]);
        assert_eq!(trim_labels(&labels, 4), &[] as &[bool]);
        assert_eq!(trim_labels(&labels, 10), &[] as &[bool]);
    }

    #[test]
    fn test_alignment_mismatch_is_fatal() {
        // 10 timestamps with time_steps 3: 8 windows but only 7 labels
        // survive trimming by 3. The mismatch must surface, not be
        // silently truncated.
        let flags = vec![false; 8];
        let labels = vec![false; 10];
        match Metrics::evaluate(&flags, &labels, 3) {
            Err(RecwatchError::Alignment { flags: f, labels: l }) => {
                assert_eq!((f, l), (8, 7));
            }
            other => panic!("expected Alignment error, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_detected_precision_undefined() {
        let flags = [false, false, false];
        let labels = [true, false, true];
        let metrics = Metrics::from_aligned(&flags, &labels).unwrap();

        assert_eq!(metrics.detected, 0);
        assert_eq!(metrics.precision, None);
        assert_eq!(metrics.recall, Some(0.0));
        assert_eq!(metrics.f1, None);
    }

    #[test]
    fn test_zero_actual_recall_undefined() {
        let flags = [true, false];
        let labels = [false, false];
        let metrics = Metrics::from_aligned(&flags, &labels).unwrap();

        assert_eq!(metrics.actual, 0);
        assert_eq!(metrics.recall, None);
        assert_eq!(metrics.precision, Some(0.0));
        assert_eq!(metrics.f1, None);
    }

    #[test]
    fn test_all_zero_rates() {
        let flags = [true];
        let labels = [false];
        let metrics = Metrics::from_aligned(&flags, &labels).unwrap();
        // precision defined but zero, recall undefined: F1 undefined.
        assert_eq!(metrics.precision, Some(0.0));
        assert_eq!(metrics.recall, None);
        assert_eq!(metrics.f1, None);
    }
}
