//! End-to-end pipeline tests on synthetic telemetry.

use recwatch::model::ReconstructionModel;
use recwatch::{
    ConvAutoencoder, Metrics, ModelConfig, Pipeline, PipelineConfig, RecwatchError, Series,
    WindowSet,
};

const TIME_STEPS: usize = 6;
const CHANNELS: usize = 2;

fn small_config() -> PipelineConfig {
    PipelineConfig {
        time_steps: TIME_STEPS,
        // Window i is compared with the label at its last covered
        // index, i + time_steps - 1.
        label_offset: Some(TIME_STEPS - 1),
        model: ModelConfig {
            channels: CHANNELS,
            filters: vec![6, 3],
            kernel_size: 3,
            dropout: 0.1,
            learning_rate: 0.01,
            batch_size: 16,
            epochs: 12,
            validation_split: 0.1,
            patience: 5,
            seed: Some(42),
        },
        ..PipelineConfig::default()
    }
}

fn smooth_series(len: usize) -> Series {
    let rows: Vec<Vec<f32>> = (0..len)
        .map(|t| {
            let phase = t as f32 * 0.25;
            vec![phase.sin() * 0.5, phase.cos() * 0.3]
        })
        .collect();
    Series::from_rows(&rows).unwrap()
}

/// Smooth series with a large spike on both channels over
/// `[spike_start, spike_end)`.
fn spiked_series(len: usize, spike_start: usize, spike_end: usize) -> (Series, Vec<bool>) {
    let mut rows: Vec<Vec<f32>> = Vec::with_capacity(len);
    let mut labels = Vec::with_capacity(len);
    for t in 0..len {
        let phase = t as f32 * 0.25;
        let spiking = t >= spike_start && t < spike_end;
        let boost = if spiking { 5.0 } else { 0.0 };
        rows.push(vec![phase.sin() * 0.5 + boost, phase.cos() * 0.3 + boost]);
        labels.push(spiking);
    }
    (Series::from_rows(&rows).unwrap(), labels)
}

#[test]
fn full_run_produces_consistent_outcome() {
    let pipeline = Pipeline::new(small_config()).unwrap();
    let train = smooth_series(120);
    let (test, labels) = spiked_series(80, 40, 50);

    let outcome = pipeline.run(&train, &test, &labels).unwrap();

    let expected_windows = 80 - TIME_STEPS + 1;
    assert_eq!(outcome.test_errors.num_windows(), expected_windows);
    assert_eq!(outcome.test_errors.channels(), CHANNELS);
    assert_eq!(outcome.detections.verdicts().len(), expected_windows);
    assert_eq!(outcome.trimmed_labels.len(), expected_windows);
    assert_eq!(outcome.metrics.confusion.total(), expected_windows);

    // Training happened and reported losses.
    let report = outcome.report.expect("fresh model must be trained");
    assert!(report.epochs_run >= 1);
    assert_eq!(report.train_loss.len(), report.epochs_run);

    // All errors non-negative; threshold holds at least its margin.
    assert!(outcome.train_errors.values().iter().all(|&e| e >= 0.0));
    assert!(outcome.threshold.value() >= outcome.threshold.margin());

    // A 10x off-scale spike must reconstruct poorly enough to flag.
    assert!(
        outcome.detections.count() >= 1,
        "spike went undetected at threshold {}",
        outcome.threshold.value()
    );
    assert!(outcome
        .detections
        .flagged_windows()
        .iter()
        .any(|&w| (35..50).contains(&w)));
}

#[test]
fn default_offset_exposes_window_label_mismatch() {
    // 10 timestamps with time_steps 3 give 8 windows, but trimming 10
    // labels by 3 leaves 7 entries. The pipeline must report this
    // alignment break rather than truncate.
    let flags = vec![false; 8];
    let labels = vec![false; 10];
    match Metrics::evaluate(&flags, &labels, 3) {
        Err(RecwatchError::Alignment { flags: f, labels: l }) => assert_eq!((f, l), (8, 7)),
        other => panic!("expected Alignment error, got {:?}", other),
    }
}

#[test]
fn pretrained_model_skips_training() {
    let config = small_config();
    let pipeline = Pipeline::new(config.clone()).unwrap();

    let train = smooth_series(100);
    let windows = WindowSet::slide(&train, TIME_STEPS).unwrap();
    let mut model = ConvAutoencoder::new(pipeline.config().model.clone());
    model.fit(&windows).unwrap();

    let (test, labels) = spiked_series(60, 30, 36);
    let outcome = pipeline
        .run_with_model(&mut model, &train, &test, &labels)
        .unwrap();
    assert!(outcome.report.is_none());
}

#[test]
fn pretrained_model_with_wrong_width_is_rejected() {
    // Trained for 3 channels, fed a 2-channel series: the mismatch
    // must surface as a structured error before inference.
    let mut wide_config = small_config();
    wide_config.model.channels = 3;
    let rows: Vec<Vec<f32>> = (0..40)
        .map(|t| vec![(t as f32 * 0.2).sin(); 3])
        .collect();
    let wide = Series::from_rows(&rows).unwrap();
    let windows = WindowSet::slide(&wide, TIME_STEPS).unwrap();
    let mut model = ConvAutoencoder::new(wide_config.model.clone());
    model.fit(&windows).unwrap();

    let pipeline = Pipeline::new(small_config()).unwrap();
    let train = smooth_series(60);
    let (test, labels) = spiked_series(60, 30, 36);

    assert!(matches!(
        pipeline.run_with_model(&mut model, &train, &test, &labels),
        Err(RecwatchError::ChannelWidth {
            expected: 3,
            got: 2
        })
    ));
}

#[test]
fn persistence_round_trip_matches_live_model() {
    let config = small_config();
    let train = smooth_series(100);
    let windows = WindowSet::slide(&train, TIME_STEPS).unwrap();

    let mut model = ConvAutoencoder::new(config.model.clone());
    model.fit(&windows).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ae.json");
    recwatch::storage::save_model(&model, &path).unwrap();
    let loaded = recwatch::storage::load_model(&path).unwrap();

    let pipeline = Pipeline::new(config).unwrap();
    let (test, labels) = spiked_series(60, 30, 36);

    let live = pipeline
        .run_with_model(&mut model, &train, &test, &labels)
        .unwrap();
    let mut loaded = loaded;
    let restored = pipeline
        .run_with_model(&mut loaded, &train, &test, &labels)
        .unwrap();

    assert_eq!(live.detections.verdicts(), restored.detections.verdicts());
    for (a, b) in live
        .test_errors
        .values()
        .iter()
        .zip(restored.test_errors.values())
    {
        assert!((a - b).abs() < 1e-6);
    }
}

#[test]
fn seeded_runs_are_reproducible() {
    let pipeline = Pipeline::new(small_config()).unwrap();
    let train = smooth_series(90);
    let (test, labels) = spiked_series(60, 30, 36);

    let a = pipeline.run(&train, &test, &labels).unwrap();
    let b = pipeline.run(&train, &test, &labels).unwrap();

    assert_eq!(a.threshold, b.threshold);
    assert_eq!(a.detections, b.detections);
    assert_eq!(a.metrics.detected, b.metrics.detected);
}
