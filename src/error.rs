use thiserror::Error;

/// Errors surfaced by the detection pipeline.
///
/// Shape and alignment violations are fatal and carry the offending
/// values; degenerate metric conditions are not errors (see
/// [`crate::evaluate::Metrics`]).
#[derive(Debug, Error)]
pub enum RecwatchError {
    #[error("ragged series row {row}: expected {expected} channels, got {got}")]
    RaggedRow {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("flat buffer of {len} values does not divide into {channels} channels")]
    UnevenSeries { len: usize, channels: usize },

    #[error("time_steps must be at least 1")]
    InvalidTimeSteps,

    #[error("channel mismatch: training series has {train}, test series has {test}")]
    ChannelMismatch { train: usize, test: usize },

    #[error("series channel width {got} does not match model input width {expected}")]
    ChannelWidth { expected: usize, got: usize },

    #[error("training series too short: {len} timestamps, window needs {time_steps}")]
    SeriesTooShort { len: usize, time_steps: usize },

    #[error("no training windows to fit on (time_steps {time_steps})")]
    NoTrainingWindows { time_steps: usize },

    #[error(
        "window set shape mismatch: {expected_windows}x{expected_steps}x{expected_channels} \
         vs {got_windows}x{got_steps}x{got_channels}"
    )]
    ShapeMismatch {
        expected_windows: usize,
        expected_steps: usize,
        expected_channels: usize,
        got_windows: usize,
        got_steps: usize,
        got_channels: usize,
    },

    #[error("label alignment: {flags} window verdicts vs {labels} trimmed labels")]
    Alignment { flags: usize, labels: usize },

    #[error("empty error matrix: nothing to calibrate")]
    EmptyErrorMatrix,

    #[error("config error: {0}")]
    Config(String),

    #[error("parse error at {path}:{line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },

    #[error("unsupported model format version {found} (expected {expected})")]
    UnsupportedModelVersion { found: u32, expected: u32 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RecwatchError>;
