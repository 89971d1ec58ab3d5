use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use recwatch::model::ReconstructionModel;
use recwatch::{
    load_labels, load_series, storage, ConvAutoencoder, LoadOptions, Pipeline, PipelineConfig,
};

#[derive(Parser)]
#[command(name = "recwatch")]
#[command(author, version, about = "Windowed reconstruction-error anomaly detection")]
struct Cli {
    /// Delimited file with the training series (normal telemetry)
    #[arg(long)]
    train: PathBuf,

    /// Delimited file with the test series
    #[arg(long)]
    test: PathBuf,

    /// One ground-truth label per original test timestamp
    #[arg(long)]
    labels: PathBuf,

    /// Path to a JSON pipeline configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model file: loaded if it exists, written after training otherwise
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Column delimiter for the series files
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Treat the first line of the series files as data, not a header
    #[arg(long)]
    no_header: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config from {:?}", path))?,
        None => PipelineConfig::default(),
    };

    let options = LoadOptions {
        delimiter: cli.delimiter,
        has_header: !cli.no_header,
    };
    let train = load_series(&cli.train, &options)
        .with_context(|| format!("loading training series from {:?}", cli.train))?;
    let test = load_series(&cli.test, &options)
        .with_context(|| format!("loading test series from {:?}", cli.test))?;
    let labels =
        load_labels(&cli.labels).with_context(|| format!("loading labels from {:?}", cli.labels))?;

    info!(
        train_len = train.len(),
        test_len = test.len(),
        channels = train.channels(),
        labels = labels.len(),
        "inputs loaded"
    );

    let pipeline = Pipeline::new(config)?;
    let mut model = match &cli.model {
        Some(path) if path.exists() => storage::load_model(path)
            .with_context(|| format!("loading model from {:?}", path))?,
        _ => ConvAutoencoder::new(pipeline.config().model.clone()),
    };
    let freshly_trained = !model.is_trained();

    let outcome = pipeline.run_with_model(&mut model, &train, &test, &labels)?;

    if freshly_trained {
        if let Some(path) = &cli.model {
            storage::save_model(&model, path)
                .with_context(|| format!("saving model to {:?}", path))?;
        }
    }

    let m = &outcome.metrics;
    info!("anomalies detected:           {}", m.detected);
    info!("actual anomalies:             {}", m.actual);
    info!("correctly detected anomalies: {}", m.correct);
    info!("precision: {}", fmt_metric(m.precision));
    info!("recall:    {}", fmt_metric(m.recall));
    info!("f1 score:  {}", fmt_metric(m.f1));
    info!(
        "confusion matrix [tn fp / fn tp]: [{} {} / {} {}]",
        m.confusion.true_negatives,
        m.confusion.false_positives,
        m.confusion.false_negatives,
        m.confusion.true_positives
    );

    if m.precision.is_none() {
        warn!("no windows were flagged; precision is undefined");
    }
    if m.recall.is_none() {
        warn!("no actual anomalies in the trimmed labels; recall is undefined");
    }

    Ok(())
}

fn fmt_metric(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v),
        None => "undefined".to_string(),
    }
}
