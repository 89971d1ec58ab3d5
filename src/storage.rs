//! Model persistence
//!
//! Saves and loads a trained autoencoder as JSON inside a versioned
//! metadata envelope. The format is an opaque boundary: the only
//! contract is that a round trip yields numerically equivalent
//! inference behavior.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RecwatchError, Result};
use crate::model::ConvAutoencoder;

/// Bumped on any incompatible change to the stored layout.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// On-disk wrapper around the serialized model.
#[derive(Debug, Serialize, Deserialize)]
struct ModelEnvelope {
    version: u32,
    saved_at: DateTime<Utc>,
    model: ConvAutoencoder,
}

/// Persist a model to `path`.
pub fn save_model<P: AsRef<Path>>(model: &ConvAutoencoder, path: P) -> Result<()> {
    let path = path.as_ref();
    let envelope = ModelEnvelope {
        version: MODEL_FORMAT_VERSION,
        saved_at: Utc::now(),
        model: model.clone(),
    };

    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), &envelope)?;
    info!("saved model to {:?} ({} parameters)", path, model.parameter_count());
    Ok(())
}

/// Load a model from `path`, rejecting unknown format versions.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<ConvAutoencoder> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let envelope: ModelEnvelope = serde_json::from_reader(BufReader::new(file))?;

    if envelope.version != MODEL_FORMAT_VERSION {
        return Err(RecwatchError::UnsupportedModelVersion {
            found: envelope.version,
            expected: MODEL_FORMAT_VERSION,
        });
    }

    info!(
        "loaded model from {:?} (saved {}, {} parameters)",
        path,
        envelope.saved_at,
        envelope.model.parameter_count()
    );
    Ok(envelope.model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelConfig, ReconstructionModel};
    use crate::series::{Series, WindowSet};

    fn trained_model() -> ConvAutoencoder {
        let config = ModelConfig {
            channels: 2,
            filters: vec![4, 2],
            kernel_size: 3,
            epochs: 3,
            batch_size: 8,
            seed: Some(5),
            ..ModelConfig::default()
        };
        let rows: Vec<Vec<f32>> = (0..30)
            .map(|t| vec![(t as f32 * 0.2).sin(), 0.3])
            .collect();
        let windows = WindowSet::slide(&Series::from_rows(&rows).unwrap(), 5).unwrap();

        let mut model = ConvAutoencoder::new(config);
        model.fit(&windows).unwrap();
        model
    }

    #[test]
    fn test_round_trip_preserves_inference() {
        let model = trained_model();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        save_model(&model, &path).unwrap();
        let loaded = load_model(&path).unwrap();

        assert!(loaded.is_trained());
        assert_eq!(loaded.epochs_trained(), model.epochs_trained());

        let probe = vec![0.4f32; 5 * 2];
        let before = model.reconstruct_window(&probe, 5);
        let after = loaded.reconstruct_window(&probe, 5);
        for (a, b) in before.iter().zip(&after) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let model = trained_model();
        save_model(&model, &path).unwrap();

        // Rewrite the envelope with a bogus version.
        let raw = std::fs::read_to_string(&path).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        value["version"] = serde_json::json!(99);
        std::fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

        assert!(matches!(
            load_model(&path),
            Err(RecwatchError::UnsupportedModelVersion {
                found: 99,
                expected: MODEL_FORMAT_VERSION
            })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            load_model("/nonexistent/model.json"),
            Err(RecwatchError::Io(_))
        ));
    }
}
