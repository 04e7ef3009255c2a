// ============================================================
// Layer 6 — Prediction Writer
// ============================================================
// Persists the finished predictions map as a single file with a
// fixed name inside the output directory:
//
//   <output_dir>/3dposes
//
// The directory tree is created like `mkdir -p`, so pointing a
// rerun at an existing directory simply overwrites the file.

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::data::{codec, format::PoseFormat};
use crate::domain::pose::PosePredictions;
use crate::domain::traits::PredictionSink;

pub const PREDICTIONS_FILE: &str = "3dposes";

pub struct PredictionWriter {
    format: PoseFormat,
}

impl PredictionWriter {
    pub fn new(format: PoseFormat) -> Self {
        Self { format }
    }
}

impl PredictionSink for PredictionWriter {
    fn save(&self, predictions: &PosePredictions, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;

        let bytes = codec::encode_predictions(predictions, self.format)?;
        let path  = dir.join(PREDICTIONS_FILE);
        fs::write(&path, bytes)
            .with_context(|| format!("Cannot write predictions to '{}'", path.display()))?;

        tracing::info!("Saved {} predictions to '{}'", predictions.len(), path.display());
        Ok(path)
    }
}
