// ============================================================
// Layer 4 — Dataset Loader
// ============================================================
// Reads the 2D pose dataset (key → joint array) from a single
// file. The format follows the file extension:
//
//   *.json   → nested JSON arrays
//   anything → safetensors
//
// Unlike a directory walk there is nothing to skip here: a
// missing or malformed file fails the run.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::data::{codec, format::PoseFormat};
use crate::domain::pose::PoseDataset;
use crate::domain::traits::PoseSource;

/// Loads a pose dataset from one file on disk.
pub struct DatasetLoader {
    path: PathBuf,
}

impl DatasetLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PoseSource for DatasetLoader {
    fn load(&self) -> Result<PoseDataset> {
        let format = PoseFormat::from_path(&self.path);
        let bytes  = fs::read(&self.path)
            .with_context(|| format!("Cannot read dataset '{}'", self.path.display()))?;

        let dataset = codec::decode_dataset(&bytes, format)
            .with_context(|| format!("Cannot decode dataset '{}'", self.path.display()))?;

        tracing::info!(
            "Loaded {} samples from '{}' ({:?})",
            dataset.len(), self.path.display(), format
        );
        Ok(dataset)
    }
}
