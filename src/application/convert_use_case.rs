// ============================================================
// Layer 2 — Convert Use Case
// ============================================================
// Imports a PyTorch checkpoint once (with the same shape checks
// as a run) and writes it back as a native Burn checkpoint so
// later runs can skip the pickle reader.

use anyhow::Result;
use burn::backend::{ndarray::NdArrayDevice, NdArray};
use std::path::PathBuf;

use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::LinearModelConfig;

#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub load:           PathBuf,
    pub out_dir:        PathBuf,
    pub state_dict_key: Option<String>,
    pub model:          LinearModelConfig,
}

pub struct ConvertUseCase {
    cfg: ConvertConfig,
}

impl ConvertUseCase {
    pub fn new(cfg: ConvertConfig) -> Self {
        Self { cfg }
    }

    /// Returns the path of the written weights file.
    pub fn execute(&self) -> Result<PathBuf> {
        // Conversion only moves weights around, so the CPU backend is enough
        let device = NdArrayDevice::Cpu;

        let ckpt      = CheckpointManager::new(&self.cfg.load, self.cfg.state_dict_key.clone());
        let model_cfg = ckpt.resolve_config(self.cfg.model.clone())?;
        let model     = ckpt.load_model::<NdArray>(&model_cfg, &device)?;

        let weights = CheckpointManager::save_native(&model, &model_cfg, &self.cfg.out_dir)?;
        tracing::info!("Converted '{}' → '{}'", self.cfg.load.display(), weights.display());
        Ok(weights)
    }
}
