// ============================================================
// Layer 2 — Lift Use Case
// ============================================================
// The whole run, strictly in sequence:
//   1. Build the model and load the checkpoint
//   2. Load the 2D dataset
//   3. Lift every key (one frame, or every frame of a video)
//   4. Write <output_dir>/3dposes
//
// Any failure stops the run; nothing is written unless every
// key was lifted.

use anyhow::{Context, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    prelude::Backend,
};
use clap::ValueEnum;
use std::path::PathBuf;

use crate::data::{format::PoseFormat, loader::DatasetLoader};
use crate::domain::pose::{Pose3d, PoseDataset, PosePredictions};
use crate::domain::traits::{PoseLifter, PoseSource, PredictionSink};
use crate::infra::{checkpoint::CheckpointManager, prediction_writer::PredictionWriter};
use crate::ml::{inferencer::PoseInferencer, model::LinearModelConfig};

/// A progress line is logged every this many keys
const PROGRESS_EVERY: usize = 30;

/// Where the model runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum InferenceDevice {
    /// GPU through wgpu
    #[default]
    Wgpu,
    /// CPU through ndarray
    Cpu,
}

/// All settings for one run, independent of how they were parsed.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub load:             PathBuf,
    pub data_dir:         PathBuf,
    pub output_dir:       PathBuf,
    pub process_as_video: bool,
    pub format:           PoseFormat,
    pub device:           InferenceDevice,
    pub state_dict_key:   Option<String>,
    pub model:            LinearModelConfig,
}

pub struct LiftUseCase {
    cfg: RunConfig,
}

impl LiftUseCase {
    pub fn new(cfg: RunConfig) -> Self {
        Self { cfg }
    }

    /// Run end to end and return the path of the predictions file.
    pub fn execute(&self) -> Result<PathBuf> {
        tracing::info!("Run options: {:#?}", self.cfg);

        match self.cfg.device {
            InferenceDevice::Wgpu => self.execute_on::<Wgpu>(WgpuDevice::default()),
            InferenceDevice::Cpu  => self.execute_on::<NdArray>(NdArrayDevice::Cpu),
        }
    }

    fn execute_on<B: Backend>(&self, device: B::Device) -> Result<PathBuf> {
        let ckpt       = CheckpointManager::new(&self.cfg.load, self.cfg.state_dict_key.clone());
        let model_cfg  = ckpt.resolve_config(self.cfg.model.clone())?;
        let inferencer = PoseInferencer::<B>::from_checkpoint(&ckpt, model_cfg, device)?;

        let dataset     = DatasetLoader::new(&self.cfg.data_dir).load()?;
        let predictions = lift_dataset(&inferencer, &dataset, self.cfg.process_as_video)?;

        PredictionWriter::new(self.cfg.format).save(&predictions, &self.cfg.output_dir)
    }
}

/// Lift every entry of `dataset`, keeping its key.
///
/// With `process_as_video` each entry is split along its leading
/// axis and every frame is lifted on its own; otherwise the entry
/// is lifted as a single frame.
pub fn lift_dataset<L: PoseLifter>(
    lifter:           &L,
    dataset:          &PoseDataset,
    process_as_video: bool,
) -> Result<PosePredictions> {
    let total = dataset.len();
    let mut predictions = PosePredictions::new();

    for (i, (key, input)) in dataset.iter().enumerate() {
        if i % PROGRESS_EVERY == 0 {
            tracing::info!("At {} out of {} videos.", i, total);
        }

        let prediction = if process_as_video {
            Pose3d::Sequence(lifter.lift_sequence(input)
                .with_context(|| format!("Cannot lift video '{key}'"))?)
        } else {
            Pose3d::Frame(lifter.lift_frame(input)
                .with_context(|| format!("Cannot lift frame '{key}'"))?)
        };
        tracing::debug!("Lifted '{}' ({} frames)", key, prediction.frame_count());

        predictions.insert(key.clone(), prediction);
    }

    Ok(predictions)
}
