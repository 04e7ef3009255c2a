// ============================================================
// Layer 5 — Inferencer
// ============================================================
use anyhow::{anyhow, bail, Result};
use burn::{prelude::*, tensor::TensorData};

use crate::domain::pose::PoseArray;
use crate::domain::traits::PoseLifter;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{LinearModel, LinearModelConfig};

/// Runs the pretrained linear model one frame at a time.
pub struct PoseInferencer<B: Backend> {
    model:  LinearModel<B>,
    config: LinearModelConfig,
    device: B::Device,
}

impl<B: Backend> PoseInferencer<B> {
    pub fn new(model: LinearModel<B>, config: LinearModelConfig, device: B::Device) -> Self {
        Self { model, config, device }
    }

    pub fn from_checkpoint(
        ckpt_manager: &CheckpointManager,
        config:       LinearModelConfig,
        device:       B::Device,
    ) -> Result<Self> {
        let model = ckpt_manager.load_model::<B>(&config, &device)?;
        tracing::info!("Model loaded from checkpoint");
        Ok(Self::new(model, config, device))
    }
}

impl<B: Backend> PoseLifter for PoseInferencer<B> {
    fn lift_frame(&self, frame: &PoseArray) -> Result<PoseArray> {
        let input_size = self.config.input_size();
        if frame.len() != input_size {
            bail!(
                "Frame of shape {:?} has {} values, the model expects {} ({} joints x 2)",
                frame.shape(), frame.len(), input_size, self.config.num_joints
            );
        }
        // Non-finite coordinates would only surface when the output is written
        if let Some(i) = frame.values().iter().position(|v| !v.is_finite()) {
            bail!("Frame value {} is {}, coordinates must be finite", i, frame.values()[i]);
        }

        // One-item batch: [1, joints*2]
        let data  = TensorData::new(frame.values().to_vec(), [1, input_size]);
        let input = Tensor::<B, 2>::from_data(data, &self.device);

        let output = self.model.forward(input);
        let [batch, width] = output.dims();

        // Keep the final row of the batch and view it as [joints, 3]
        let last = output
            .slice([batch - 1..batch, 0..width])
            .reshape([self.config.num_joints, 3]);

        let values = last
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read model output: {e:?}"))?;

        PoseArray::new(vec![self.config.num_joints, 3], values)
    }
}
