// ============================================================
// Layer 3 — Pose Domain Types
// ============================================================
// Plain containers for joint coordinates. A PoseArray is a dense
// row-major block of f32 values plus its shape:
//
//   one 2D frame   → [16, 2]      (or flat [32])
//   one 2D video   → [T, 16, 2]
//   one 3D frame   → [16, 3]
//
// The dataset and prediction maps are BTreeMaps so keys are
// always visited in the same order.

use anyhow::{bail, Result};
use std::collections::BTreeMap;

/// Input dataset: sample key → 2D joint array
pub type PoseDataset = BTreeMap<String, PoseArray>;

/// Output of a run: sample key → 3D joint prediction
pub type PosePredictions = BTreeMap<String, Pose3d>;

/// A dense f32 array with an explicit shape.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseArray {
    shape:  Vec<usize>,
    values: Vec<f32>,
}

impl PoseArray {
    /// Build an array, checking that `values` fills `shape` exactly.
    pub fn new(shape: Vec<usize>, values: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            bail!(
                "Shape {:?} needs {} values but {} were given",
                shape, expected, values.len()
            );
        }
        Ok(Self { shape, values })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Split along the leading axis, e.g. [T, 16, 2] → T arrays of [16, 2].
    pub fn frames(&self) -> Result<Vec<PoseArray>> {
        let Some((&count, rest)) = self.shape.split_first() else {
            bail!("Cannot split a scalar into frames");
        };
        let frame_len: usize = rest.iter().product();

        if frame_len == 0 {
            return Ok(vec![PoseArray { shape: rest.to_vec(), values: Vec::new() }; count]);
        }

        Ok(self.values
            .chunks_exact(frame_len)
            .map(|chunk| PoseArray { shape: rest.to_vec(), values: chunk.to_vec() })
            .collect())
    }

    /// Stack equally shaped frames along a new leading axis.
    /// `frame_shape` is used when `frames` is empty.
    pub fn stack(frames: &[PoseArray], frame_shape: &[usize]) -> Result<PoseArray> {
        let inner = frames.first().map(|f| f.shape.clone()).unwrap_or_else(|| frame_shape.to_vec());

        let mut values = Vec::with_capacity(frames.len() * inner.iter().product::<usize>());
        for (i, frame) in frames.iter().enumerate() {
            if frame.shape != inner {
                bail!("Frame {} has shape {:?}, expected {:?}", i, frame.shape, inner);
            }
            values.extend_from_slice(&frame.values);
        }

        let mut shape = vec![frames.len()];
        shape.extend(inner);
        PoseArray::new(shape, values)
    }
}

/// A 3D prediction for one sample.
#[derive(Debug, Clone, PartialEq)]
pub enum Pose3d {
    /// Image mode: a single [joints, 3] array
    Frame(PoseArray),
    /// Video mode: one [joints, 3] array per input frame, in order
    Sequence(Vec<PoseArray>),
}

impl Pose3d {
    pub fn frame_count(&self) -> usize {
        match self {
            Pose3d::Frame(_)       => 1,
            Pose3d::Sequence(list) => list.len(),
        }
    }
}
