// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The dataset loop only needs "turn one 2D frame into one 3D
// frame". Putting that behind a trait keeps the loop free of
// Burn types and lets it be tested with a stub lifter.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::domain::pose::{PoseArray, PoseDataset, PosePredictions};

// ─── PoseLifter ───────────────────────────────────────────────────────────────
/// Anything that maps a single 2D frame to a single 3D frame.
///
/// Implementations:
///   - PoseInferencer → runs the pretrained linear model
pub trait PoseLifter {
    /// Lift one frame of 2D joints to a [joints, 3] array.
    fn lift_frame(&self, frame: &PoseArray) -> Result<PoseArray>;

    /// Lift every frame of a [T, ...] video independently, in order.
    fn lift_sequence(&self, video: &PoseArray) -> Result<Vec<PoseArray>> {
        video.frames()?
            .iter()
            .map(|frame| self.lift_frame(frame))
            .collect()
    }
}

// ─── PoseSource ───────────────────────────────────────────────────────────────
/// Any component that can provide the 2D dataset.
pub trait PoseSource {
    fn load(&self) -> Result<PoseDataset>;
}

// ─── PredictionSink ───────────────────────────────────────────────────────────
/// Any component that can persist a finished predictions map.
pub trait PredictionSink {
    /// Write the predictions under `dir`, returning the file written.
    fn save(&self, predictions: &PosePredictions, dir: &Path) -> Result<PathBuf>;
}
