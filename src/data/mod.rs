// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between pose files on disk and the plain domain
// maps the rest of the program works with.
//
//   dataset file (.safetensors / .json)
//       │
//       ▼
//   DatasetLoader     → reads bytes, picks the format
//       │
//       ▼
//   codec             → bytes ⇄ PoseDataset / PosePredictions
//
// Reference: safetensors format (huggingface/safetensors)

/// Supported on-disk encodings
pub mod format;

/// Byte-level encode / decode for both formats
pub mod codec;

/// Loads the input 2D dataset from a file
pub mod loader;
