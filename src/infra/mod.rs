// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Disk-facing pieces that the use cases call into:
//
//   checkpoint.rs        — Loading model weights
//                          PyTorch checkpoints via burn-import,
//                          native ones via Burn's MessagePack recorders.
//                          Every parameter shape is checked
//                          against the expected architecture.
//
//   prediction_writer.rs — Writing the 3D predictions map to
//                          <output_dir>/3dposes
//
// Reference: Burn Book §5 (Checkpointing)
//            Rust Book §9 (Error Handling with anyhow)

/// Model checkpoint loading (and native saving for `convert`)
pub mod checkpoint;

/// Predictions file writer
pub mod prediction_writer;
