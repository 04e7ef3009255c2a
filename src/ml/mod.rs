// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model code lives here. The rest of the program only
// sees the PoseLifter trait and plain PoseArrays.
//
//   model.rs      — The residual linear 2D → 3D regressor
//                   • input layer: joints*2 → linear_size
//                   • num_stage residual blocks
//                     (linear, batch-norm, relu, dropout) x2
//                   • output layer: linear_size → joints*3
//
//   inferencer.rs — Single-frame inference: one-item batch in,
//                   final row out, reshaped to [joints, 3]
//
// Reference: Martinez et al. (2017) A simple yet effective
//            baseline for 3d human pose estimation
//            Burn Book §3 (Building Blocks)

/// Residual linear model architecture
pub mod model;

/// Inference engine — wraps a loaded model as a PoseLifter
pub mod inferencer;
