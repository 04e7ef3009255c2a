// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: these modules tell the data, ml
// and infra layers what to do, in order.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Load model → lift dataset → write predictions
pub mod lift_use_case;

// PyTorch checkpoint → native Burn checkpoint
pub mod convert_use_case;
