// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits describing poses and the
// components that move them around.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

// 2D / 3D joint arrays and the dataset / prediction maps
pub mod pose;

// Core abstractions (traits) that other layers implement
pub mod traits;
