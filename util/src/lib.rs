//! Shared math and atomic primitives for the renderer core.

pub mod atomic_float;
pub mod float3;
pub mod math;
pub mod sync_cell;

// Re-export.
pub use atomic_float::*;
pub use float3::*;
pub use math::*;
pub use sync_cell::*;
