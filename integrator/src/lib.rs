//! Host-side orchestration of the wavefront integrator.
//!
//! [`PathTrace`] drives dispatch rounds over a device queue using the
//! shared work-queue counters for kernel selection; [`PassAccessor`]
//! converts finished render buffers into output images.

#[macro_use]
extern crate log;

mod pass_accessor;
mod path_trace;

// Re-export.
pub use pass_accessor::*;
pub use path_trace::*;
