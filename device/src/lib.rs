//! Device backends.
//!
//! A backend supplies one capability: dispatching a kernel over a range of
//! work items and waiting for completion. The integrator core is written
//! once against the [`Queue`] trait; the CPU backend lives here, a GPU
//! backend implements the same contract with native compute dispatch and
//! device atomics.

#[macro_use]
extern crate log;

mod cpu;
mod queue;

// Re-export.
pub use cpu::*;
pub use queue::*;
