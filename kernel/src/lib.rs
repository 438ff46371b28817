//! Device-independent integrator kernels.
//!
//! Everything in this crate is written once against plain shared-memory
//! primitives and runs identically on any backend: the scheduling state
//! machine, the per-stage path-tracing kernels, film accumulation and the
//! film convert kernels. Backends only supply dispatch (see the `device`
//! crate) and the scene/shader services (see [`integrate::SceneServices`]).

pub mod film;
pub mod integrate;
pub mod ray;
pub mod state;
pub mod types;
pub mod work_queue;

// Re-export.
pub use ray::*;
pub use state::*;
pub use types::*;
pub use work_queue::*;
