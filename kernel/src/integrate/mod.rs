//! Integrator kernels.
//!
//! One function per scheduling stage. Each invocation performs exactly one
//! transition on the state machine it belongs to (main or shadow); the
//! scheduler dispatches whichever stage a path's queued-kernel tag names.

mod init;
mod intersect;
mod megakernel;
mod services;
mod shade;
mod shade_shadow;

// Re-export.
pub use init::*;
pub use intersect::*;
pub use megakernel::*;
pub use services::*;
pub use shade::*;
pub use shade_shadow::*;

use crate::film::RenderBuffer;
use crate::state::PathState;
use crate::types::{IntegratorKernel, RenderParams};
use crate::work_queue::QueueCounter;

/// Invokes the kernel a path is queued for. Init-from-camera and the
/// megakernel are dispatched by the host with explicit work items, never
/// through a queued tag.
///
/// * `kernel`   - The queued kernel to run.
/// * `state`    - The path.
/// * `services` - Scene services.
/// * `queues`   - Shared queue counters.
/// * `params`   - Render parameters.
/// * `buffer`   - The render buffer.
pub fn dispatch_kernel<S, const N: usize>(
    kernel: IntegratorKernel,
    state: &mut PathState<N>,
    services: &S,
    queues: &QueueCounter,
    params: &RenderParams,
    buffer: &RenderBuffer,
) where
    S: SceneServices + ?Sized,
{
    state.begin_dispatch(kernel);
    match kernel {
        IntegratorKernel::IntersectClosest => {
            integrator_intersect_closest(state, services, queues);
        }
        IntegratorKernel::IntersectShadow => {
            integrator_intersect_shadow(state, services, queues, params);
        }
        IntegratorKernel::IntersectSubsurface => {
            integrator_intersect_subsurface(state, services, queues);
        }
        IntegratorKernel::ShadeBackground => {
            integrator_shade_background(state, services, queues, buffer);
        }
        IntegratorKernel::ShadeLight => {
            integrator_shade_light(state, services, queues, buffer);
        }
        IntegratorKernel::ShadeShadow => {
            integrator_shade_shadow(state, services, queues, buffer);
        }
        IntegratorKernel::ShadeSurface => {
            integrator_shade_surface(state, services, queues, params, buffer);
        }
        IntegratorKernel::ShadeVolume => {
            integrator_shade_volume(state, services, queues, buffer);
        }
        IntegratorKernel::InitFromCamera | IntegratorKernel::Megakernel => {
            debug_assert!(false, "{kernel} is dispatched with explicit work items");
        }
    }
}
