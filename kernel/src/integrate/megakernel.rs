//! Megakernel scheduling mode.

use crate::film::RenderBuffer;
use crate::integrate::{dispatch_kernel, SceneServices};
use crate::state::PathState;
use crate::types::RenderParams;
use crate::work_queue::QueueCounter;

/// Runs an already initialized path, and any shadow sub-paths it spawns,
/// to completion in a single invocation by looping the per-stage kernels.
/// Shadow work is drained before the main path continues, so at most one
/// shadow sub-path is ever pending. This is the reference scheduling mode;
/// wavefront dispatch must produce the same accumulation.
///
/// * `state`    - The path; the main machine must be live.
/// * `services` - Scene services.
/// * `queues`   - Shared queue counters.
/// * `params`   - Render parameters.
/// * `buffer`   - The render buffer.
pub fn integrator_megakernel<S, const N: usize>(
    state: &mut PathState<N>,
    services: &S,
    queues: &QueueCounter,
    params: &RenderParams,
    buffer: &RenderBuffer,
) where
    S: SceneServices + ?Sized,
{
    loop {
        if let Some(kernel) = state.shadow.queued_kernel {
            dispatch_kernel(kernel, state, services, queues, params, buffer);
            continue;
        }
        match state.queued_kernel {
            Some(kernel) => dispatch_kernel(kernel, state, services, queues, params, buffer),
            None => break,
        }
    }
}
