//! Path initialization from the camera.

use crate::film::{accum_sample_alpha, RenderBuffer};
use crate::integrate::SceneServices;
use crate::state::{PathState, ShadowPathState};
use crate::types::IntegratorKernel;
use crate::work_queue::QueueCounter;
use util::Float3;

/// Initializes a freshly allocated path slot with a camera ray and
/// enqueues it into the closest-hit intersection kernel. Dispatched by the
/// host with explicit pixel/sample work items rather than by tag.
///
/// * `state`    - The path slot; both machines must be terminated.
/// * `services` - Scene services.
/// * `queues`   - Shared queue counters.
/// * `buffer`   - The render buffer.
/// * `x`        - Pixel x coordinate.
/// * `y`        - Pixel y coordinate.
/// * `sample`   - Sample index within the pixel.
pub fn integrator_init_from_camera<S, const N: usize>(
    state: &mut PathState<N>,
    services: &S,
    queues: &QueueCounter,
    buffer: &RenderBuffer,
    x: u32,
    y: u32,
    sample: u32,
) where
    S: SceneServices + ?Sized,
{
    debug_assert!(state.is_terminated());
    debug_assert!(state.shadow_is_terminated());

    state.x = x;
    state.y = y;
    state.sample = sample;
    state.ray = services.camera_ray(x, y, sample);
    state.throughput = Float3::one();
    state.bounce = 0;
    state.isect = None;
    state.hit_is_light = false;
    state.volume_stack = services.camera_volume_stack();
    state.shadow = ShadowPathState::default();

    // Every camera sample counts toward the combined pass alpha, however
    // the path later terminates.
    accum_sample_alpha(state, buffer);

    state.path_init(queues, IntegratorKernel::IntersectClosest);
}
