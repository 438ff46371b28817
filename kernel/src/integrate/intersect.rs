//! Intersection kernels.

use crate::integrate::{ClosestHit, SceneServices};
use crate::state::PathState;
use crate::types::{IntegratorKernel, RenderParams};
use crate::work_queue::QueueCounter;

/// Closest-hit intersection for the main path. Routes the path to the
/// matching shade kernel; if the path is inside a volume, the volume
/// segment is shaded first and routing to the hit happens afterwards.
///
/// * `state`    - The path.
/// * `services` - Scene services.
/// * `queues`   - Shared queue counters.
pub fn integrator_intersect_closest<S, const N: usize>(
    state: &mut PathState<N>,
    services: &S,
    queues: &QueueCounter,
) where
    S: SceneServices + ?Sized,
{
    match services.intersect_closest(&state.ray) {
        ClosestHit::Surface(isect) => {
            state.isect = Some(isect);
            state.hit_is_light = false;
        }
        ClosestHit::Light(isect) => {
            state.isect = Some(isect);
            state.hit_is_light = true;
        }
        ClosestHit::Miss => {
            state.isect = None;
            state.hit_is_light = false;
        }
    }

    let next = if !state.volume_stack.is_empty() {
        IntegratorKernel::ShadeVolume
    } else {
        shade_kernel_for_hit(state)
    };
    state.path_next(queues, IntegratorKernel::IntersectClosest, next);
}

/// Returns the shade kernel matching the recorded closest hit.
pub(crate) fn shade_kernel_for_hit<const N: usize>(state: &PathState<N>) -> IntegratorKernel {
    match state.isect {
        Some(_) if state.hit_is_light => IntegratorKernel::ShadeLight,
        Some(_) => IntegratorKernel::ShadeSurface,
        None => IntegratorKernel::ShadeBackground,
    }
}

/// Bounded transparent-shadow intersection for the shadow sub-path. Fills
/// the recorded-hit window nearest-first and hands off to the shadow shade
/// kernel; past the transparent-bounce budget any blocker is opaque and
/// the sub-path terminates with no contribution.
///
/// * `state`    - The path.
/// * `services` - Scene services.
/// * `queues`   - Shared queue counters.
/// * `params`   - Render parameters.
pub fn integrator_intersect_shadow<S, const N: usize>(
    state: &mut PathState<N>,
    services: &S,
    queues: &QueueCounter,
    params: &RenderParams,
) where
    S: SceneServices + ?Sized,
{
    let num_hits = services.intersect_shadow(&state.shadow.ray, &mut state.shadow.isect);
    state.shadow.num_hits = num_hits;

    if num_hits > 0 && state.shadow.transparent_bounce >= params.max_transparent_bounce {
        state.shadow_path_terminate(queues, IntegratorKernel::IntersectShadow);
        return;
    }

    state.shadow_path_next(
        queues,
        IntegratorKernel::IntersectShadow,
        IntegratorKernel::ShadeShadow,
    );
}

/// Resolves a BSSRDF bounce to its exit point and resumes surface shading
/// there.
///
/// * `state`    - The path.
/// * `services` - Scene services.
/// * `queues`   - Shared queue counters.
pub fn integrator_intersect_subsurface<S, const N: usize>(
    state: &mut PathState<N>,
    services: &S,
    queues: &QueueCounter,
) where
    S: SceneServices + ?Sized,
{
    let isect = services.intersect_subsurface(&state.ray);
    state.isect = Some(isect);
    state.hit_is_light = false;
    state.path_next(
        queues,
        IntegratorKernel::IntersectSubsurface,
        IntegratorKernel::ShadeSurface,
    );
}
