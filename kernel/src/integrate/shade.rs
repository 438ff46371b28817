//! Shade kernels for the main path.

use crate::film::{accum_radiance, RenderBuffer};
use crate::integrate::intersect::shade_kernel_for_hit;
use crate::integrate::{BounceRay, SceneServices, VolumeEvent};
use crate::state::{PathState, ShadowPathState};
use crate::types::{IntegratorKernel, RenderParams};
use crate::work_queue::QueueCounter;

/// Accumulates background radiance for an escaped ray and terminates the
/// main path.
///
/// * `state`    - The path.
/// * `services` - Scene services.
/// * `queues`   - Shared queue counters.
/// * `buffer`   - The render buffer.
pub fn integrator_shade_background<S, const N: usize>(
    state: &mut PathState<N>,
    services: &S,
    queues: &QueueCounter,
    buffer: &RenderBuffer,
) where
    S: SceneServices + ?Sized,
{
    let radiance = services.background(&state.ray);
    if !radiance.is_zero() {
        accum_radiance(state, buffer, state.throughput * radiance);
    }
    state.path_terminate(queues, IntegratorKernel::ShadeBackground);
}

/// Accumulates emitter radiance for a direct light hit and terminates the
/// main path.
///
/// * `state`    - The path.
/// * `services` - Scene services.
/// * `queues`   - Shared queue counters.
/// * `buffer`   - The render buffer.
pub fn integrator_shade_light<S, const N: usize>(
    state: &mut PathState<N>,
    services: &S,
    queues: &QueueCounter,
    buffer: &RenderBuffer,
) where
    S: SceneServices + ?Sized,
{
    if let Some(isect) = state.isect {
        let radiance = services.light_radiance(&state.ray, &isect);
        if !radiance.is_zero() {
            accum_radiance(state, buffer, state.throughput * radiance);
        }
    }
    state.path_terminate(queues, IntegratorKernel::ShadeLight);
}

/// Evaluates the surface shader at the recorded hit: accumulates emission,
/// spawns the next-event-estimation shadow sub-path, and either continues
/// the main path along the sampled bounce or terminates it.
///
/// * `state`    - The path.
/// * `services` - Scene services.
/// * `queues`   - Shared queue counters.
/// * `params`   - Render parameters.
/// * `buffer`   - The render buffer.
pub fn integrator_shade_surface<S, const N: usize>(
    state: &mut PathState<N>,
    services: &S,
    queues: &QueueCounter,
    params: &RenderParams,
    buffer: &RenderBuffer,
) where
    S: SceneServices + ?Sized,
{
    let isect = match state.isect {
        Some(isect) => isect,
        None => {
            debug_assert!(false, "shade_surface dispatched without a recorded hit");
            state.path_terminate(queues, IntegratorKernel::ShadeSurface);
            return;
        }
    };

    let sample = services.shade_surface(&state.ray, &isect, state.bounce);

    if !sample.emission.is_zero() {
        accum_radiance(state, buffer, state.throughput * sample.emission);
    }

    match sample.volume_event {
        Some(VolumeEvent::Enter(volume)) => state.volume_stack.push(volume),
        Some(VolumeEvent::Exit) => {
            state.volume_stack.pop();
        }
        None => {}
    }

    // At most one shadow sub-path per path slot may be in flight. Both
    // schedulers drain shadow kernels before dispatching surface shading,
    // so the previous sub-path has always terminated by now; release
    // builds skip the light sample rather than orphan a live sub-path.
    debug_assert!(state.shadow_is_terminated());
    if state.shadow_is_terminated() {
        if let Some(shadow) = sample.shadow {
            let contribution = state.throughput * shadow.contribution;
            if !contribution.is_zero() {
                state.shadow = ShadowPathState::default();
                state.shadow.ray = shadow.ray;
                state.shadow.throughput = contribution;
                state.shadow.volume_stack = state.volume_stack;
                state.shadow_path_init(queues, IntegratorKernel::IntersectShadow);
            }
        }
    }

    let bounce = match sample.bounce {
        Some(bounce) if state.bounce < params.max_bounce => bounce,
        _ => {
            state.path_terminate(queues, IntegratorKernel::ShadeSurface);
            return;
        }
    };

    let throughput = state.throughput * sample.bounce_weight;
    if throughput.is_zero() {
        state.path_terminate(queues, IntegratorKernel::ShadeSurface);
        return;
    }
    state.throughput = throughput;
    state.bounce += 1;

    match bounce {
        BounceRay::Surface(ray) => {
            state.ray = ray;
            state.path_next(
                queues,
                IntegratorKernel::ShadeSurface,
                IntegratorKernel::IntersectClosest,
            );
        }
        BounceRay::Subsurface(ray) => {
            state.ray = ray;
            state.path_next(
                queues,
                IntegratorKernel::ShadeSurface,
                IntegratorKernel::IntersectSubsurface,
            );
        }
    }
}

/// Evaluates volume emission and transmittance over the main-path segment
/// up to the recorded hit (or the full ray extent on a miss), then routes
/// the path to the hit's shade kernel.
///
/// * `state`    - The path.
/// * `services` - Scene services.
/// * `queues`   - Shared queue counters.
/// * `buffer`   - The render buffer.
pub fn integrator_shade_volume<S, const N: usize>(
    state: &mut PathState<N>,
    services: &S,
    queues: &QueueCounter,
    buffer: &RenderBuffer,
) where
    S: SceneServices + ?Sized,
{
    let t = state.isect.map_or(state.ray.t, |isect| isect.t);
    let sample = services.shade_volume(&state.ray, t, &state.volume_stack);

    if !sample.emission.is_zero() {
        accum_radiance(state, buffer, state.throughput * sample.emission);
    }

    let throughput = state.throughput * sample.transmittance;
    if throughput.is_zero() {
        state.path_terminate(queues, IntegratorKernel::ShadeVolume);
        return;
    }
    state.throughput = throughput;

    let next = shade_kernel_for_hit(state);
    state.path_next(queues, IntegratorKernel::ShadeVolume, next);
}
