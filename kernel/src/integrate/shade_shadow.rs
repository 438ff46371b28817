//! Transparent shadow evaluation for the shadow sub-path.

use crate::film::{accum_light, RenderBuffer};
use crate::integrate::SceneServices;
use crate::ray::ray_offset;
use crate::state::PathState;
use crate::types::IntegratorKernel;
use crate::work_queue::QueueCounter;
use util::Float3;

/// Transparency of the recorded surface hit crossed by the shadow ray.
fn integrate_transparent_surface_shadow<S, const N: usize>(
    state: &PathState<N>,
    services: &S,
    hit: usize,
) -> Float3
where
    S: SceneServices + ?Sized,
{
    services.surface_transparency(&state.shadow.ray, &state.shadow.isect[hit])
}

/// Transmittance of the stacked volumes over the segment between the
/// previous recorded hit (or the ray origin) and this hit (or the ray
/// end).
fn integrate_transparent_volume_shadow<S, const N: usize>(
    state: &PathState<N>,
    services: &S,
    hit: usize,
    num_recorded_hits: usize,
) -> Float3
where
    S: SceneServices + ?Sized,
{
    let ray = &state.shadow.ray;
    let start_t = if hit == 0 {
        0.0
    } else {
        state.shadow.isect[hit - 1].t
    };
    let end_t = if hit < num_recorded_hits {
        state.shadow.isect[hit].t
    } else {
        ray.t
    };
    services.volume_transmittance(ray, start_t, end_t, &state.shadow.volume_stack)
}

/// Accumulates shadow attenuation through transparent surfaces and
/// volumes. Returns true if the ray is fully occluded (throughput reached
/// exact zero). When more intersections exist than the recorded-hit
/// storage could hold, the shadow ray is advanced past the last recorded
/// hit so intersection can resume from there.
fn integrate_transparent_shadow<S, const N: usize>(state: &mut PathState<N>, services: &S) -> bool
where
    S: SceneServices + ?Sized,
{
    let num_recorded_hits = state.shadow.num_recorded_hits();
    let has_remaining = state.shadow.has_remaining_hits();

    // The extra iteration handles the open segment beyond the last
    // recorded hit, or the whole ray when nothing was recorded.
    for hit in 0..num_recorded_hits + 1 {
        // Volume shaders. The trailing open segment is skipped when more
        // hits remain; it will be covered after the ray is advanced.
        if hit < num_recorded_hits || !has_remaining {
            if !state.shadow.volume_stack.is_empty() {
                let transmittance =
                    integrate_transparent_volume_shadow(state, services, hit, num_recorded_hits);
                let throughput = state.shadow.throughput * transmittance;
                if throughput.is_zero() {
                    return true;
                }
                state.shadow.throughput = throughput;
            }
        }

        // Surface shaders.
        if hit < num_recorded_hits {
            let transparency = integrate_transparent_surface_shadow(state, services, hit);
            let throughput = state.shadow.throughput * transparency;
            if throughput.is_zero() {
                return true;
            }
            state.shadow.throughput = throughput;
            state.shadow.transparent_bounce += 1;
        }

        // No transparent-bounce bound check here: the intersect kernel
        // already treats rays past the budget as opaque.
    }

    if has_remaining {
        // More hits than the fixed-size storage could record; adjust the
        // ray to intersect again from the last recorded hit.
        let last_hit_t = state.shadow.isect[num_recorded_hits - 1].t;
        let p = state.shadow.ray.p;
        let d = state.shadow.ray.d;
        state.shadow.ray.p = ray_offset(p + d * last_hit_t, d);
        state.shadow.ray.t -= last_hit_t;
    }

    false
}

/// Consumes the recorded shadow intersections: attenuates the light
/// contribution through transparent surfaces and volumes, reschedules the
/// sub-path when the recorded-hit window overflowed, and otherwise
/// accumulates the surviving contribution and terminates.
///
/// * `state`    - The path whose shadow sub-path completed intersection.
/// * `services` - Scene services.
/// * `queues`   - Shared queue counters.
/// * `buffer`   - The render buffer.
pub fn integrator_shade_shadow<S, const N: usize>(
    state: &mut PathState<N>,
    services: &S,
    queues: &QueueCounter,
    buffer: &RenderBuffer,
) where
    S: SceneServices + ?Sized,
{
    let opaque = integrate_transparent_shadow(state, services);
    if opaque {
        state.shadow_path_terminate(queues, IntegratorKernel::ShadeShadow);
        return;
    }

    if state.shadow.has_remaining_hits() {
        // More intersections to find, continue the shadow ray. This is a
        // continuation, not a failure.
        state.shadow_path_next(
            queues,
            IntegratorKernel::ShadeShadow,
            IntegratorKernel::IntersectShadow,
        );
    } else {
        accum_light(state, buffer);
        state.shadow_path_terminate(queues, IntegratorKernel::ShadeShadow);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::film::BufferParams;
    use crate::integrate::intersect::integrator_intersect_shadow;
    use crate::integrate::{ClosestHit, SurfaceSample};
    use crate::ray::Ray;
    use crate::state::{Isect, VolumeStack};
    use crate::types::{PassType, RenderParams};
    use float_cmp::approx_eq;
    use util::Float;

    /// Analytic scene of transparent layers perpendicular to +z, one per
    /// unit of depth starting at z = 1.
    struct LayeredScene {
        num_layers: u32,
        /// Per-layer transparency; exact zero makes the layer opaque.
        transparency: fn(u32) -> Float3,
        /// Extinction coefficient for the (single) test volume.
        sigma: Float3,
    }

    impl LayeredScene {
        fn layers(num_layers: u32) -> Self {
            Self {
                num_layers,
                transparency: |prim| {
                    Float3::new(
                        0.95 - 0.03 * (prim % 3) as Float,
                        0.90 - 0.02 * (prim % 4) as Float,
                        0.85 - 0.01 * (prim % 5) as Float,
                    )
                },
                sigma: Float3::zero(),
            }
        }

        fn opaque() -> Self {
            Self {
                num_layers: 1,
                transparency: |_| Float3::zero(),
                sigma: Float3::zero(),
            }
        }

        fn volume_only(sigma: Float3) -> Self {
            Self {
                num_layers: 0,
                transparency: |_| Float3::one(),
                sigma,
            }
        }
    }

    impl SceneServices for LayeredScene {
        fn camera_ray(&self, _x: u32, _y: u32, _sample: u32) -> Ray {
            Ray::default()
        }

        fn intersect_closest(&self, _ray: &Ray) -> ClosestHit {
            ClosestHit::Miss
        }

        fn intersect_shadow(&self, ray: &Ray, isects: &mut [Isect]) -> u32 {
            let mut num_hits = 0;
            let mut recorded = 0;
            for prim in 0..self.num_layers {
                let z = 1.0 + prim as Float;
                let t = (z - ray.p.z) / ray.d.z;
                if t <= 1e-6 || t > ray.t {
                    continue;
                }
                num_hits += 1;
                if recorded < isects.len() {
                    isects[recorded] = Isect {
                        t,
                        object: 0,
                        prim,
                    };
                    recorded += 1;
                }
            }
            num_hits
        }

        fn shade_surface(&self, _ray: &Ray, _isect: &Isect, _bounce: u32) -> SurfaceSample {
            SurfaceSample::default()
        }

        fn surface_transparency(&self, _ray: &Ray, isect: &Isect) -> Float3 {
            (self.transparency)(isect.prim)
        }

        fn volume_transmittance(
            &self,
            _ray: &Ray,
            start_t: Float,
            end_t: Float,
            _stack: &VolumeStack,
        ) -> Float3 {
            let d = end_t - start_t;
            Float3::new(
                (-self.sigma.x * d).exp(),
                (-self.sigma.y * d).exp(),
                (-self.sigma.z * d).exp(),
            )
        }
    }

    fn shadow_buffer() -> RenderBuffer {
        let mut params = BufferParams::new(1, 1);
        params.add_pass(PassType::Combined);
        RenderBuffer::new(params)
    }

    /// Spawns a shadow sub-path along +z with the given extent and drives
    /// it to completion, returning the accumulated RGB contribution.
    fn run_shadow_to_completion<const N: usize>(
        scene: &LayeredScene,
        ray_t: Float,
        volume: bool,
    ) -> (Float3, u32) {
        let queues = QueueCounter::new();
        let buffer = shadow_buffer();
        let params = RenderParams::default();
        let mut state: PathState<N> = PathState::new();

        state.shadow.ray = Ray::new(Float3::zero(), Float3::new(0.0, 0.0, 1.0), ray_t);
        state.shadow.throughput = Float3::one();
        if volume {
            state.shadow.volume_stack.push(7);
        }
        state.begin_dispatch(IntegratorKernel::ShadeSurface);
        state.shadow_path_init(&queues, IntegratorKernel::IntersectShadow);

        let mut resumes = 0;
        while let Some(kernel) = state.shadow.queued_kernel {
            state.begin_dispatch(kernel);
            match kernel {
                IntegratorKernel::IntersectShadow => {
                    integrator_intersect_shadow(&mut state, scene, &queues, &params);
                }
                IntegratorKernel::ShadeShadow => {
                    integrator_shade_shadow(&mut state, scene, &queues, &buffer);
                    if state.shadow.queued_kernel == Some(IntegratorKernel::IntersectShadow) {
                        resumes += 1;
                    }
                }
                other => panic!("unexpected shadow kernel {other}"),
            }
        }
        assert!(queues.is_empty());

        let contribution = Float3::new(buffer.get(0), buffer.get(1), buffer.get(2));
        (contribution, resumes)
    }

    #[test]
    fn opaque_hit_terminates_without_contribution() {
        let scene = LayeredScene::opaque();
        let queues = QueueCounter::new();
        let buffer = shadow_buffer();
        let mut state: PathState<4> = PathState::new();

        state.shadow.ray = Ray::new(Float3::zero(), Float3::new(0.0, 0.0, 1.0), 10.0);
        state.shadow.throughput = Float3::one();
        state.shadow.num_hits = 1;
        state.shadow.isect[0] = Isect {
            t: 1.0,
            object: 0,
            prim: 0,
        };
        state.begin_dispatch(IntegratorKernel::ShadeSurface);
        state.shadow_path_init(&queues, IntegratorKernel::ShadeShadow);

        state.begin_dispatch(IntegratorKernel::ShadeShadow);
        integrator_shade_shadow(&mut state, &scene, &queues, &buffer);

        assert!(state.shadow_is_terminated());
        assert!(queues.is_empty());
        assert_eq!(buffer.get(0), 0.0);
        assert_eq!(buffer.get(1), 0.0);
        assert_eq!(buffer.get(2), 0.0);
        assert_eq!(state.shadow.transparent_bounce, 0);
    }

    #[test]
    fn unoccluded_ray_accumulates_full_contribution() {
        let scene = LayeredScene::layers(0);
        let (contribution, resumes) = run_shadow_to_completion::<4>(&scene, 10.0, false);
        assert_eq!(contribution, Float3::one());
        assert_eq!(resumes, 0);
    }

    #[test]
    fn overflow_issues_one_resume_and_advances_ray() {
        let scene = LayeredScene::layers(10);
        let queues = QueueCounter::new();
        let buffer = shadow_buffer();
        let params = RenderParams::default();
        let mut state: PathState<4> = PathState::new();

        state.shadow.ray = Ray::new(Float3::zero(), Float3::new(0.0, 0.0, 1.0), 20.0);
        state.shadow.throughput = Float3::one();
        state.begin_dispatch(IntegratorKernel::ShadeSurface);
        state.shadow_path_init(&queues, IntegratorKernel::IntersectShadow);

        state.begin_dispatch(IntegratorKernel::IntersectShadow);
        integrator_intersect_shadow(&mut state, &scene, &queues, &params);
        assert_eq!(state.shadow.num_hits, 10);
        let last_hit_t = state.shadow.isect[3].t;
        let p = state.shadow.ray.p;
        let d = state.shadow.ray.d;

        state.begin_dispatch(IntegratorKernel::ShadeShadow);
        integrator_shade_shadow(&mut state, &scene, &queues, &buffer);

        // One resume dispatch back into intersection.
        assert_eq!(
            state.shadow.queued_kernel,
            Some(IntegratorKernel::IntersectShadow)
        );
        // The ray restarts just past the last recorded hit.
        assert_eq!(state.shadow.ray.p, ray_offset(p + d * last_hit_t, d));
        assert_eq!(state.shadow.ray.t, 20.0 - last_hit_t);
        // Nothing accumulated yet.
        assert_eq!(buffer.get(0), 0.0);
        assert_eq!(state.shadow.transparent_bounce, 4);
    }

    #[test]
    fn bounded_capacity_matches_unbounded_result() {
        let scene = LayeredScene::layers(10);
        let (bounded, resumes_bounded) = run_shadow_to_completion::<4>(&scene, 20.0, false);
        let (unbounded, resumes_unbounded) = run_shadow_to_completion::<64>(&scene, 20.0, false);

        assert!(resumes_bounded > 0);
        assert_eq!(resumes_unbounded, 0);
        assert!(approx_eq!(f32, bounded.x, unbounded.x, epsilon = 1e-5));
        assert!(approx_eq!(f32, bounded.y, unbounded.y, epsilon = 1e-5));
        assert!(approx_eq!(f32, bounded.z, unbounded.z, epsilon = 1e-5));
        assert!(!bounded.is_zero());
    }

    #[test]
    fn bounded_capacity_matches_with_volume() {
        let scene = LayeredScene {
            sigma: Float3::new(0.05, 0.08, 0.02),
            ..LayeredScene::layers(10)
        };
        let (bounded, _) = run_shadow_to_completion::<4>(&scene, 20.0, true);
        let (unbounded, _) = run_shadow_to_completion::<64>(&scene, 20.0, true);

        assert!(approx_eq!(f32, bounded.x, unbounded.x, epsilon = 1e-4));
        assert!(approx_eq!(f32, bounded.y, unbounded.y, epsilon = 1e-4));
        assert!(approx_eq!(f32, bounded.z, unbounded.z, epsilon = 1e-4));
    }

    #[test]
    fn pure_volume_accumulates_transmittance_over_full_extent() {
        let sigma = Float3::new(0.1, 0.2, 0.3);
        let scene = LayeredScene::volume_only(sigma);
        let ray_t = 5.0;
        let (contribution, resumes) = run_shadow_to_completion::<4>(&scene, ray_t, true);

        assert_eq!(resumes, 0);
        let expected = Float3::new(
            (-sigma.x * ray_t).exp(),
            (-sigma.y * ray_t).exp(),
            (-sigma.z * ray_t).exp(),
        );
        assert!(approx_eq!(f32, contribution.x, expected.x, ulps = 4));
        assert!(approx_eq!(f32, contribution.y, expected.y, ulps = 4));
        assert!(approx_eq!(f32, contribution.z, expected.z, ulps = 4));
    }
}
