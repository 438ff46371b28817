//! Wavefront path trace scheduler.
//!
//! Owns the path state store, the shared queue counters and the scene
//! services, and drives the integrator kernels through a device queue.
//! Between dispatch rounds the queue has synchronized, so the host may
//! read queued-kernel tags to gather work; during a round each path index
//! appears in at most one work list, which is what gives a kernel
//! invocation exclusive ownership of its slot.

use device::Queue;
use itertools::Itertools;
use kernel::film::RenderBuffer;
use kernel::integrate::{
    dispatch_kernel, integrator_init_from_camera, integrator_megakernel, SceneServices,
};
use kernel::{
    DeviceKernel, IntegratorKernel, PathStateStore, QueueCounter, RenderParams, SHADOW_ISECT_SIZE,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How a render loop ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RenderStatus {
    /// All scheduled samples were traced to completion.
    Complete,

    /// The cancel flag was observed between dispatch rounds. In-flight
    /// work finished; remaining samples were not started.
    Cancelled,
}

/// The wavefront path tracer. Keeps a fixed pool of path slots busy by
/// refilling terminated slots with fresh camera samples and repeatedly
/// dispatching the deepest kernel queue until all work has drained.
pub struct PathTrace<const N: usize = SHADOW_ISECT_SIZE> {
    queue: Arc<dyn Queue>,
    services: Arc<dyn SceneServices>,
    params: RenderParams,
    store: PathStateStore<N>,
    queues: QueueCounter,
    next_work: u64,
}

/// Returns true for kernels belonging to the shadow sub-path machine.
fn is_shadow_kernel(kernel: IntegratorKernel) -> bool {
    matches!(
        kernel,
        IntegratorKernel::IntersectShadow | IntegratorKernel::ShadeShadow
    )
}

impl<const N: usize> PathTrace<N> {
    /// Create a path tracer.
    ///
    /// * `queue`     - Device queue to dispatch kernels through.
    /// * `services`  - Scene services.
    /// * `params`    - Render parameters.
    /// * `num_paths` - Number of path slots kept in flight; must be
    ///                 non-zero.
    pub fn new(
        queue: Arc<dyn Queue>,
        services: Arc<dyn SceneServices>,
        params: RenderParams,
        num_paths: usize,
    ) -> Result<Self, String> {
        if num_paths == 0 {
            return Err("path tracer requires at least one path slot".to_string());
        }
        Ok(Self {
            queue,
            services,
            params,
            store: PathStateStore::new(num_paths),
            queues: QueueCounter::new(),
            next_work: 0,
        })
    }

    /// Returns the shared queue counters.
    pub fn queues(&self) -> &QueueCounter {
        &self.queues
    }

    /// Returns the path state store.
    pub fn store(&self) -> &PathStateStore<N> {
        &self.store
    }

    /// Renders all samples in wavefront mode: refill free slots, pick the
    /// deepest kernel queue, dispatch one round for it, repeat until every
    /// queue is empty and no samples remain.
    ///
    /// * `buffer` - The render buffer.
    /// * `cancel` - Cooperative cancellation flag, checked between rounds.
    pub fn render(&mut self, buffer: &RenderBuffer, cancel: &AtomicBool) -> RenderStatus {
        info!(
            "Wavefront render {}x{} at {} spp over {} path slots",
            self.params.width,
            self.params.height,
            self.params.num_samples,
            self.store.len()
        );

        loop {
            if cancel.load(Ordering::Relaxed) {
                info!("Render cancelled");
                return RenderStatus::Cancelled;
            }

            self.refill(buffer);
            match self.select_kernel() {
                Some(kernel) => self.dispatch_round(kernel, buffer),
                // Empty queues right after a refill means no live paths and
                // no samples left to start.
                None => break,
            }
        }

        debug_assert!(self.queues.is_empty());
        RenderStatus::Complete
    }

    /// Renders all samples in megakernel mode: each work item initializes
    /// a path and runs it to completion in one invocation. The reference
    /// scheduling mode wavefront dispatch is measured against.
    ///
    /// * `buffer` - The render buffer.
    /// * `cancel` - Cooperative cancellation flag, checked between batches.
    pub fn render_megakernel(&mut self, buffer: &RenderBuffer, cancel: &AtomicBool) -> RenderStatus {
        info!(
            "Megakernel render {}x{} at {} spp",
            self.params.width, self.params.height, self.params.num_samples
        );

        loop {
            if cancel.load(Ordering::Relaxed) {
                info!("Render cancelled");
                return RenderStatus::Cancelled;
            }

            // All slots are terminated between batches, so work item i may
            // simply claim slot i.
            let work = self.take_work_batch(self.store.len());
            if work.is_empty() {
                break;
            }

            let store = &self.store;
            let services = self.services.as_ref();
            let queues = &self.queues;
            let params = &self.params;
            self.queue.enqueue(
                DeviceKernel::Integrator(IntegratorKernel::Megakernel),
                work.len(),
                &|i| {
                    let (x, y, sample) = work[i];
                    let state = unsafe { store.get_mut(i) };
                    integrator_init_from_camera(state, services, queues, buffer, x, y, sample);
                    integrator_megakernel(state, services, queues, params, buffer);
                },
            );
            self.queue.synchronize();
        }

        debug_assert!(self.queues.is_empty());
        RenderStatus::Complete
    }

    /// Claims up to `max_items` pixel samples from the remaining work.
    fn take_work_batch(&mut self, max_items: usize) -> Vec<(u32, u32, u32)> {
        let pixels = self.params.width as u64 * self.params.height as u64;
        let total = pixels * self.params.num_samples as u64;

        let mut batch = Vec::new();
        while self.next_work < total && batch.len() < max_items {
            let pixel = self.next_work % pixels;
            let x = (pixel % self.params.width as u64) as u32;
            let y = (pixel / self.params.width as u64) as u32;
            let sample = (self.next_work / pixels) as u32;
            batch.push((x, y, sample));
            self.next_work += 1;
        }
        batch
    }

    /// Initializes fresh camera samples into terminated path slots.
    fn refill(&mut self, buffer: &RenderBuffer) {
        let free: Vec<usize> = (0..self.store.len())
            .filter(|&index| unsafe {
                self.store.queued_kernel(index).is_none()
                    && self.store.shadow_queued_kernel(index).is_none()
            })
            .collect();
        if free.is_empty() {
            return;
        }

        let work = self.take_work_batch(free.len());
        if work.is_empty() {
            return;
        }
        let assignments: Vec<(usize, (u32, u32, u32))> = free.into_iter().zip(work).collect();

        trace!("Initializing {} paths", assignments.len());
        let store = &self.store;
        let services = self.services.as_ref();
        let queues = &self.queues;
        self.queue.enqueue(
            DeviceKernel::Integrator(IntegratorKernel::InitFromCamera),
            assignments.len(),
            &|i| {
                let (slot, (x, y, sample)) = assignments[i];
                let state = unsafe { store.get_mut(slot) };
                integrator_init_from_camera(state, services, queues, buffer, x, y, sample);
            },
        );
        self.queue.synchronize();
    }

    /// Picks the next kernel to dispatch. Queued shadow work drains first,
    /// unconditionally, so a main path never reaches its next surface
    /// shade while its own shadow sub-path is still queued; main kernels
    /// then go deepest-queue-first. Counters are dispatch heuristics; the
    /// gathered tag scan below is what decides the actual work list.
    fn select_kernel(&self) -> Option<IntegratorKernel> {
        let shadow = [
            IntegratorKernel::IntersectShadow,
            IntegratorKernel::ShadeShadow,
        ]
        .into_iter()
        .max_by_key(|kernel| self.queues.num_queued(*kernel))
        .filter(|kernel| self.queues.num_queued(*kernel) > 0);
        if shadow.is_some() {
            return shadow;
        }

        let position = IntegratorKernel::ALL
            .iter()
            .position_max_by_key(|kernel| self.queues.num_queued(**kernel))?;
        let kernel = IntegratorKernel::ALL[position];
        (self.queues.num_queued(kernel) > 0).then_some(kernel)
    }

    /// Gathers every path queued for `kernel` and dispatches one kernel
    /// invocation per path, then waits for the round to complete.
    fn dispatch_round(&self, kernel: IntegratorKernel, buffer: &RenderBuffer) {
        let shadow = is_shadow_kernel(kernel);
        let indices: Vec<usize> = (0..self.store.len())
            .filter(|&index| {
                let tag = unsafe {
                    if shadow {
                        self.store.shadow_queued_kernel(index)
                    } else {
                        self.store.queued_kernel(index)
                    }
                };
                tag == Some(kernel)
            })
            .collect();
        debug_assert_eq!(indices.len(), self.queues.num_queued(kernel) as usize);

        trace!("Dispatching {kernel} over {} paths", indices.len());
        let store = &self.store;
        let services = self.services.as_ref();
        let queues = &self.queues;
        let params = &self.params;
        self.queue.enqueue(
            DeviceKernel::Integrator(kernel),
            indices.len(),
            &|i| {
                let state = unsafe { store.get_mut(indices[i]) };
                dispatch_kernel(kernel, state, services, queues, params, buffer);
            },
        );
        self.queue.synchronize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use device::CpuQueue;
    use float_cmp::approx_eq;
    use kernel::film::BufferParams;
    use kernel::integrate::{BounceRay, ClosestHit, ShadowSample, SurfaceSample};
    use kernel::{Isect, PassType, Ray};
    use util::{Float, Float3};

    /// Orthographic rays down +z toward a diffuse plane at z = 5, a light
    /// sampled through a half-transparent layer at z = 7. Every pixel
    /// sample contributes exactly (0.5, 0.25, 0.125) to the combined pass.
    struct LitPlaneScene;

    impl SceneServices for LitPlaneScene {
        fn camera_ray(&self, x: u32, y: u32, _sample: u32) -> Ray {
            Ray {
                p: Float3::new(x as Float + 0.5, y as Float + 0.5, 0.0),
                d: Float3::new(0.0, 0.0, 1.0),
                t: 100.0,
            }
        }

        fn intersect_closest(&self, ray: &Ray) -> ClosestHit {
            if ray.p.z < 5.0 {
                ClosestHit::Surface(Isect {
                    t: 5.0 - ray.p.z,
                    object: 0,
                    prim: 0,
                })
            } else {
                ClosestHit::Miss
            }
        }

        fn intersect_shadow(&self, ray: &Ray, isects: &mut [Isect]) -> u32 {
            let t = (7.0 - ray.p.z) / ray.d.z;
            if t > 0.0 && t < ray.t {
                isects[0] = Isect {
                    t,
                    object: 1,
                    prim: 0,
                };
                1
            } else {
                0
            }
        }

        fn shade_surface(&self, ray: &Ray, isect: &Isect, _bounce: u32) -> SurfaceSample {
            SurfaceSample {
                shadow: Some(ShadowSample {
                    ray: Ray {
                        p: ray.at(isect.t),
                        d: Float3::new(0.0, 0.0, 1.0),
                        t: 10.0,
                    },
                    contribution: Float3::new(1.0, 0.5, 0.25),
                }),
                ..SurfaceSample::default()
            }
        }

        fn surface_transparency(&self, _ray: &Ray, isect: &Isect) -> Float3 {
            if isect.object == 1 {
                Float3::new(0.5, 0.5, 0.5)
            } else {
                Float3::zero()
            }
        }
    }

    fn combined_buffer(width: usize, height: usize) -> RenderBuffer {
        let mut params = BufferParams::new(width, height);
        params.add_pass(PassType::Combined);
        RenderBuffer::new(params)
    }

    fn path_trace(params: RenderParams, num_paths: usize) -> PathTrace {
        PathTrace::new(
            Arc::new(CpuQueue::new(4).unwrap()),
            Arc::new(LitPlaneScene),
            params,
            num_paths,
        )
        .unwrap()
    }

    #[test]
    fn rejects_zero_path_slots() {
        let result: Result<PathTrace, String> = PathTrace::new(
            Arc::new(CpuQueue::new(1).unwrap()),
            Arc::new(LitPlaneScene),
            RenderParams::default(),
            0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn wavefront_render_reaches_quiescence() {
        let params = RenderParams {
            width: 4,
            height: 4,
            num_samples: 2,
            ..RenderParams::default()
        };
        let buffer = combined_buffer(4, 4);
        // Fewer slots than samples, forcing several refill generations.
        let mut tracer = path_trace(params, 8);

        let status = tracer.render(&buffer, &AtomicBool::new(false));
        assert_eq!(status, RenderStatus::Complete);
        assert!(tracer.queues().is_empty());
        for index in 0..tracer.store().len() {
            let state = unsafe { tracer.store().get(index) };
            assert!(state.is_terminated());
            assert!(state.shadow_is_terminated());
        }

        let expected = Float3::new(0.5, 0.25, 0.125) * params.num_samples as Float;
        for y in 0..4 {
            for x in 0..4 {
                let base = buffer.params.pixel_index(x, y);
                assert!(approx_eq!(f32, buffer.get(base), expected.x, epsilon = 1e-5));
                assert!(approx_eq!(f32, buffer.get(base + 1), expected.y, epsilon = 1e-5));
                assert!(approx_eq!(f32, buffer.get(base + 2), expected.z, epsilon = 1e-5));
                assert_eq!(buffer.get(base + 3), params.num_samples as Float);
            }
        }
    }

    #[test]
    fn megakernel_matches_wavefront() {
        let params = RenderParams {
            width: 3,
            height: 2,
            num_samples: 4,
            ..RenderParams::default()
        };
        let cancel = AtomicBool::new(false);

        let wavefront = combined_buffer(3, 2);
        let status = path_trace(params, 4).render(&wavefront, &cancel);
        assert_eq!(status, RenderStatus::Complete);

        let mega = combined_buffer(3, 2);
        let status = path_trace(params, 4).render_megakernel(&mega, &cancel);
        assert_eq!(status, RenderStatus::Complete);

        let a = wavefront.to_vec();
        let b = mega.to_vec();
        assert_eq!(a.len(), b.len());
        for (va, vb) in a.iter().zip(&b) {
            assert!(approx_eq!(f32, *va, *vb, epsilon = 1e-5));
        }
    }

    /// Next event estimation at pixel (0, 0) only; every path bounces
    /// straight ahead to the bounce limit with unoccluded shadow rays, so
    /// main queues run much deeper than the lone shadow queue.
    struct DeepBounceScene;

    impl SceneServices for DeepBounceScene {
        fn camera_ray(&self, x: u32, y: u32, _sample: u32) -> Ray {
            Ray {
                p: Float3::new(x as Float + 0.5, y as Float + 0.5, 0.0),
                d: Float3::new(0.0, 0.0, 1.0),
                t: 100.0,
            }
        }

        fn intersect_closest(&self, _ray: &Ray) -> ClosestHit {
            ClosestHit::Surface(Isect {
                t: 1.0,
                object: 0,
                prim: 0,
            })
        }

        fn intersect_shadow(&self, _ray: &Ray, _isects: &mut [Isect]) -> u32 {
            0
        }

        fn shade_surface(&self, ray: &Ray, isect: &Isect, _bounce: u32) -> SurfaceSample {
            let shadow = (ray.p.x < 1.0 && ray.p.y < 1.0).then(|| ShadowSample {
                ray: Ray {
                    p: ray.at(isect.t),
                    d: Float3::new(0.0, 1.0, 0.0),
                    t: 10.0,
                },
                contribution: Float3::new(1.0, 0.0, 0.0),
            });
            SurfaceSample {
                shadow,
                bounce: Some(BounceRay::Surface(Ray {
                    p: ray.at(isect.t),
                    d: ray.d,
                    t: 100.0,
                })),
                bounce_weight: Float3::new(0.9, 0.9, 0.9),
                ..SurfaceSample::default()
            }
        }

        fn surface_transparency(&self, _ray: &Ray, _isect: &Isect) -> Float3 {
            Float3::zero()
        }
    }

    #[test]
    fn single_slot_renders_every_generation() {
        let params = RenderParams {
            width: 2,
            height: 1,
            num_samples: 2,
            ..RenderParams::default()
        };
        let buffer = combined_buffer(2, 1);
        // One slot, four samples: every sample after the first reuses a
        // terminated slot.
        let mut tracer = path_trace(params, 1);

        let status = tracer.render(&buffer, &AtomicBool::new(false));
        assert_eq!(status, RenderStatus::Complete);
        assert!(tracer.queues().is_empty());
        for x in 0..2 {
            let base = buffer.params.pixel_index(x, 0);
            assert_eq!(buffer.get(base + 3), params.num_samples as Float);
        }
    }

    #[test]
    fn shadow_queues_drain_ahead_of_deeper_main_queues() {
        let params = RenderParams {
            width: 2,
            height: 2,
            num_samples: 2,
            ..RenderParams::default()
        };
        let cancel = AtomicBool::new(false);
        let tracer = |scene: Arc<dyn SceneServices>| {
            PathTrace::<SHADOW_ISECT_SIZE>::new(
                Arc::new(CpuQueue::new(4).unwrap()),
                scene,
                params,
                4,
            )
            .unwrap()
        };

        let wavefront = combined_buffer(2, 2);
        let status = tracer(Arc::new(DeepBounceScene)).render(&wavefront, &cancel);
        assert_eq!(status, RenderStatus::Complete);

        let mega = combined_buffer(2, 2);
        let status = tracer(Arc::new(DeepBounceScene)).render_megakernel(&mega, &cancel);
        assert_eq!(status, RenderStatus::Complete);

        // Pixel (0, 0) spawns one light sample per bounce; each must land
        // even while the main queues are deeper than the shadow queue.
        let per_sample: Float = (0..=params.max_bounce)
            .map(|b| 0.9_f32.powi(b as i32))
            .sum();
        let expected = per_sample * params.num_samples as Float;
        let base = wavefront.params.pixel_index(0, 0);
        assert!(approx_eq!(f32, wavefront.get(base), expected, epsilon = 1e-4));

        let a = wavefront.to_vec();
        let b = mega.to_vec();
        for (va, vb) in a.iter().zip(&b) {
            assert!(approx_eq!(f32, *va, *vb, epsilon = 1e-5));
        }
    }

    #[test]
    fn cancellation_stops_before_any_dispatch() {
        let params = RenderParams {
            width: 4,
            height: 4,
            num_samples: 1,
            ..RenderParams::default()
        };
        let buffer = combined_buffer(4, 4);
        let mut tracer = path_trace(params, 8);

        let status = tracer.render(&buffer, &AtomicBool::new(true));
        assert_eq!(status, RenderStatus::Cancelled);
        assert!(tracer.queues().is_empty());
        assert_eq!(buffer.get(3), 0.0); // No sample alpha recorded.
    }
}
