//! Path state and the kernel scheduling protocol.
//!
//! Keeps track of which kernel each path executes next. There is a main
//! path for the camera ray walk; shadow rays for next event estimation
//! branch off into their own sub-path that may be computed in parallel
//! while the main path continues.
//!
//! Each kernel invocation on the main path must call exactly one of
//! [`PathState::path_init`], [`PathState::path_next`] or
//! [`PathState::path_terminate`], and each shadow kernel invocation exactly
//! one of the shadow equivalents. Mis-paired calls are a programming error
//! (caught by debug assertions), not a runtime-recoverable condition.

use crate::ray::Ray;
use crate::types::IntegratorKernel;
use crate::work_queue::QueueCounter;
use util::{Float, Float3, SyncCell};

/// Default capacity of the recorded shadow intersection array.
pub const SHADOW_ISECT_SIZE: usize = 4;

/// Capacity of the per-path volume stack.
pub const VOLUME_STACK_SIZE: usize = 8;

/// A recorded ray intersection.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Isect {
    /// Ray parameter of the hit.
    pub t: Float,

    /// Object identifier.
    pub object: u32,

    /// Primitive identifier within the object.
    pub prim: u32,
}

/// Bounded stack of the volumes currently enclosing a point on a path.
/// Fixed capacity to keep the per-path memory footprint predictable.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct VolumeStack {
    entries: [u32; VOLUME_STACK_SIZE],
    size: usize,
}

impl VolumeStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no volume encloses the path.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the number of enclosing volumes.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Pushes a volume id on entering a volume boundary. Entries past the
    /// fixed capacity are dropped.
    ///
    /// * `volume` - The volume object id.
    pub fn push(&mut self, volume: u32) {
        if self.size < VOLUME_STACK_SIZE {
            self.entries[self.size] = volume;
            self.size += 1;
        }
    }

    /// Pops the innermost volume on exiting a volume boundary.
    pub fn pop(&mut self) -> Option<u32> {
        if self.size == 0 {
            None
        } else {
            self.size -= 1;
            Some(self.entries[self.size])
        }
    }

    /// Returns the enclosing volume ids, innermost last.
    pub fn entries(&self) -> &[u32] {
        &self.entries[..self.size]
    }
}

/// State of the shadow sub-path spawned for next event estimation. Tracked
/// independently of the main path so shadow kernels can be scheduled in
/// parallel with the main path's continuation.
#[derive(Clone, Debug)]
pub struct ShadowPathState<const N: usize = SHADOW_ISECT_SIZE> {
    /// Kernel the shadow sub-path executes next; `None` when terminated.
    pub queued_kernel: Option<IntegratorKernel>,

    /// The shadow ray toward the light.
    pub ray: Ray,

    /// Unshadowed light contribution, attenuated by each transparent
    /// surface and volume segment the ray crosses.
    pub throughput: Float3,

    /// Number of transparent surfaces crossed so far.
    pub transparent_bounce: u32,

    /// Total intersections found by the last shadow intersection query.
    /// May exceed `N`; only the nearest `N` are recorded.
    pub num_hits: u32,

    /// Recorded intersections, ordered nearest-first by `t`.
    pub isect: [Isect; N],

    /// Volumes enclosing the shadow ray origin, copied from the main path
    /// when the sub-path is spawned.
    pub volume_stack: VolumeStack,

    #[cfg(debug_assertions)]
    transitioned: bool,
}

impl<const N: usize> Default for ShadowPathState<N> {
    fn default() -> Self {
        Self {
            queued_kernel: None,
            ray: Ray::default(),
            throughput: Float3::zero(),
            transparent_bounce: 0,
            num_hits: 0,
            isect: [Isect::default(); N],
            volume_stack: VolumeStack::new(),
            #[cfg(debug_assertions)]
            transitioned: false,
        }
    }
}

impl<const N: usize> ShadowPathState<N> {
    /// Returns true if the shadow intersection query found more hits than
    /// the recorded-hit storage could hold.
    pub fn has_remaining_hits(&self) -> bool {
        self.num_hits as usize >= N
    }

    /// Returns the number of hits actually recorded.
    pub fn num_recorded_hits(&self) -> usize {
        util::min(self.num_hits as usize, N)
    }

    #[cfg(debug_assertions)]
    fn take_transition(&mut self) {
        debug_assert!(
            !self.transitioned,
            "multiple shadow path transitions in one kernel dispatch"
        );
        self.transitioned = true;
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn take_transition(&mut self) {}
}

/// Per-path record of everything a kernel needs to continue the walk.
/// Mutated exclusively by the kernel currently owning the path; the
/// queued-kernel tag is the sole mutual-exclusion mechanism.
#[derive(Clone, Debug)]
pub struct PathState<const N: usize = SHADOW_ISECT_SIZE> {
    /// Kernel the main path executes next; `None` when terminated.
    pub queued_kernel: Option<IntegratorKernel>,

    /// Pixel x coordinate this path accumulates into.
    pub x: u32,

    /// Pixel y coordinate this path accumulates into.
    pub y: u32,

    /// Sample index within the pixel.
    pub sample: u32,

    /// The current main-path ray.
    pub ray: Ray,

    /// Running multiplicative light attenuation along the path.
    pub throughput: Float3,

    /// Number of main-path bounces taken.
    pub bounce: u32,

    /// Closest hit recorded by the last intersection kernel.
    pub isect: Option<Isect>,

    /// True if the recorded closest hit is on an emitter rather than a
    /// regular surface.
    pub hit_is_light: bool,

    /// Volumes currently enclosing the path.
    pub volume_stack: VolumeStack,

    /// The shadow sub-path.
    pub shadow: ShadowPathState<N>,

    #[cfg(debug_assertions)]
    transitioned: bool,
}

impl<const N: usize> Default for PathState<N> {
    fn default() -> Self {
        Self {
            queued_kernel: None,
            x: 0,
            y: 0,
            sample: 0,
            ray: Ray::default(),
            throughput: Float3::one(),
            bounce: 0,
            isect: None,
            hit_is_light: false,
            volume_stack: VolumeStack::new(),
            shadow: ShadowPathState::default(),
            #[cfg(debug_assertions)]
            transitioned: false,
        }
    }
}

impl<const N: usize> PathState<N> {
    /// Create a fresh, terminated path slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the main path is terminated.
    pub fn is_terminated(&self) -> bool {
        self.queued_kernel.is_none()
    }

    /// Returns true if the shadow sub-path is terminated.
    pub fn shadow_is_terminated(&self) -> bool {
        self.shadow.queued_kernel.is_none()
    }

    /// Marks the start of a kernel dispatch on this path, re-arming the
    /// debug-only once-per-dispatch transition guard for the state machine
    /// the kernel belongs to.
    ///
    /// * `kernel` - The kernel about to be invoked.
    pub fn begin_dispatch(&mut self, _kernel: IntegratorKernel) {
        #[cfg(debug_assertions)]
        {
            match _kernel {
                IntegratorKernel::IntersectShadow | IntegratorKernel::ShadeShadow => {
                    self.shadow.transitioned = false;
                }
                _ => self.transitioned = false,
            }
        }
    }

    /// Enqueues a freshly allocated path into its first kernel.
    ///
    /// * `queues` - The shared queue counters.
    /// * `next`   - The kernel to execute first.
    pub fn path_init(&mut self, queues: &QueueCounter, next: IntegratorKernel) {
        debug_assert!(self.queued_kernel.is_none(), "path_init on a live path");
        // Init starts a new lifetime for this machine; the guard left set
        // by the previous lifetime's terminate is re-armed here, since the
        // host dispatches init with explicit work items and no tag-based
        // `begin_dispatch`.
        #[cfg(debug_assertions)]
        {
            self.transitioned = false;
        }
        self.take_transition();
        queues.increment(next);
        self.queued_kernel = Some(next);
    }

    /// Moves the main path from one kernel to the next.
    ///
    /// * `queues`  - The shared queue counters.
    /// * `current` - The kernel that is executing this transition.
    /// * `next`    - The kernel to execute next.
    pub fn path_next(
        &mut self,
        queues: &QueueCounter,
        current: IntegratorKernel,
        next: IntegratorKernel,
    ) {
        debug_assert_eq!(self.queued_kernel, Some(current));
        self.take_transition();
        queues.decrement(current);
        queues.increment(next);
        self.queued_kernel = Some(next);
    }

    /// Terminates the main path.
    ///
    /// * `queues`  - The shared queue counters.
    /// * `current` - The kernel that is executing this transition.
    pub fn path_terminate(&mut self, queues: &QueueCounter, current: IntegratorKernel) {
        debug_assert_eq!(self.queued_kernel, Some(current));
        self.take_transition();
        queues.decrement(current);
        self.queued_kernel = None;
    }

    /// Enqueues the shadow sub-path into its first kernel.
    ///
    /// * `queues` - The shared queue counters.
    /// * `next`   - The kernel to execute first.
    pub fn shadow_path_init(&mut self, queues: &QueueCounter, next: IntegratorKernel) {
        debug_assert!(
            self.shadow.queued_kernel.is_none(),
            "shadow_path_init on a live shadow path"
        );
        // Spawning happens inside a main-kernel dispatch, which only
        // re-arms the main guard; a new sub-path lifetime re-arms its own.
        #[cfg(debug_assertions)]
        {
            self.shadow.transitioned = false;
        }
        self.shadow.take_transition();
        queues.increment(next);
        self.shadow.queued_kernel = Some(next);
    }

    /// Moves the shadow sub-path from one kernel to the next.
    ///
    /// * `queues`  - The shared queue counters.
    /// * `current` - The kernel that is executing this transition.
    /// * `next`    - The kernel to execute next.
    pub fn shadow_path_next(
        &mut self,
        queues: &QueueCounter,
        current: IntegratorKernel,
        next: IntegratorKernel,
    ) {
        debug_assert_eq!(self.shadow.queued_kernel, Some(current));
        self.shadow.take_transition();
        queues.decrement(current);
        queues.increment(next);
        self.shadow.queued_kernel = Some(next);
    }

    /// Terminates the shadow sub-path.
    ///
    /// * `queues`  - The shared queue counters.
    /// * `current` - The kernel that is executing this transition.
    pub fn shadow_path_terminate(&mut self, queues: &QueueCounter, current: IntegratorKernel) {
        debug_assert_eq!(self.shadow.queued_kernel, Some(current));
        self.shadow.take_transition();
        queues.decrement(current);
        self.shadow.queued_kernel = None;
    }

    #[cfg(debug_assertions)]
    fn take_transition(&mut self) {
        debug_assert!(
            !self.transitioned,
            "multiple path transitions in one kernel dispatch"
        );
        self.transitioned = true;
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn take_transition(&mut self) {}
}

/// Flat slab of path states addressed by path index. Workers get exclusive
/// mutable access to individual slots while the host observes tags between
/// dispatch rounds; the scheduling protocol is what keeps those uses
/// disjoint.
pub struct PathStateStore<const N: usize = SHADOW_ISECT_SIZE> {
    slots: Vec<SyncCell<PathState<N>>>,
}

impl<const N: usize> PathStateStore<N> {
    /// Create a store of terminated path slots.
    ///
    /// * `num_paths` - Number of path slots.
    pub fn new(num_paths: usize) -> Self {
        let slots = (0..num_paths)
            .map(|_| SyncCell::new(PathState::new()))
            .collect();
        Self { slots }
    }

    /// Returns the number of path slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the store has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns mutable access to one path's state.
    ///
    /// # Safety
    ///
    /// The caller must be the kernel invocation that currently owns this
    /// path index under the scheduling protocol; no other worker may touch
    /// the slot while the borrow is live.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_mut(&self, index: usize) -> &mut PathState<N> {
        self.slots[index].as_mut()
    }

    /// Returns shared access to one path's state.
    ///
    /// # Safety
    ///
    /// No kernel invocation may be mutating this slot; typically only valid
    /// between dispatch rounds, after the device queue has synchronized.
    pub unsafe fn get(&self, index: usize) -> &PathState<N> {
        self.slots[index].as_ref()
    }

    /// Reads a path's main queued-kernel tag.
    ///
    /// # Safety
    ///
    /// Same contract as [`Self::get`].
    pub unsafe fn queued_kernel(&self, index: usize) -> Option<IntegratorKernel> {
        self.get(index).queued_kernel
    }

    /// Reads a path's shadow queued-kernel tag.
    ///
    /// # Safety
    ///
    /// Same contract as [`Self::get`].
    pub unsafe fn shadow_queued_kernel(&self, index: usize) -> Option<IntegratorKernel> {
        self.get(index).shadow.queued_kernel
    }
}
