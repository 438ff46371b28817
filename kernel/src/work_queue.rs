//! Per-kernel work queue counters.

use crate::types::{IntegratorKernel, NUM_INTEGRATOR_KERNELS};
use std::sync::atomic::{AtomicU32, Ordering};

/// Population counts of paths queued for each integrator kernel, shared by
/// all in-flight paths. Counts are updated with relaxed atomics only; they
/// are approximate, eventually-consistent snapshots used for kernel
/// selection and back-pressure, never for correctness.
#[derive(Debug, Default)]
pub struct QueueCounter {
    num_queued: [AtomicU32; NUM_INTEGRATOR_KERNELS],
}

impl QueueCounter {
    /// Create a new counter set with all queues empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the queue depth for a kernel.
    ///
    /// * `kernel` - The kernel being enqueued.
    pub fn increment(&self, kernel: IntegratorKernel) {
        self.num_queued[kernel.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Decrements the queue depth for a kernel.
    ///
    /// * `kernel` - The kernel being dequeued.
    pub fn decrement(&self, kernel: IntegratorKernel) {
        let prev = self.num_queued[kernel.index()].fetch_sub(1, Ordering::Relaxed);
        // Counters are unsigned; an underflow means mis-paired transition
        // calls, which is a programming error.
        debug_assert!(prev > 0, "queue counter underflow for {kernel}");
    }

    /// Returns the queue depth for a kernel.
    ///
    /// * `kernel` - The kernel.
    pub fn num_queued(&self, kernel: IntegratorKernel) -> u32 {
        self.num_queued[kernel.index()].load(Ordering::Relaxed)
    }

    /// Returns the total number of queued kernel invocations across all
    /// queues. Equals the number of live main + shadow paths at any
    /// consistent snapshot.
    pub fn total(&self) -> u32 {
        self.num_queued
            .iter()
            .map(|n| n.load(Ordering::Relaxed))
            .sum()
    }

    /// Returns true if no work is queued for any kernel.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_and_decrements() {
        let queues = QueueCounter::new();
        queues.increment(IntegratorKernel::IntersectClosest);
        queues.increment(IntegratorKernel::IntersectClosest);
        queues.increment(IntegratorKernel::ShadeShadow);
        assert_eq!(queues.num_queued(IntegratorKernel::IntersectClosest), 2);
        assert_eq!(queues.num_queued(IntegratorKernel::ShadeShadow), 1);
        assert_eq!(queues.total(), 3);

        queues.decrement(IntegratorKernel::IntersectClosest);
        queues.decrement(IntegratorKernel::ShadeShadow);
        assert_eq!(queues.total(), 1);
        assert!(!queues.is_empty());

        queues.decrement(IntegratorKernel::IntersectClosest);
        assert!(queues.is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic]
    fn underflow_asserts_in_debug() {
        let queues = QueueCounter::new();
        queues.decrement(IntegratorKernel::ShadeSurface);
    }

    mod conservation {
        use super::*;
        use proptest::prelude::*;

        fn kernels() -> impl Strategy<Value = IntegratorKernel> {
            (0..NUM_INTEGRATOR_KERNELS).prop_map(|i| IntegratorKernel::ALL[i])
        }

        proptest! {
            // Every init is one increment, every step one decrement plus
            // one increment, every terminate one decrement. Walking any
            // sequence of kernels must leave the counters empty.
            #[test]
            fn any_walk_drains_to_zero(walk in prop::collection::vec(kernels(), 0..64)) {
                let queues = QueueCounter::new();
                let mut current: Option<IntegratorKernel> = None;
                for next in walk {
                    match current {
                        None => queues.increment(next),
                        Some(kernel) => {
                            queues.decrement(kernel);
                            queues.increment(next);
                        }
                    }
                    prop_assert_eq!(queues.total(), 1);
                    current = Some(next);
                }
                if let Some(kernel) = current {
                    queues.decrement(kernel);
                }
                prop_assert!(queues.is_empty());
            }

            // Counts per kernel always equal enqueues minus dequeues.
            #[test]
            fn per_kernel_counts_are_exact(ops in prop::collection::vec(kernels(), 1..128)) {
                let queues = QueueCounter::new();
                let mut expected = [0_u32; NUM_INTEGRATOR_KERNELS];
                for kernel in &ops {
                    queues.increment(*kernel);
                    expected[kernel.index()] += 1;
                }
                for kernel in IntegratorKernel::ALL {
                    prop_assert_eq!(queues.num_queued(kernel), expected[kernel.index()]);
                }
                for kernel in &ops {
                    queues.decrement(*kernel);
                }
                prop_assert!(queues.is_empty());
            }
        }
    }
}
