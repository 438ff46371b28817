//! CPU backend.

use crate::queue::{Queue, WorkItemFn};
use kernel::DeviceKernel;

/// Work items handed to a worker thread at a time. Small enough to keep
/// the pool balanced when per-item cost varies, large enough to amortize
/// channel traffic.
const CHUNK_SIZE: usize = 64;

/// Thread-pool dispatch queue. Work is executed eagerly inside `enqueue`
/// by a scoped worker pool draining chunks from a bounded channel, so
/// `synchronize` has nothing left to wait for; the asynchronous contract
/// of [`Queue`] is still honored from the caller's point of view.
pub struct CpuQueue {
    num_threads: usize,
}

impl CpuQueue {
    /// Create a CPU queue.
    ///
    /// * `num_threads` - Number of worker threads; must be non-zero.
    pub fn new(num_threads: usize) -> Result<Self, String> {
        if num_threads == 0 {
            return Err("CPU queue requires at least one thread".to_string());
        }
        info!("CPU queue with {num_threads} threads");
        Ok(Self { num_threads })
    }
}

impl Queue for CpuQueue {
    fn enqueue(&self, kernel: DeviceKernel, work_size: usize, task: &WorkItemFn<'_>) {
        if work_size == 0 {
            return;
        }
        debug!("Dispatching {kernel} over {work_size} work items");

        let num_chunks = (work_size + CHUNK_SIZE - 1) / CHUNK_SIZE;

        crossbeam::scope(|scope| {
            let (tx, rx) = crossbeam_channel::bounded::<usize>(self.num_threads);

            // Spawn worker threads.
            for _ in 0..self.num_threads {
                let rxc = rx.clone();
                scope.spawn(move |_| {
                    for chunk in rxc.iter() {
                        let start = chunk * CHUNK_SIZE;
                        let end = (start + CHUNK_SIZE).min(work_size);
                        for index in start..end {
                            task(index);
                        }
                    }
                });
            }
            drop(rx); // Drop extra rx since we've cloned one for each worker.

            // Send work.
            for chunk in 0..num_chunks {
                tx.send(chunk).unwrap();
            }
        })
        .unwrap();
    }

    fn synchronize(&self) {
        // Work completed inside enqueue; nothing outstanding.
    }

    fn num_threads(&self) -> usize {
        self.num_threads
    }
}
