//! Kernel dispatch interface.

use kernel::DeviceKernel;

/// A per-work-item kernel body. The index passed to the task is the work
/// item index in `[0, work_size)`; the dispatch guarantees each index is
/// handed to exactly one worker.
pub type WorkItemFn<'a> = dyn Fn(usize) + Send + Sync + 'a;

/// Asynchronous kernel dispatch plus a blocking completion barrier.
///
/// `enqueue` submits work and may return before the work has executed;
/// `synchronize` blocks the calling thread until everything previously
/// enqueued has completed. That barrier is the only blocking point the
/// integrator core relies on.
pub trait Queue: Send + Sync {
    /// Submits one kernel dispatch over `work_size` work items.
    ///
    /// * `kernel`    - Identifier of the kernel being dispatched, for
    ///                 logging and scheduling statistics.
    /// * `work_size` - Number of work items.
    /// * `task`      - The per-work-item kernel body.
    fn enqueue(&self, kernel: DeviceKernel, work_size: usize, task: &WorkItemFn<'_>);

    /// Blocks until all previously enqueued work has completed.
    fn synchronize(&self);

    /// Number of parallel lanes this queue dispatches across.
    fn num_threads(&self) -> usize;
}
