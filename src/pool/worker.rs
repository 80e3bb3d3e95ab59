use crate::pool::Shared;
use std::sync::Arc;
use std::thread;
use tracing::trace;

/// Worker thread body.
///
/// Waits on the start latch, then loops draining tasks — own stack first,
/// then the global queue, then the peers — until the shutdown flag is
/// observed between tasks. An idle iteration yields the CPU rather than
/// parking on a condition variable: a sleeping worker could miss work that
/// arrives by being stolen around rather than through a notified queue, and
/// yielding keeps pickup of new submissions prompt.
pub(crate) fn run(shared: Arc<Shared>) {
    shared.wait_until_started();
    if shared.is_shutdown() {
        // Construction failed after this thread was spawned; there may not
        // even be a full set of workers registered.
        return;
    }

    // Registration happens before the latch opens, so the entry must exist.
    let index = match shared.current_worker_index() {
        Some(index) => index,
        None => return,
    };
    trace!(index, "worker started");

    while !shared.is_shutdown() {
        if !(shared.run_local_task(index)
            || shared.run_global_task()
            || shared.run_stolen_task(index))
        {
            // Nothing runnable anywhere: give the CPU to a thread that may
            // be producing work.
            thread::yield_now();
        }
    }

    trace!(index, "worker stopped");
}
