//! Type-erased tasks and the one-shot handles used to observe them.

use std::panic::{self, AssertUnwindSafe};

// Public API
mod error;
pub use self::error::JoinError;

mod join;
pub use self::join::JoinHandle;
pub(crate) use self::join::Promise;

/// Task result sent back through a [`JoinHandle`].
pub(crate) type Result<T> = std::result::Result<T, JoinError>;

/// A type-erased unit of work.
///
/// A `Task` owns exactly one callable and invokes it exactly once. The
/// callable lives behind a heap indirection, so every `Task` is the same
/// size regardless of what it wraps and moving a `Task` only moves a
/// pointer. Tasks are move-only; [`invoke`](Task::invoke) consumes the task,
/// so a second invocation (or invoking a moved-from task) does not compile.
pub struct Task {
    func: Box<dyn FnOnce() + Send>,
}

impl Task {
    /// Wraps a callable into a task.
    pub fn new<F>(func: F) -> Task
    where
        F: FnOnce() + Send + 'static,
    {
        Task {
            func: Box::new(func),
        }
    }

    /// Invokes the wrapped callable, consuming the task.
    pub fn invoke(self) {
        (self.func)();
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("Task").finish_non_exhaustive()
    }
}

/// This is the constructor for a packaged task. The callable is wrapped so
/// that its return value, or the payload of any panic it raises, is delivered
/// through the returned [`JoinHandle`]. If the task is dropped without ever
/// being invoked (pool shutdown with work still queued), the handle resolves
/// to [`JoinError::Abandoned`].
pub(crate) fn package<F, R>(func: F) -> (Task, JoinHandle<R>)
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let (promise, handle) = join::channel();

    let task = Task::new(move || {
        let result = panic::catch_unwind(AssertUnwindSafe(func));
        promise.complete(result.map_err(JoinError::Panic));
    });

    (task, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::assert_impl_all;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    assert_impl_all!(Task: Send);
    assert_impl_all!(JoinHandle<usize>: Send, Sync);

    #[test]
    fn invoke_runs_the_callable_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let task = Task::new({
            let calls = calls.clone();
            move || {
                calls.fetch_add(1, Ordering::Relaxed);
            }
        });

        task.invoke();
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn packaged_task_delivers_its_value() {
        let (task, handle) = package(|| 6 * 7);
        assert!(!handle.is_finished());

        task.invoke();
        assert!(handle.is_finished());
        assert_eq!(handle.join().unwrap(), 42);
    }

    #[test]
    fn packaged_task_captures_a_panic() {
        let (task, handle) = package(|| -> usize { panic!("boom") });

        // The panic must not escape the invocation.
        task.invoke();

        let err = handle.join().unwrap_err();
        assert!(err.is_panic());
        let payload = err.into_panic();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"boom"));
    }

    #[test]
    fn dropped_task_breaks_its_promise() {
        let (task, handle) = package(|| 1);
        drop(task);

        let err = handle.join().unwrap_err();
        assert!(err.is_abandoned());
        assert!(!err.is_panic());
    }
}
