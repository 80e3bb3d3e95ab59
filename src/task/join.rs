use crate::task::{JoinError, Result};
use parking_lot::{Condvar, Mutex};
use std::mem;
use std::sync::Arc;

/// An owned permission to join on a submitted task (wait for its result).
///
/// This is the thread-pool equivalent of [`std::thread::JoinHandle`]: the
/// task associated with it may start running as soon as it is submitted,
/// whether or not the handle is ever consulted. Dropping the handle detaches
/// the task — it still runs, but its result is discarded.
///
/// The handle becomes ready exactly once, when the task either returns a
/// value, panics ([`JoinError::Panic`]), or is dropped unrun at pool shutdown
/// ([`JoinError::Abandoned`]).
///
/// ```
/// let pool = filch::ThreadPool::new(2).unwrap();
///
/// let handle: filch::JoinHandle<i32> = pool.submit(|| 5 + 3);
/// assert_eq!(handle.join().unwrap(), 8);
/// ```
pub struct JoinHandle<T> {
    chan: Arc<Channel<T>>,
}

impl<T> JoinHandle<T> {
    /// Checks whether the task has finished, without blocking.
    ///
    /// Returns true once the task has produced a value, panicked, or been
    /// abandoned. This is the readiness probe that
    /// [`ThreadPool::run_pending_tasks`](crate::ThreadPool::run_pending_tasks)
    /// polls between draining other tasks.
    pub fn is_finished(&self) -> bool {
        !matches!(*self.chan.state.lock(), State::Pending)
    }

    /// Blocks the calling thread until the task finishes, then returns its
    /// result.
    ///
    /// Prefer [`ThreadPool::run_pending_tasks`](crate::ThreadPool::run_pending_tasks)
    /// over a bare `join` when calling from inside a task: a worker that
    /// blocks here contributes nothing while it waits, and if every worker
    /// does so the pool deadlocks.
    pub fn join(self) -> Result<T> {
        let mut state = self.chan.state.lock();
        while matches!(*state, State::Pending) {
            self.chan.ready.wait(&mut state);
        }

        match mem::replace(&mut *state, State::Taken) {
            State::Ready(result) => result,
            // `join` consumes the only handle, so the result can be taken
            // at most once and the loop above rules out `Pending`.
            _ => unreachable!("one-shot result already taken"),
        }
    }
}

impl<T> std::fmt::Debug for JoinHandle<T> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("JoinHandle")
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Producing side of the one-shot channel. Held by the packaged closure; if
/// it is dropped unfulfilled the handle observes [`JoinError::Abandoned`].
pub(crate) struct Promise<T> {
    chan: Arc<Channel<T>>,
}

impl<T> Promise<T> {
    pub(crate) fn complete(self, result: Result<T>) {
        self.chan.fulfill(result);
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        // No-op if `complete` already ran.
        self.chan.fulfill(Err(JoinError::Abandoned));
    }
}

pub(crate) fn channel<T>() -> (Promise<T>, JoinHandle<T>) {
    let chan = Arc::new(Channel {
        state: Mutex::new(State::Pending),
        ready: Condvar::new(),
    });

    (
        Promise { chan: chan.clone() },
        JoinHandle { chan },
    )
}

enum State<T> {
    Pending,
    Ready(Result<T>),
    Taken,
}

struct Channel<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
}

impl<T> Channel<T> {
    /// First fulfillment wins; later ones are dropped.
    fn fulfill(&self, result: Result<T>) {
        let mut state = self.state.lock();
        if matches!(*state, State::Pending) {
            *state = State::Ready(result);
            drop(state);
            self.ready.notify_all();
        }
    }
}
