use crate::container::{ConcurrentHashMap, ConcurrentQueue, ConcurrentStack};
use crate::pool::{worker, Builder};
use crate::task::{self, JoinHandle, Task};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, warn};

/// A work-stealing thread pool.
///
/// Work submitted with [`submit`](ThreadPool::submit) runs on one of a fixed
/// set of worker threads; the returned [`JoinHandle`] resolves with the
/// task's value, its panic, or [`JoinError::Abandoned`] if the pool shuts
/// down before the task runs.
///
/// Once a worker picks a task it runs it to completion; nothing is
/// interrupted or retried, and a panicking task is captured into its handle
/// without costing the pool a worker. The pool promises every task is
/// invoked at most once and makes no ordering promise between tasks.
///
/// Dropping the pool signals shutdown and joins the workers; tasks still
/// queued at that point are dropped, not drained. Callers that need
/// completion must quiesce submissions and wait on their handles first.
///
/// [`JoinError::Abandoned`]: crate::JoinError::Abandoned
pub struct ThreadPool {
    pub(super) shared: Arc<Shared>,
    workers: Vec<thread::JoinHandle<()>>,
}

/// State shared between the pool handle and its workers.
pub(crate) struct Shared {
    /// Start latch. Workers spin on this until construction has published
    /// the queues and the fully populated worker-index map.
    started: AtomicBool,

    /// Signals workers to exit after the task they are currently running.
    shutdown: AtomicBool,

    /// Maps a worker's thread id to its index in `locals`. Insert-only
    /// during construction, read-only afterwards.
    worker_index: ConcurrentHashMap<ThreadId, usize>,

    /// Global FIFO queue for tasks submitted from non-worker threads.
    pub(super) injector: ConcurrentQueue<Task>,

    /// Per-worker LIFO stacks. A worker submits to and pops from its own;
    /// peers steal from it when they run dry.
    pub(super) locals: Vec<ConcurrentStack<Task>>,
}

impl ThreadPool {
    /// Creates a pool with `num_threads` workers (raised to 1 if 0 is
    /// passed) and default thread settings.
    pub fn new(num_threads: usize) -> io::Result<ThreadPool> {
        Builder::new().worker_threads(num_threads.max(1)).build()
    }

    /// Returns the number of worker threads.
    pub fn num_threads(&self) -> usize {
        self.shared.locals.len()
    }

    /// Submits a callable to the pool, returning a handle to its result.
    ///
    /// Submissions from a worker thread go onto that worker's local stack;
    /// submissions from any other thread go onto the global queue.
    pub fn submit<F, R>(&self, func: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (task, handle) = task::package(func);

        match self.shared.current_worker_index() {
            Some(index) => self.shared.locals[index].push(task),
            None => self.shared.injector.push(task),
        }

        handle
    }

    /// Runs one pending task on the calling thread, if there is one.
    /// Returns true if a task was run.
    ///
    /// A false return only means nothing was runnable at that instant;
    /// another thread may submit more work immediately after.
    pub fn run_pending_task(&self) -> bool {
        self.shared.run_pending_task()
    }

    /// Drains pending tasks on the calling thread until `handle` is ready.
    ///
    /// This is what makes recursive fork/join safe: a task that spawned
    /// subtasks and needs their results calls this instead of blocking in
    /// [`JoinHandle::join`], so the worker keeps contributing progress. If
    /// every worker merely blocked, a pool whose workers all wait on
    /// subtasks would deadlock.
    pub fn run_pending_tasks<T>(&self, handle: &JoinHandle<T>) {
        while !handle.is_finished() {
            self.run_pending_task();
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        debug!("thread pool shutting down");

        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        // Tasks still queued are dropped along with `shared`; their handles
        // resolve to `JoinError::Abandoned`.
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("ThreadPool")
            .field("num_threads", &self.num_threads())
            .finish_non_exhaustive()
    }
}

pub(crate) fn build(builder: &Builder) -> io::Result<ThreadPool> {
    let num_threads = builder.num_worker_threads();

    // Every local stack exists before any worker can run, so a steal probe
    // never finds a missing slot.
    let shared = Arc::new(Shared {
        started: AtomicBool::new(false),
        shutdown: AtomicBool::new(false),
        worker_index: ConcurrentHashMap::new(),
        injector: ConcurrentQueue::new(),
        locals: (0..num_threads).map(|_| ConcurrentStack::new()).collect(),
    });

    let mut workers: Vec<thread::JoinHandle<()>> = Vec::with_capacity(num_threads);
    for index in 0..num_threads {
        let mut thread_builder = thread::Builder::new().name((builder.thread_name)());
        if let Some(stack_size) = builder.thread_stack_size {
            thread_builder = thread_builder.stack_size(stack_size);
        }

        let spawned = {
            let shared = Arc::clone(&shared);
            thread_builder.spawn(move || worker::run(shared))
        };

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                warn!(worker = index, error = %e, "failed to spawn worker thread");
                // The shutdown store is sequenced before the latch release,
                // so every worker released below observes it before trying
                // to run a task.
                shared.shutdown.store(true, Ordering::Relaxed);
                shared.started.store(true, Ordering::Release);
                for worker in workers {
                    let _ = worker.join();
                }
                return Err(e);
            }
        };

        shared.worker_index.insert(handle.thread().id(), index);
        workers.push(handle);
    }

    // Publish the queues and the fully populated index map, then open the
    // start latch.
    shared.started.store(true, Ordering::Release);

    Ok(ThreadPool { shared, workers })
}

impl Shared {
    /// Spin until construction opens the start latch.
    pub(crate) fn wait_until_started(&self) {
        while !self.started.load(Ordering::Acquire) {
            thread::yield_now();
        }
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Looks up the calling thread's worker index, or `None` if the caller
    /// is not one of this pool's workers.
    pub(crate) fn current_worker_index(&self) -> Option<usize> {
        self.worker_index
            .get(&thread::current().id())
            .map(|index| *index)
    }

    pub(crate) fn run_pending_task(&self) -> bool {
        match self.current_worker_index() {
            Some(index) => {
                self.run_local_task(index)
                    || self.run_global_task()
                    || self.run_stolen_task(index)
            }
            // Non-workers have no local stack; probe the peers from slot 0.
            None => self.run_global_task() || self.run_stolen_task(0),
        }
    }

    pub(crate) fn run_local_task(&self, index: usize) -> bool {
        Self::run(self.locals[index].try_pop())
    }

    pub(crate) fn run_global_task(&self) -> bool {
        Self::run(self.injector.try_pop())
    }

    pub(crate) fn run_stolen_task(&self, index: usize) -> bool {
        Self::run(self.steal_task(index))
    }

    /// Probes the other workers' stacks in circular order starting just
    /// after `index`, taking the first task found.
    fn steal_task(&self, index: usize) -> Option<Task> {
        let num_threads = self.locals.len();
        (1..num_threads).find_map(|offset| self.locals[(index + offset) % num_threads].try_pop())
    }

    fn run(task: Option<Task>) -> bool {
        match task {
            Some(task) => {
                task.invoke();
                true
            }
            None => false,
        }
    }
}
