use crate::pool::ThreadPool;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

pub(crate) type ThreadNameFn = Arc<dyn Fn() -> String + Send + Sync + 'static>;

fn default_thread_name_fn() -> ThreadNameFn {
    let counter = Arc::new(AtomicUsize::new(0));

    Arc::new(move || {
        let prev = counter.fetch_add(1, Ordering::Relaxed);
        format!("filch-worker-{}", prev)
    })
}

/// Builds a [`ThreadPool`] with non-default settings.
///
/// ```
/// let pool = filch::Builder::new()
///     .worker_threads(2)
///     .thread_name("sorter")
///     .build()
///     .unwrap();
///
/// assert_eq!(pool.num_threads(), 2);
/// ```
pub struct Builder {
    /// The number of worker threads.
    ///
    /// Defaults to one less than the number of CPUs, and never below 1.
    worker_threads: Option<usize>,

    /// Name fn used for threads spawned by the pool.
    pub(crate) thread_name: ThreadNameFn,

    /// Stack size used for threads spawned by the pool.
    pub(crate) thread_stack_size: Option<usize>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            worker_threads: None,
            thread_name: default_thread_name_fn(),
            thread_stack_size: None,
        }
    }

    /// Sets the number of worker threads.
    ///
    /// # Panics
    ///
    /// This function will panic if 0 is passed as an argument.
    pub fn worker_threads(&mut self, val: usize) -> &mut Self {
        assert!(val > 0, "Worker threads cannot be set to 0");
        self.worker_threads = Some(val);
        self
    }

    /// Sets the name of threads spawned by the pool.
    ///
    /// The default name is "filch-worker-{N}".
    pub fn thread_name(&mut self, val: impl Into<String>) -> &mut Self {
        let val = val.into();
        self.thread_name = Arc::new(move || val.clone());
        self
    }

    /// Sets a function used to generate the name of threads spawned by the
    /// pool.
    pub fn thread_name_fn<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.thread_name = Arc::new(f);
        self
    }

    /// Sets the stack size (in bytes) for worker threads.
    ///
    /// The actual stack size may be greater than this value if the platform
    /// specifies a minimal stack size.
    pub fn thread_stack_size(&mut self, val: usize) -> &mut Self {
        self.thread_stack_size = Some(val);
        self
    }

    /// Creates the configured [`ThreadPool`].
    ///
    /// Fails only if a worker thread cannot be spawned; workers spawned
    /// before the failure are shut down and joined before the error is
    /// returned.
    pub fn build(&mut self) -> io::Result<ThreadPool> {
        super::pool::build(self)
    }

    pub(crate) fn num_worker_threads(&self) -> usize {
        self.worker_threads.unwrap_or_else(default_worker_threads)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_worker_threads() -> usize {
    // Leave one CPU for the thread driving the pool.
    thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}
