//! A work-stealing thread pool built on fine-grained-locking concurrent
//! containers.
//!
//! The pool accepts arbitrary `FnOnce` work from any thread and distributes
//! it across a fixed set of workers. Workers that run dry steal from their
//! peers, and a worker waiting on a submitted task can drain other pending
//! tasks in the meantime ([`ThreadPool::run_pending_tasks`]), which keeps
//! recursive fork/join submission patterns deadlock-free.
//!
//! The containers the pool is built on are exported in their own right:
//!
//! - [`ConcurrentStack`] — single-lock LIFO, used for per-worker task stacks.
//! - [`ConcurrentQueue`] — two-lock FIFO, used for the global injector queue.
//! - [`ConcurrentList`] — hand-over-hand locking linked list.
//! - [`ConcurrentHashMap`] — fixed-bucket hashtable of [`ConcurrentList`]s,
//!   used for the pool's thread-id to worker-index map.
//!
//! ```
//! let pool = filch::ThreadPool::new(4).unwrap();
//!
//! let handle = pool.submit(|| 6 * 7);
//! assert_eq!(handle.join().unwrap(), 42);
//! ```

pub mod container;
pub use container::{ConcurrentHashMap, ConcurrentList, ConcurrentQueue, ConcurrentStack};

pub mod event;
pub use event::EventDispatcher;

pub mod pool;
pub use pool::{Builder, ThreadPool};

pub mod task;
pub use task::{JoinError, JoinHandle, Task};
