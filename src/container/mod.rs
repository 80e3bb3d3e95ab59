//! Fine-grained-locking concurrent containers.
//!
//! Each container synchronizes internally and is operated entirely through
//! `&self`; none of them is `Clone`. Absence is reported with `None`, never
//! an error. Every container keeps an atomic element counter that is updated
//! under the same lock as the structural change it describes, so `len` is
//! always consistent with what a traversal would observe.

// Public API
pub mod list;
pub use self::list::ConcurrentList;

pub mod map;
pub use self::map::ConcurrentHashMap;

pub mod queue;
pub use self::queue::ConcurrentQueue;

pub mod stack;
pub use self::stack::ConcurrentStack;
