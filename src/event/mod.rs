//! A thread-safe, type-keyed event dispatcher built on the concurrent
//! containers: a [`ConcurrentHashMap`](crate::ConcurrentHashMap) from event
//! type to a [`ConcurrentList`](crate::ConcurrentList) of listeners.

// Public API
mod dispatcher;
pub use self::dispatcher::{EventDispatcher, ListenerId};

#[cfg(test)]
mod tests;
