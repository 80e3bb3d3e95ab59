use std::any::Any;
use std::fmt;

/// Returned when a submitted task fails to produce a value.
#[derive(thiserror::Error)]
pub enum JoinError {
    /// The task ran and panicked. The panic payload is carried so the
    /// submitter can observe or re-raise it.
    #[error("task panicked")]
    Panic(Box<dyn Any + Send + 'static>),

    /// The task was dropped before it ever ran. This is what the handle of a
    /// still-queued task observes after its pool shuts down.
    #[error("task was abandoned before it could run")]
    Abandoned,
}

impl JoinError {
    /// Returns true if the task terminated by panicking.
    pub fn is_panic(&self) -> bool {
        matches!(self, JoinError::Panic(_))
    }

    /// Returns true if the task was dropped without running.
    pub fn is_abandoned(&self) -> bool {
        matches!(self, JoinError::Abandoned)
    }

    /// Consumes the error, returning the panic payload.
    ///
    /// # Panics
    ///
    /// Panics if the error is not [`JoinError::Panic`]. Check
    /// [`is_panic`](JoinError::is_panic) first.
    pub fn into_panic(self) -> Box<dyn Any + Send + 'static> {
        match self {
            JoinError::Panic(payload) => payload,
            JoinError::Abandoned => panic!("`JoinError` is not a panic"),
        }
    }
}

// The panic payload is an opaque `dyn Any`, so Debug is written by hand.
impl fmt::Debug for JoinError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinError::Panic(_) => fmt.write_str("JoinError::Panic(..)"),
            JoinError::Abandoned => fmt.write_str("JoinError::Abandoned"),
        }
    }
}
