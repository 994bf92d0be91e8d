//! Lifecycle error types.

use crate::core::State;
use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Boxed error accepted from hooks and `notify_failed`.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Operation that was attempted when an error was raised.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Operation {
    Start,
    Stop,
    NotifyStarted,
    NotifyStopped,
    NotifyFailed,
    AwaitRunning,
    AwaitTerminated,
}

impl Operation {
    pub const fn name(self) -> &'static str {
        match self {
            Operation::Start => "start",
            Operation::Stop => "stop",
            Operation::NotifyStarted => "notify started",
            Operation::NotifyStopped => "notify stopped",
            Operation::NotifyFailed => "notify failed",
            Operation::AwaitRunning => "await running",
            Operation::AwaitTerminated => "await terminated",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors surfaced by lifecycle operations.
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    /// The requested edge is not in the transition table, or a completion
    /// was reported twice.
    #[error("cannot {operation} a service in state {state}")]
    IllegalStateTransition { operation: Operation, state: State },

    #[error("timed out after {waited:?} waiting for {expected} (service is {actual})")]
    Timeout {
        expected: State,
        actual: State,
        waited: Duration,
    },

    #[error(transparent)]
    ServiceFailure(#[from] ServiceFailure),
}

impl LifecycleError {
    pub(crate) fn illegal(operation: Operation, state: State) -> Self {
        LifecycleError::IllegalStateTransition { operation, state }
    }

    pub fn is_illegal_transition(&self) -> bool {
        matches!(self, LifecycleError::IllegalStateTransition { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LifecycleError::Timeout { .. })
    }

    /// The captured failure, if this error carries one.
    pub fn failure(&self) -> Option<&ServiceFailure> {
        match self {
            LifecycleError::ServiceFailure(failure) => Some(failure),
            _ => None,
        }
    }
}

/// A failure captured by `notify_failed`.
///
/// Stored once in the service record; every waiter and listener receives a
/// clone that shares the same underlying cause.
#[derive(Clone)]
pub struct ServiceFailure {
    from: State,
    cause: Arc<dyn StdError + Send + Sync + 'static>,
}

impl ServiceFailure {
    pub(crate) fn new(from: State, cause: BoxError) -> Self {
        Self {
            from,
            cause: Arc::from(cause),
        }
    }

    /// The state the service was in when it failed (`Starting` or `Stopping`).
    pub fn from_state(&self) -> State {
        self.from
    }

    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.cause
    }

    /// True when both values share the same captured cause.
    pub fn same_cause(&self, other: &ServiceFailure) -> bool {
        Arc::ptr_eq(&self.cause, &other.cause)
    }
}

impl fmt::Debug for ServiceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceFailure")
            .field("from", &self.from)
            .field("cause", &self.cause.to_string())
            .finish()
    }
}

impl fmt::Display for ServiceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service failed while {}: {}", self.from, self.cause)
    }
}

impl StdError for ServiceFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.cause)
    }
}

/// Which hook an error or log line refers to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Hook {
    Start,
    Stop,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::Start => f.write_str("start"),
            Hook::Stop => f.write_str("stop"),
        }
    }
}

/// Failure cause recorded when a hook panics.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{hook} hook panicked: {message}")]
pub struct HookPanic {
    pub hook: Hook,
    pub message: String,
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
