//! Lifecycle observers.
//!
//! A [`Listener`] is registered together with an [`ExecutionContext`] and
//! receives one callback per transition, in transition order. Listeners
//! registered late are first replayed everything they missed.

mod executor;
mod queue;
mod recording;
mod registry;

pub use executor::{DirectExecutor, ExecutionContext, Executor, Task, ThreadExecutor};
pub use recording::RecordingListener;
pub use registry::ListenerFailure;

pub(crate) use queue::PendingDispatch;
pub(crate) use registry::ListenerRegistry;

use crate::core::State;
use crate::error::ServiceFailure;
use std::sync::Arc;

/// Observer of service transitions.
///
/// Every method has an empty default so observers only implement what they
/// care about. Callbacks run without any service lock held and may call
/// back into the service.
pub trait Listener: Send + Sync {
    /// NEW -> STARTING
    fn starting(&self) {}

    /// STARTING -> RUNNING
    fn running(&self) {}

    /// RUNNING -> STOPPING
    fn stopping(&self, _from: State) {}

    /// Entered TERMINATED. `from` is `Stopping`, or `New` for a service
    /// stopped before it was ever started.
    fn terminated(&self, _from: State) {}

    /// Entered FAILED from `from`.
    fn failed(&self, _from: State, _failure: &ServiceFailure) {}
}

impl<L: Listener + ?Sized> Listener for Arc<L> {
    fn starting(&self) {
        (**self).starting();
    }

    fn running(&self) {
        (**self).running();
    }

    fn stopping(&self, from: State) {
        (**self).stopping(from);
    }

    fn terminated(&self, from: State) {
        (**self).terminated(from);
    }

    fn failed(&self, from: State, failure: &ServiceFailure) {
        (**self).failed(from, failure);
    }
}

/// A single callback owed to a listener.
#[derive(Debug, Clone)]
pub enum ListenerEvent {
    Starting,
    Running,
    Stopping { from: State },
    Terminated { from: State },
    Failed { from: State, failure: ServiceFailure },
}

impl ListenerEvent {
    /// The callback a transition produces. `None` for edges that produce
    /// no callback, or for `Failed` without a captured failure.
    pub(crate) fn for_transition(
        from: State,
        to: State,
        failure: Option<&ServiceFailure>,
    ) -> Option<Self> {
        match to {
            State::New => None,
            State::Starting => Some(ListenerEvent::Starting),
            State::Running => Some(ListenerEvent::Running),
            State::Stopping => Some(ListenerEvent::Stopping { from }),
            State::Terminated => Some(ListenerEvent::Terminated { from }),
            State::Failed => failure.map(|failure| ListenerEvent::Failed {
                from,
                failure: failure.clone(),
            }),
        }
    }

    /// The state the service entered.
    pub fn state(&self) -> State {
        match self {
            ListenerEvent::Starting => State::Starting,
            ListenerEvent::Running => State::Running,
            ListenerEvent::Stopping { .. } => State::Stopping,
            ListenerEvent::Terminated { .. } => State::Terminated,
            ListenerEvent::Failed { .. } => State::Failed,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ListenerEvent::Starting => "starting",
            ListenerEvent::Running => "running",
            ListenerEvent::Stopping { .. } => "stopping",
            ListenerEvent::Terminated { .. } => "terminated",
            ListenerEvent::Failed { .. } => "failed",
        }
    }

    pub(crate) fn deliver(&self, listener: &dyn Listener) {
        match self {
            ListenerEvent::Starting => listener.starting(),
            ListenerEvent::Running => listener.running(),
            ListenerEvent::Stopping { from } => listener.stopping(*from),
            ListenerEvent::Terminated { from } => listener.terminated(*from),
            ListenerEvent::Failed { from, failure } => listener.failed(*from, failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_map_to_callbacks() {
        assert!(matches!(
            ListenerEvent::for_transition(State::New, State::Starting, None),
            Some(ListenerEvent::Starting)
        ));
        assert!(matches!(
            ListenerEvent::for_transition(State::New, State::Terminated, None),
            Some(ListenerEvent::Terminated { from: State::New })
        ));
        assert!(matches!(
            ListenerEvent::for_transition(State::Running, State::Stopping, None),
            Some(ListenerEvent::Stopping {
                from: State::Running
            })
        ));
    }

    #[test]
    fn failed_transition_needs_a_failure() {
        assert!(ListenerEvent::for_transition(State::Starting, State::Failed, None).is_none());

        let failure = ServiceFailure::new(State::Starting, "boom".into());
        let event =
            ListenerEvent::for_transition(State::Starting, State::Failed, Some(&failure)).unwrap();
        assert_eq!(event.state(), State::Failed);
        assert_eq!(event.name(), "failed");
    }

    #[test]
    fn arc_listener_delegates() {
        let recorder = Arc::new(RecordingListener::new());
        let shared: Arc<RecordingListener> = Arc::clone(&recorder);
        ListenerEvent::Starting.deliver(&shared);
        ListenerEvent::Running.deliver(&shared);

        assert_eq!(recorder.states(), vec![State::Starting, State::Running]);
    }
}
