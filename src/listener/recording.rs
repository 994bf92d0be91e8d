use super::{Listener, ListenerEvent};
use crate::core::State;
use crate::error::ServiceFailure;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Listener that records every callback it receives.
///
/// Useful in tests and for diagnostics. `wait_for` blocks until a number of
/// callbacks arrived, which is how deferred execution contexts are observed.
///
/// # Example
///
/// ```rust
/// use lifecycle_guard::{hooks, ExecutionContext, RecordingListener, Service, State};
/// use std::sync::Arc;
///
/// let service = Service::new(hooks::from_fn(
///     |ctx| ctx.notify_started().map_err(Into::into),
///     |ctx| ctx.notify_stopped().map_err(Into::into),
/// ));
/// let recorder = Arc::new(RecordingListener::new());
/// service.add_listener(Arc::clone(&recorder), ExecutionContext::inline());
///
/// service.start_async().unwrap();
/// service.stop_async();
///
/// assert_eq!(
///     recorder.states(),
///     vec![State::Starting, State::Running, State::Stopping, State::Terminated]
/// );
/// ```
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ListenerEvent>>,
    arrived: Condvar,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every callback received so far, in delivery order.
    pub fn events(&self) -> Vec<ListenerEvent> {
        self.lock().clone()
    }

    /// The state each received callback announced.
    pub fn states(&self) -> Vec<State> {
        self.lock().iter().map(ListenerEvent::state).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Block until at least `count` callbacks arrived. Returns false on
    /// timeout.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut events = self.lock();
        while events.len() < count {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            events = self
                .arrived
                .wait_timeout(events, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    fn push(&self, event: ListenerEvent) {
        self.lock().push(event);
        self.arrived.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ListenerEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Listener for RecordingListener {
    fn starting(&self) {
        self.push(ListenerEvent::Starting);
    }

    fn running(&self) {
        self.push(ListenerEvent::Running);
    }

    fn stopping(&self, from: State) {
        self.push(ListenerEvent::Stopping { from });
    }

    fn terminated(&self, from: State) {
        self.push(ListenerEvent::Terminated { from });
    }

    fn failed(&self, from: State, failure: &ServiceFailure) {
        self.push(ListenerEvent::Failed {
            from,
            failure: failure.clone(),
        });
    }
}
