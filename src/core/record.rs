//! The per-service mutable record.

use super::history::TransitionHistory;
use super::state::State;
use crate::error::{LifecycleError, Operation, ServiceFailure};
use crate::listener::{ExecutionContext, Listener, ListenerEvent, ListenerRegistry, PendingDispatch};
use std::sync::Arc;
use tracing::debug;

/// Everything that changes over a service's lifetime.
///
/// Owned by one transition guard and only touched with its lock held.
pub(crate) struct ServiceRecord {
    service: Arc<str>,
    pub(crate) state: State,
    pub(crate) failure: Option<ServiceFailure>,
    pub(crate) transitions: u64,
    pub(crate) history: TransitionHistory,
    /// `stop_async` arrived while STARTING; honored once RUNNING is reached.
    pub(crate) stop_requested: bool,
    pub(crate) listeners: ListenerRegistry,
}

impl ServiceRecord {
    pub(crate) fn new(service: Arc<str>) -> Self {
        Self {
            listeners: ListenerRegistry::new(Arc::clone(&service)),
            service,
            state: State::New,
            failure: None,
            transitions: 0,
            history: TransitionHistory::new(),
            stop_requested: false,
        }
    }

    /// Apply one edge of the transition table and queue its callback for
    /// every listener.
    pub(crate) fn advance(&mut self, to: State, operation: Operation) -> Result<(), LifecycleError> {
        let from = self.state;
        if !from.can_transition_to(to) {
            return Err(LifecycleError::illegal(operation, from));
        }

        self.state = to;
        self.transitions += 1;
        self.history.record(from, to, self.transitions);
        debug!(
            service = %self.service,
            %from,
            %to,
            sequence = self.transitions,
            "lifecycle transition"
        );

        if let Some(event) = ListenerEvent::for_transition(from, to, self.failure.as_ref()) {
            self.listeners.enqueue(&event);
        }
        Ok(())
    }

    /// Register a listener, replaying every transition it missed.
    pub(crate) fn add_listener<L>(&mut self, listener: L, context: ExecutionContext) -> PendingDispatch
    where
        L: Listener + 'static,
    {
        let failure = self.failure.as_ref();
        let backlog = self
            .history
            .transitions()
            .iter()
            .filter_map(|t| ListenerEvent::for_transition(t.from, t.to, failure));
        self.listeners.register(listener, context, backlog)
    }
}
