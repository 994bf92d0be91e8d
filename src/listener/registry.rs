use super::executor::ExecutionContext;
use super::queue::{ListenerQueue, PendingDispatch};
use super::{Listener, ListenerEvent};
use crate::core::State;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};

/// A listener callback that panicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListenerFailure {
    /// Type name of the listener
    pub listener: &'static str,
    /// Callback that panicked
    pub event: &'static str,
    /// State the callback announced
    pub state: State,
    pub message: String,
}

/// Side channel for listener failures, shared by every queue of a service.
#[derive(Debug, Default)]
pub(crate) struct ListenerFailures {
    entries: Mutex<Vec<ListenerFailure>>,
}

impl ListenerFailures {
    pub(crate) fn push(&self, failure: ListenerFailure) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure);
    }

    pub(crate) fn snapshot(&self) -> Vec<ListenerFailure> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Ordered set of listener queues for one service.
///
/// Lives inside the service record; every method is called with the record
/// lock held.
pub(crate) struct ListenerRegistry {
    service: Arc<str>,
    queues: Vec<Arc<ListenerQueue>>,
    failures: Arc<ListenerFailures>,
}

impl ListenerRegistry {
    pub(crate) fn new(service: Arc<str>) -> Self {
        Self {
            service,
            queues: Vec::new(),
            failures: Arc::new(ListenerFailures::default()),
        }
    }

    /// Register a listener with its missed callbacks already queued, ahead
    /// of anything a later transition adds.
    pub(crate) fn register<L>(
        &mut self,
        listener: L,
        context: ExecutionContext,
        backlog: impl IntoIterator<Item = ListenerEvent>,
    ) -> PendingDispatch
    where
        L: Listener + 'static,
    {
        let queue = Arc::new(ListenerQueue::new(
            Box::new(listener),
            std::any::type_name::<L>(),
            context,
            Arc::clone(&self.service),
            Arc::clone(&self.failures),
        ));
        for event in backlog {
            queue.push(event);
        }
        self.queues.push(Arc::clone(&queue));
        PendingDispatch::new(vec![queue])
    }

    /// Queue `event` for every listener, in registration order.
    pub(crate) fn enqueue(&self, event: &ListenerEvent) {
        for queue in &self.queues {
            queue.push(event.clone());
        }
    }

    /// Copy of the current queues, drained after the lock is released.
    pub(crate) fn pending(&self) -> PendingDispatch {
        PendingDispatch::new(self.queues.clone())
    }

    pub(crate) fn len(&self) -> usize {
        self.queues.len()
    }

    pub(crate) fn failures(&self) -> Vec<ListenerFailure> {
        self.failures.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::RecordingListener;

    #[test]
    fn register_replays_backlog_before_live_events() {
        let mut registry = ListenerRegistry::new(Arc::from("svc"));
        let recorder = Arc::new(RecordingListener::new());

        let pending = registry.register(
            Arc::clone(&recorder),
            ExecutionContext::inline(),
            [ListenerEvent::Starting, ListenerEvent::Running],
        );
        registry.enqueue(&ListenerEvent::Stopping {
            from: State::Running,
        });
        pending.run();

        assert_eq!(
            recorder.states(),
            vec![State::Starting, State::Running, State::Stopping]
        );
    }

    #[test]
    fn enqueue_reaches_every_listener() {
        let mut registry = ListenerRegistry::new(Arc::from("svc"));
        let first = Arc::new(RecordingListener::new());
        let second = Arc::new(RecordingListener::new());
        registry
            .register(Arc::clone(&first), ExecutionContext::inline(), [])
            .run();
        registry
            .register(Arc::clone(&second), ExecutionContext::inline(), [])
            .run();

        registry.enqueue(&ListenerEvent::Starting);
        registry.pending().run();

        assert_eq!(registry.len(), 2);
        assert_eq!(first.states(), vec![State::Starting]);
        assert_eq!(second.states(), vec![State::Starting]);
    }

    #[test]
    fn failure_label_is_the_listener_type() {
        struct Grumpy;
        impl Listener for Grumpy {
            fn starting(&self) {
                panic!("no");
            }
        }

        let mut registry = ListenerRegistry::new(Arc::from("svc"));
        registry
            .register(Grumpy, ExecutionContext::inline(), [ListenerEvent::Starting])
            .run();

        let failures = registry.failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].listener.ends_with("Grumpy"));
    }
}
