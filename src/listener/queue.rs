//! Per-listener call queues.
//!
//! Events are pushed while the service record is locked, so each queue
//! holds its events in transition order. Draining happens after the record
//! lock is released, on the listener's execution context, by at most one
//! task at a time per queue.

use super::executor::ExecutionContext;
use super::registry::{ListenerFailure, ListenerFailures};
use super::{Listener, ListenerEvent};
use crate::error::panic_message;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, warn};

#[derive(Default)]
struct Calls {
    pending: VecDeque<ListenerEvent>,
    draining: bool,
}

pub(crate) struct ListenerQueue {
    listener: Box<dyn Listener>,
    label: &'static str,
    context: ExecutionContext,
    service: Arc<str>,
    failures: Arc<ListenerFailures>,
    calls: Mutex<Calls>,
}

impl ListenerQueue {
    pub(crate) fn new(
        listener: Box<dyn Listener>,
        label: &'static str,
        context: ExecutionContext,
        service: Arc<str>,
        failures: Arc<ListenerFailures>,
    ) -> Self {
        Self {
            listener,
            label,
            context,
            service,
            failures,
            calls: Mutex::new(Calls::default()),
        }
    }

    pub(crate) fn push(&self, event: ListenerEvent) {
        self.lock().pending.push_back(event);
    }

    /// Schedule a drain unless one is already scheduled or running.
    ///
    /// A panicking executor is logged and recorded, never propagated.
    pub(crate) fn dispatch(self: &Arc<Self>) {
        {
            let mut calls = self.lock();
            if calls.draining || calls.pending.is_empty() {
                return;
            }
            calls.draining = true;
        }
        let task = DrainTask {
            queue: Some(Arc::clone(self)),
        };
        let scheduled = panic::catch_unwind(AssertUnwindSafe(|| {
            self.context.execute(Box::new(move || task.run()))
        }));
        if let Err(payload) = scheduled {
            self.executor_panicked(panic_message(&*payload));
        }
    }

    fn drain(&self) {
        loop {
            let event = {
                let mut calls = self.lock();
                match calls.pending.pop_front() {
                    Some(event) => event,
                    None => {
                        calls.draining = false;
                        return;
                    }
                }
            };
            self.deliver(&event);
        }
    }

    /// The drain task was dropped without running.
    fn abandon(&self) {
        let mut calls = self.lock();
        calls.draining = false;
        warn!(
            service = %self.service,
            listener = self.label,
            context = self.context.label(),
            pending = calls.pending.len(),
            "listener drain task dropped without running"
        );
    }

    fn executor_panicked(&self, message: String) {
        error!(
            service = %self.service,
            listener = self.label,
            context = self.context.label(),
            "executor panicked: {message}"
        );
        let next = self
            .lock()
            .pending
            .front()
            .map(|event| (event.name(), event.state()));
        if let Some((event, state)) = next {
            self.failures.push(ListenerFailure {
                listener: self.label,
                event,
                state,
                message,
            });
        }
    }

    fn deliver(&self, event: &ListenerEvent) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| event.deliver(&*self.listener)));
        if let Err(payload) = outcome {
            let message = panic_message(&*payload);
            error!(
                service = %self.service,
                listener = self.label,
                event = event.name(),
                "listener panicked: {message}"
            );
            self.failures.push(ListenerFailure {
                listener: self.label,
                event: event.name(),
                state: event.state(),
                message,
            });
        }
    }

    fn lock(&self) -> MutexGuard<'_, Calls> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A scheduled drain. Releases the queue's drain slot if an executor drops
/// it unrun, so the next transition can schedule again.
struct DrainTask {
    queue: Option<Arc<ListenerQueue>>,
}

impl DrainTask {
    fn run(mut self) {
        if let Some(queue) = self.queue.take() {
            queue.drain();
        }
    }
}

impl Drop for DrainTask {
    fn drop(&mut self) {
        if let Some(queue) = self.queue.take() {
            queue.abandon();
        }
    }
}

/// Queues that received events in the last critical section, to be drained
/// once the record lock is released.
#[must_use = "pending listener events are only delivered by `run`"]
pub(crate) struct PendingDispatch {
    queues: Vec<Arc<ListenerQueue>>,
}

impl PendingDispatch {
    pub(crate) fn new(queues: Vec<Arc<ListenerQueue>>) -> Self {
        Self { queues }
    }

    pub(crate) fn none() -> Self {
        Self { queues: Vec::new() }
    }

    pub(crate) fn run(self) {
        for queue in &self.queues {
            queue.dispatch();
        }
    }
}
