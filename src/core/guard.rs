//! The transition guard: the single serialization point of a service.
//!
//! Every read-modify-write of the service record happens inside one
//! critical section of `record`. Waiters are signalled from inside the same
//! critical section, and listener queues receive their events there too,
//! so the order listeners observe is the order transitions were applied.
//! Hooks and listener callbacks always run after the lock is released.

use super::record::ServiceRecord;
use super::state::State;
use crate::error::{BoxError, Hook, LifecycleError, Operation, ServiceFailure};
use crate::listener::{ExecutionContext, Listener, ListenerFailure, PendingDispatch};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error};

/// Work left to do once a transition has been applied.
#[must_use = "listener events and hooks only run through `Applied`"]
pub(crate) struct Applied {
    pub(crate) dispatch: PendingDispatch,
    pub(crate) hook: Option<Hook>,
    /// Whether any transition was applied
    pub(crate) changed: bool,
}

impl Applied {
    fn nothing() -> Self {
        Self {
            dispatch: PendingDispatch::none(),
            hook: None,
            changed: false,
        }
    }
}

/// Read-only copy of the guarded record.
#[derive(Debug, Clone)]
pub(crate) struct RecordView {
    pub(crate) state: State,
    pub(crate) transitions: u64,
    pub(crate) stop_requested: bool,
    pub(crate) failure: Option<ServiceFailure>,
    pub(crate) listeners: usize,
}

pub(crate) struct TransitionGuard {
    service: Arc<str>,
    pub(super) record: Mutex<ServiceRecord>,
    pub(super) changed: Condvar,
}

impl TransitionGuard {
    pub(crate) fn new(service: Arc<str>) -> Self {
        Self {
            record: Mutex::new(ServiceRecord::new(Arc::clone(&service))),
            service,
            changed: Condvar::new(),
        }
    }

    /// NEW -> STARTING and run the start hook. Idempotent while STARTING or
    /// RUNNING.
    pub(crate) fn start(&self) -> Result<Applied, LifecycleError> {
        let mut record = self.lock();
        match record.state {
            State::New => {
                record.advance(State::Starting, Operation::Start)?;
                Ok(self.applied(&record, Some(Hook::Start)))
            }
            State::Starting | State::Running => Ok(Applied::nothing()),
            other => Err(LifecycleError::illegal(Operation::Start, other)),
        }
    }

    /// Request a stop.
    ///
    /// - RUNNING: -> STOPPING and run the stop hook.
    /// - NEW: -> TERMINATED, no hooks.
    /// - STARTING: queued until the start hook reports back.
    /// - STOPPING, TERMINATED, FAILED: nothing to do.
    pub(crate) fn stop(&self) -> Applied {
        let mut record = self.lock();
        let (to, hook) = match record.state {
            State::Running => (State::Stopping, Some(Hook::Stop)),
            State::New => (State::Terminated, None),
            State::Starting => {
                if !record.stop_requested {
                    debug!(service = %self.service, "stop requested while starting, deferring");
                    record.stop_requested = true;
                }
                return Applied::nothing();
            }
            State::Stopping | State::Terminated | State::Failed => return Applied::nothing(),
        };
        let advanced = record.advance(to, Operation::Stop);
        debug_assert!(advanced.is_ok(), "stop took an illegal edge: {advanced:?}");
        match advanced {
            Ok(()) => self.applied(&record, hook),
            Err(err) => {
                error!(service = %self.service, "stop rejected by the transition table: {err}");
                Applied::nothing()
            }
        }
    }

    /// STARTING -> RUNNING, then straight on to STOPPING if a stop was
    /// queued meanwhile.
    pub(crate) fn started(&self) -> Result<Applied, LifecycleError> {
        let mut record = self.lock();
        if record.state != State::Starting {
            return Err(LifecycleError::illegal(Operation::NotifyStarted, record.state));
        }
        record.advance(State::Running, Operation::NotifyStarted)?;

        let mut hook = None;
        if record.stop_requested {
            record.stop_requested = false;
            record.advance(State::Stopping, Operation::Stop)?;
            hook = Some(Hook::Stop);
        }
        Ok(self.applied(&record, hook))
    }

    /// STOPPING -> TERMINATED.
    pub(crate) fn stopped(&self) -> Result<Applied, LifecycleError> {
        let mut record = self.lock();
        if record.state != State::Stopping {
            return Err(LifecycleError::illegal(Operation::NotifyStopped, record.state));
        }
        record.advance(State::Terminated, Operation::NotifyStopped)?;
        Ok(self.applied(&record, None))
    }

    /// STARTING or STOPPING -> FAILED, capturing `cause`. The first failure
    /// wins; later reports are rejected.
    pub(crate) fn failed(&self, cause: BoxError) -> Result<Applied, LifecycleError> {
        let mut record = self.lock();
        let from = record.state;
        if !from.is_transitioning() {
            return Err(LifecycleError::illegal(Operation::NotifyFailed, from));
        }
        self.fail(&mut record, cause)
    }

    /// Like [`failed`](Self::failed), but only from `expected`. A hook's own
    /// error must not fail the service once it has moved past that hook's
    /// state.
    pub(crate) fn failed_from(
        &self,
        expected: State,
        cause: BoxError,
    ) -> Result<Applied, LifecycleError> {
        let mut record = self.lock();
        if record.state != expected || !expected.is_transitioning() {
            return Err(LifecycleError::illegal(Operation::NotifyFailed, record.state));
        }
        self.fail(&mut record, cause)
    }

    fn fail(
        &self,
        record: &mut ServiceRecord,
        cause: BoxError,
    ) -> Result<Applied, LifecycleError> {
        let from = record.state;
        record.failure = Some(ServiceFailure::new(from, cause));
        record.stop_requested = false;
        record.advance(State::Failed, Operation::NotifyFailed)?;
        Ok(self.applied(record, None))
    }

    pub(crate) fn add_listener<L>(&self, listener: L, context: ExecutionContext) -> PendingDispatch
    where
        L: Listener + 'static,
    {
        self.lock().add_listener(listener, context)
    }

    pub(crate) fn state(&self) -> State {
        self.lock().state
    }

    pub(crate) fn view(&self) -> RecordView {
        let record = self.lock();
        RecordView {
            state: record.state,
            transitions: record.transitions,
            stop_requested: record.stop_requested,
            failure: record.failure.clone(),
            listeners: record.listeners.len(),
        }
    }

    pub(crate) fn history(&self) -> Vec<super::history::Transition> {
        self.lock().history.transitions().to_vec()
    }

    pub(crate) fn listener_failures(&self) -> Vec<ListenerFailure> {
        self.lock().listeners.failures()
    }

    /// Wake waiters and collect listener queues. Called with the lock held
    /// right after a successful transition.
    fn applied(&self, record: &ServiceRecord, hook: Option<Hook>) -> Applied {
        self.changed.notify_all();
        Applied {
            dispatch: record.listeners.pending(),
            hook,
            changed: true,
        }
    }

    pub(super) fn lock(&self) -> MutexGuard<'_, ServiceRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::RecordingListener;

    fn guard() -> TransitionGuard {
        TransitionGuard::new(Arc::from("guard-test"))
    }

    fn finish(applied: Result<Applied, LifecycleError>) -> Option<Hook> {
        let applied = applied.unwrap();
        applied.dispatch.run();
        applied.hook
    }

    #[test]
    fn start_invokes_start_hook_once() {
        let guard = guard();
        assert_eq!(finish(guard.start()), Some(Hook::Start));
        assert_eq!(guard.state(), State::Starting);

        assert_eq!(finish(guard.start()), None);
        finish(guard.started());
        assert_eq!(finish(guard.start()), None);
        assert_eq!(guard.state(), State::Running);
    }

    #[test]
    fn start_after_terminal_state_is_rejected() {
        let guard = guard();
        guard.stop().dispatch.run();
        assert_eq!(guard.state(), State::Terminated);

        let err = guard.start().err().unwrap();
        assert!(matches!(
            err,
            LifecycleError::IllegalStateTransition {
                operation: Operation::Start,
                state: State::Terminated
            }
        ));
    }

    #[test]
    fn double_started_is_rejected_and_not_recounted() {
        let guard = guard();
        finish(guard.start());
        finish(guard.started());
        let count = guard.view().transitions;

        let err = guard.started().err().unwrap();
        assert!(err.is_illegal_transition());
        assert_eq!(guard.view().transitions, count);
    }

    #[test]
    fn stop_from_new_skips_hooks() {
        let guard = guard();
        let applied = guard.stop();
        assert_eq!(applied.hook, None);
        applied.dispatch.run();
        assert_eq!(guard.state(), State::Terminated);
        assert_eq!(guard.history().len(), 1);
    }

    #[test]
    fn stop_while_starting_is_deferred_until_running() {
        let guard = guard();
        finish(guard.start());

        let applied = guard.stop();
        assert_eq!(applied.hook, None);
        applied.dispatch.run();
        assert_eq!(guard.state(), State::Starting);
        assert!(guard.view().stop_requested);

        assert_eq!(finish(guard.started()), Some(Hook::Stop));
        assert_eq!(guard.state(), State::Stopping);
        assert!(!guard.view().stop_requested);
    }

    #[test]
    fn failure_drops_queued_stop() {
        let guard = guard();
        finish(guard.start());
        guard.stop().dispatch.run();

        finish(guard.failed("boom".into()));
        let view = guard.view();
        assert_eq!(view.state, State::Failed);
        assert!(!view.stop_requested);
        assert_eq!(view.failure.unwrap().from_state(), State::Starting);
    }

    #[test]
    fn second_failure_does_not_overwrite_the_first() {
        let guard = guard();
        finish(guard.start());
        finish(guard.failed("first".into()));

        let err = guard.failed("second".into()).err().unwrap();
        assert!(err.is_illegal_transition());
        assert_eq!(
            guard.view().failure.unwrap().cause().to_string(),
            "first"
        );
    }

    #[test]
    fn notify_failed_requires_a_hook_in_flight() {
        let guard = guard();
        assert!(guard.failed("early".into()).is_err());
        finish(guard.start());
        finish(guard.started());
        assert!(guard.failed("while running".into()).is_err());
        assert_eq!(guard.state(), State::Running);
    }

    #[test]
    fn failed_from_only_applies_in_the_expected_state() {
        let guard = guard();
        finish(guard.start());
        finish(guard.started());
        finish(Ok(guard.stop()));

        let err = guard.failed_from(State::Starting, "late start error".into()).err().unwrap();
        assert!(matches!(
            err,
            LifecycleError::IllegalStateTransition {
                operation: Operation::NotifyFailed,
                state: State::Stopping
            }
        ));
        assert_eq!(guard.state(), State::Stopping);
        assert!(guard.view().failure.is_none());

        finish(guard.failed_from(State::Stopping, "stop error".into()));
        let failure = guard.view().failure.unwrap();
        assert_eq!(failure.from_state(), State::Stopping);
        assert_eq!(failure.cause().to_string(), "stop error");
    }

    #[test]
    fn no_op_stop_reports_no_change() {
        let guard = guard();
        let queued = {
            finish(guard.start());
            guard.stop()
        };
        assert!(!queued.changed);
        queued.dispatch.run();

        let applied = guard.started().unwrap();
        assert!(applied.changed);
        applied.dispatch.run();
        finish(guard.stopped());

        let again = guard.stop();
        assert!(!again.changed);
        assert!(again.hook.is_none());
    }

    #[test]
    fn stopped_only_from_stopping() {
        let guard = guard();
        assert!(guard.stopped().is_err());
        finish(guard.start());
        finish(guard.started());
        assert_eq!(finish(Ok(guard.stop())), Some(Hook::Stop));
        finish(guard.stopped());
        assert_eq!(guard.state(), State::Terminated);
        assert!(guard.stopped().is_err());
    }

    #[test]
    fn listeners_receive_transitions_in_order() {
        let guard = guard();
        let recorder = Arc::new(RecordingListener::new());
        guard
            .add_listener(Arc::clone(&recorder), ExecutionContext::inline())
            .run();

        finish(guard.start());
        finish(guard.started());
        finish(Ok(guard.stop()));
        finish(guard.stopped());

        assert_eq!(
            recorder.states(),
            vec![
                State::Starting,
                State::Running,
                State::Stopping,
                State::Terminated
            ]
        );
    }
}
