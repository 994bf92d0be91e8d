//! Blocking waits on the transition guard.
//!
//! The wait predicate is evaluated with the record lock held and the guard
//! signals its condition variable inside the critical section that mutates
//! the state, so a transition landing between a waiter's check and its
//! block is always seen.

use super::guard::TransitionGuard;
use super::record::ServiceRecord;
use super::state::State;
use crate::error::{LifecycleError, Operation};
use std::sync::PoisonError;
use std::time::{Duration, Instant};

impl TransitionGuard {
    /// Block until RUNNING.
    ///
    /// Fails with the captured failure once FAILED, and with
    /// `IllegalStateTransition` once RUNNING can no longer be reached.
    pub(crate) fn await_running(&self, timeout: Option<Duration>) -> Result<(), LifecycleError> {
        self.await_outcome(State::Running, timeout, |record| match record.state {
            State::Running => Some(Ok(())),
            State::Failed => Some(Err(failure_of(record, Operation::AwaitRunning))),
            State::Stopping | State::Terminated => Some(Err(LifecycleError::illegal(
                Operation::AwaitRunning,
                record.state,
            ))),
            State::New | State::Starting => None,
        })
    }

    /// Block until TERMINATED. Fails with the captured failure once FAILED.
    pub(crate) fn await_terminated(&self, timeout: Option<Duration>) -> Result<(), LifecycleError> {
        self.await_outcome(State::Terminated, timeout, |record| match record.state {
            State::Terminated => Some(Ok(())),
            State::Failed => Some(Err(failure_of(record, Operation::AwaitTerminated))),
            _ => None,
        })
    }

    fn await_outcome<F>(
        &self,
        expected: State,
        timeout: Option<Duration>,
        outcome: F,
    ) -> Result<(), LifecycleError>
    where
        F: Fn(&ServiceRecord) -> Option<Result<(), LifecycleError>>,
    {
        let deadline = timeout.map(|t| (t, Instant::now() + t));
        let mut record = self.lock();
        loop {
            if let Some(result) = outcome(&*record) {
                return result;
            }
            record = match deadline {
                None => self
                    .changed
                    .wait(record)
                    .unwrap_or_else(PoisonError::into_inner),
                Some((waited, deadline)) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(LifecycleError::Timeout {
                            expected,
                            actual: record.state,
                            waited,
                        });
                    }
                    self.changed
                        .wait_timeout(record, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }
}

fn failure_of(record: &ServiceRecord, operation: Operation) -> LifecycleError {
    match &record.failure {
        Some(failure) => LifecycleError::ServiceFailure(failure.clone()),
        // FAILED is only entered with a captured failure.
        None => LifecycleError::illegal(operation, record.state),
    }
}
