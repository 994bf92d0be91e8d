use super::hooks::ServiceHooks;
use super::ServiceContext;
use crate::error::BoxError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Hook at which [`ScriptedHooks`] fails.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePoint {
    Start,
    Stop,
}

/// Error reported by [`ScriptedHooks`] at its failure point.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("simulated failure during {0:?}")]
pub struct SimulatedFailure(pub FailurePoint);

/// Scriptable hooks for tests and demos.
///
/// By default both hooks report success immediately. A failure point makes
/// that hook report [`SimulatedFailure`] instead; `manual` makes both hooks
/// return without reporting so the test drives completion itself. Every
/// invocation is counted.
///
/// # Example
///
/// ```rust
/// use lifecycle_guard::{FailurePoint, ScriptedHooks, Service, State};
/// use std::sync::Arc;
///
/// let hooks = Arc::new(ScriptedHooks::new().fail_on(FailurePoint::Start));
/// let service = Service::new(Arc::clone(&hooks));
///
/// service.start_async().unwrap();
/// assert_eq!(service.state(), State::Failed);
/// assert_eq!(hooks.start_calls(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedHooks {
    fail_on: Option<FailurePoint>,
    manual: bool,
    delay: Option<Duration>,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
}

impl ScriptedHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(mut self, point: FailurePoint) -> Self {
        self.fail_on = Some(point);
        self
    }

    /// Hooks return without notifying.
    pub fn manual(mut self) -> Self {
        self.manual = true;
        self
    }

    /// Sleep inside each hook before reporting.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    fn run(&self, point: FailurePoint) -> Option<Result<(), BoxError>> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail_on == Some(point) {
            return Some(Err(Box::new(SimulatedFailure(point))));
        }
        if self.manual {
            return Some(Ok(()));
        }
        None
    }
}

impl ServiceHooks for ScriptedHooks {
    fn on_start(&self, ctx: &ServiceContext) -> Result<(), BoxError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        match self.run(FailurePoint::Start) {
            Some(result) => result,
            None => Ok(ctx.notify_started()?),
        }
    }

    fn on_stop(&self, ctx: &ServiceContext) -> Result<(), BoxError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        match self.run(FailurePoint::Stop) {
            Some(result) => result,
            None => Ok(ctx.notify_stopped()?),
        }
    }
}
