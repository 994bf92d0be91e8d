//! The public service facade.
//!
//! A [`Service`] couples user hooks with a transition guard. Callers drive
//! it through `start_async` / `stop_async` and the blocking waits; hooks
//! report back through the [`ServiceContext`] they are handed.

pub mod hooks;
mod scripted;

pub use hooks::ServiceHooks;
pub use scripted::{FailurePoint, ScriptedHooks, SimulatedFailure};

use crate::builder::{HookExecution, ServiceBuilder, ServiceConfig};
use crate::core::{Applied, State, Transition, TransitionGuard};
use crate::error::{panic_message, BoxError, Hook, HookPanic, LifecycleError, ServiceFailure};
use crate::listener::{ExecutionContext, Listener, ListenerFailure};
use serde::Serialize;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

struct Inner {
    id: Uuid,
    name: Arc<str>,
    config: ServiceConfig,
    hooks: Box<dyn ServiceHooks>,
    guard: TransitionGuard,
}

/// A unit of work with an asynchronous start/stop lifecycle.
///
/// Cloning is cheap and yields another handle to the same service.
///
/// Services are single-use: once TERMINATED or FAILED they never leave
/// that state.
///
/// # Example
///
/// ```rust
/// use lifecycle_guard::{ScriptedHooks, Service, State};
///
/// let service = Service::new(ScriptedHooks::new().manual());
/// let ctx = service.context();
///
/// service.start_async().unwrap();
/// assert_eq!(service.state(), State::Starting);
///
/// ctx.notify_started().unwrap();
/// assert!(service.is_running());
///
/// service.stop_async();
/// assert_eq!(service.state(), State::Stopping);
///
/// ctx.notify_stopped().unwrap();
/// assert_eq!(service.state(), State::Terminated);
/// assert!(!service.is_running());
/// ```
#[derive(Clone)]
pub struct Service {
    inner: Arc<Inner>,
}

impl Service {
    /// A service with default configuration.
    pub fn new(hooks: impl ServiceHooks) -> Self {
        Self::from_parts(ServiceConfig::default(), Box::new(hooks))
    }

    pub fn builder() -> ServiceBuilder {
        ServiceBuilder::new()
    }

    pub(crate) fn from_parts(config: ServiceConfig, hooks: Box<dyn ServiceHooks>) -> Self {
        let name: Arc<str> = Arc::from(config.name.as_str());
        Self {
            inner: Arc::new(Inner {
                id: Uuid::new_v4(),
                guard: TransitionGuard::new(Arc::clone(&name)),
                name,
                config,
                hooks,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    pub fn state(&self) -> State {
        self.inner.guard.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == State::Running
    }

    /// Begin starting the service.
    ///
    /// From NEW this moves to STARTING and invokes the start hook exactly
    /// once, then returns without waiting for RUNNING. While STARTING or
    /// RUNNING it does nothing. From any later state it fails with
    /// `IllegalStateTransition`.
    pub fn start_async(&self) -> Result<(), LifecycleError> {
        let applied = self.inner.guard.start().inspect_err(|err| {
            warn!(service = %self.inner.name, id = %self.inner.id, "start rejected: {err}");
        })?;
        if applied.hook.is_some() {
            info!(service = %self.inner.name, id = %self.inner.id, "starting service");
        }
        self.inner.finish(applied);
        Ok(())
    }

    /// Begin stopping the service.
    ///
    /// RUNNING moves to STOPPING and invokes the stop hook. NEW moves
    /// straight to TERMINATED without running either hook. STARTING queues
    /// the stop until the start hook reports success; if startup fails the
    /// queued stop is dropped. STOPPING, TERMINATED and FAILED are left as
    /// they are.
    pub fn stop_async(&self) {
        let applied = self.inner.guard.stop();
        if applied.changed {
            info!(service = %self.inner.name, id = %self.inner.id, "stopping service");
        }
        self.inner.finish(applied);
    }

    /// Block until RUNNING.
    ///
    /// Fails with `ServiceFailure` if the service failed, or with
    /// `IllegalStateTransition` if it is already stopping or terminated.
    pub fn await_running(&self) -> Result<(), LifecycleError> {
        self.inner.guard.await_running(None)
    }

    /// [`await_running`](Self::await_running) with a deadline.
    pub fn await_running_for(&self, timeout: Duration) -> Result<(), LifecycleError> {
        self.inner.guard.await_running(Some(timeout))
    }

    /// Block until TERMINATED. Fails with the captured `ServiceFailure` if
    /// the service failed.
    pub fn await_terminated(&self) -> Result<(), LifecycleError> {
        self.inner.guard.await_terminated(None)
    }

    /// [`await_terminated`](Self::await_terminated) with a deadline.
    pub fn await_terminated_for(&self, timeout: Duration) -> Result<(), LifecycleError> {
        self.inner.guard.await_terminated(Some(timeout))
    }

    /// Register an observer.
    ///
    /// Transitions that already happened are replayed to it first, in
    /// order; with an inline context they are delivered before this call
    /// returns.
    pub fn add_listener<L>(&self, listener: L, context: ExecutionContext)
    where
        L: Listener + 'static,
    {
        self.inner.guard.add_listener(listener, context).run();
    }

    /// The captured failure, identical on every call.
    pub fn failure(&self) -> Option<ServiceFailure> {
        self.inner.guard.view().failure
    }

    /// Every transition applied so far, oldest first.
    pub fn history(&self) -> Vec<Transition> {
        self.inner.guard.history()
    }

    /// Number of transitions applied so far.
    pub fn transition_count(&self) -> u64 {
        self.inner.guard.view().transitions
    }

    /// Listener callbacks that panicked.
    pub fn listener_failures(&self) -> Vec<ListenerFailure> {
        self.inner.guard.listener_failures()
    }

    pub fn snapshot(&self) -> ServiceSnapshot {
        let view = self.inner.guard.view();
        ServiceSnapshot {
            id: self.inner.id,
            name: self.inner.name.to_string(),
            state: view.state,
            transitions: view.transitions,
            stop_requested: view.stop_requested,
            listeners: view.listeners,
            failure: view.failure.map(|f| f.to_string()),
        }
    }

    /// Handle for hook code, or anything acting on the service's behalf.
    pub fn context(&self) -> ServiceContext {
        ServiceContext {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.inner.name, self.state())
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .finish()
    }
}

/// Serializable point-in-time view of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSnapshot {
    pub id: Uuid,
    pub name: String,
    pub state: State,
    pub transitions: u64,
    pub stop_requested: bool,
    pub listeners: usize,
    pub failure: Option<String>,
}

/// The side of a service that reports hook completion.
///
/// Handed to every hook invocation; clone it to report from another thread.
#[derive(Clone)]
pub struct ServiceContext {
    inner: Arc<Inner>,
}

impl ServiceContext {
    /// STARTING -> RUNNING. Any other state, including a second call, fails
    /// with `IllegalStateTransition` and notifies nobody.
    pub fn notify_started(&self) -> Result<(), LifecycleError> {
        let applied = self.inner.guard.started()?;
        info!(service = %self.inner.name, id = %self.inner.id, "service running");
        self.inner.finish(applied);
        Ok(())
    }

    /// STOPPING -> TERMINATED.
    pub fn notify_stopped(&self) -> Result<(), LifecycleError> {
        let applied = self.inner.guard.stopped()?;
        info!(service = %self.inner.name, id = %self.inner.id, "service terminated");
        self.inner.finish(applied);
        Ok(())
    }

    /// STARTING or STOPPING -> FAILED, capturing `cause`.
    pub fn notify_failed(&self, cause: impl Into<BoxError>) -> Result<(), LifecycleError> {
        let applied = self.inner.guard.failed(cause.into())?;
        if let Some(failure) = self.inner.guard.view().failure {
            warn!(service = %self.inner.name, id = %self.inner.id, "{failure}");
        }
        self.inner.finish(applied);
        Ok(())
    }

    pub fn state(&self) -> State {
        self.inner.guard.state()
    }

    pub fn service(&self) -> Service {
        Service {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContext")
            .field("name", &self.inner.name)
            .finish()
    }
}

impl Inner {
    /// Deliver queued listener events, then run the hook the transition
    /// asked for.
    fn finish(self: &Arc<Self>, applied: Applied) {
        applied.dispatch.run();
        if let Some(hook) = applied.hook {
            self.run_hook(hook);
        }
    }

    fn run_hook(self: &Arc<Self>, hook: Hook) {
        match self.config.hook_execution {
            HookExecution::Inline => self.invoke_hook(hook),
            HookExecution::DedicatedThread => {
                let inner = Arc::clone(self);
                let spawned = thread::Builder::new()
                    .name(format!("{}-{hook}", self.name))
                    .spawn(move || inner.invoke_hook(hook));
                if let Err(err) = spawned {
                    self.report_hook_failure(hook, Box::new(err));
                }
            }
        }
    }

    fn invoke_hook(self: &Arc<Self>, hook: Hook) {
        let ctx = ServiceContext {
            inner: Arc::clone(self),
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| match hook {
            Hook::Start => self.hooks.on_start(&ctx),
            Hook::Stop => self.hooks.on_stop(&ctx),
        }));
        let cause: BoxError = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(payload) => Box::new(HookPanic {
                hook,
                message: panic_message(&*payload),
            }),
        };
        self.report_hook_failure(hook, cause);
    }

    /// Fail the service with a hook's error, but only while it is still in
    /// that hook's state.
    fn report_hook_failure(self: &Arc<Self>, hook: Hook, cause: BoxError) {
        let expected = match hook {
            Hook::Start => State::Starting,
            Hook::Stop => State::Stopping,
        };
        let message = cause.to_string();
        match self.guard.failed_from(expected, cause) {
            Ok(applied) => {
                warn!(service = %self.name, id = %self.id, "{hook} hook failed: {message}");
                self.finish(applied);
            }
            // The hook already reported an outcome before failing.
            Err(err) => warn!(
                service = %self.name,
                id = %self.id,
                "{hook} hook error ignored ({err}): {message}"
            ),
        }
    }
}
