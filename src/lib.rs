//! Lifecycle Guard: a thread-safe service lifecycle state machine
//!
//! A [`Service`] moves through NEW, STARTING, RUNNING, STOPPING and
//! TERMINATED, or ends in FAILED. Every transition is applied under one
//! guard, so concurrent callers observe a single consistent order.
//!
//! # Core Concepts
//!
//! - **Hooks**: user code run on start and stop via [`ServiceHooks`]; it
//!   reports completion through a [`ServiceContext`]
//! - **Listeners**: observers that receive each transition exactly once, in
//!   order, on an [`ExecutionContext`] of their choosing
//! - **Waits**: blocking `await_running` / `await_terminated`, with or
//!   without a deadline
//!
//! # Example
//!
//! ```rust
//! use lifecycle_guard::{hooks, ExecutionContext, RecordingListener, Service, State};
//! use std::sync::Arc;
//!
//! let service = Service::new(hooks::from_fn(
//!     |ctx| Ok(ctx.notify_started()?),
//!     |ctx| Ok(ctx.notify_stopped()?),
//! ));
//!
//! let recorder = Arc::new(RecordingListener::new());
//! service.add_listener(Arc::clone(&recorder), ExecutionContext::inline());
//!
//! service.start_async().unwrap();
//! service.await_running().unwrap();
//! service.stop_async();
//! service.await_terminated().unwrap();
//!
//! assert_eq!(
//!     recorder.states(),
//!     vec![State::Starting, State::Running, State::Stopping, State::Terminated]
//! );
//! ```
//!
//! # Failures
//!
//! ```rust
//! use lifecycle_guard::{FailurePoint, ScriptedHooks, Service, State};
//!
//! let service = Service::new(ScriptedHooks::new().fail_on(FailurePoint::Start));
//! service.start_async().unwrap();
//!
//! assert_eq!(service.state(), State::Failed);
//! let err = service.await_terminated().unwrap_err();
//! assert_eq!(err.failure().unwrap().from_state(), State::Starting);
//! ```

pub mod builder;
pub mod core;
pub mod error;
pub mod listener;
pub mod service;

// Re-export commonly used types
pub use builder::{BuildError, ConfigError, HookExecution, ServiceBuilder, ServiceConfig};
pub use crate::core::{is_legal_transition, State, Transition, TransitionHistory, ALL_STATES};
pub use error::{BoxError, Hook, HookPanic, LifecycleError, Operation, ServiceFailure};
pub use listener::{
    DirectExecutor, ExecutionContext, Executor, Listener, ListenerEvent, ListenerFailure,
    RecordingListener, Task, ThreadExecutor,
};
pub use service::{
    hooks, FailurePoint, ScriptedHooks, Service, ServiceContext, ServiceHooks, ServiceSnapshot,
    SimulatedFailure,
};
