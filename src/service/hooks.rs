//! The start/stop hook capability.

use super::ServiceContext;
use crate::error::BoxError;
use std::sync::Arc;

/// User code run while a service is STARTING or STOPPING.
///
/// `on_start` must eventually lead to exactly one of
/// [`ServiceContext::notify_started`] or [`ServiceContext::notify_failed`];
/// `on_stop` to exactly one of [`ServiceContext::notify_stopped`] or
/// [`ServiceContext::notify_failed`]. The call may happen inside the hook
/// or later from any thread holding a clone of the context. A service whose
/// hook never reports back stays in STARTING or STOPPING forever.
///
/// Returning `Err` (or panicking) is the same as calling `notify_failed`
/// with that error, provided the hook has not already reported.
pub trait ServiceHooks: Send + Sync + 'static {
    fn on_start(&self, ctx: &ServiceContext) -> Result<(), BoxError>;

    fn on_stop(&self, ctx: &ServiceContext) -> Result<(), BoxError>;
}

impl<H: ServiceHooks + ?Sized> ServiceHooks for Arc<H> {
    fn on_start(&self, ctx: &ServiceContext) -> Result<(), BoxError> {
        (**self).on_start(ctx)
    }

    fn on_stop(&self, ctx: &ServiceContext) -> Result<(), BoxError> {
        (**self).on_stop(ctx)
    }
}

/// Hooks built from two closures. See [`from_fn`].
pub struct FnHooks<S, T> {
    start: S,
    stop: T,
}

impl<S, T> ServiceHooks for FnHooks<S, T>
where
    S: Fn(&ServiceContext) -> Result<(), BoxError> + Send + Sync + 'static,
    T: Fn(&ServiceContext) -> Result<(), BoxError> + Send + Sync + 'static,
{
    fn on_start(&self, ctx: &ServiceContext) -> Result<(), BoxError> {
        (self.start)(ctx)
    }

    fn on_stop(&self, ctx: &ServiceContext) -> Result<(), BoxError> {
        (self.stop)(ctx)
    }
}

/// Build hooks from a start and a stop closure.
///
/// # Example
///
/// ```rust
/// use lifecycle_guard::{hooks, Service, State};
///
/// let service = Service::new(hooks::from_fn(
///     |ctx| ctx.notify_started().map_err(Into::into),
///     |ctx| ctx.notify_stopped().map_err(Into::into),
/// ));
///
/// service.start_async().unwrap();
/// assert_eq!(service.state(), State::Running);
/// ```
pub fn from_fn<S, T>(start: S, stop: T) -> FnHooks<S, T>
where
    S: Fn(&ServiceContext) -> Result<(), BoxError> + Send + Sync + 'static,
    T: Fn(&ServiceContext) -> Result<(), BoxError> + Send + Sync + 'static,
{
    FnHooks { start, stop }
}

/// Hooks that never report back on their own.
///
/// Completion is driven from outside through [`crate::Service::context`],
/// which is how a service backed by some external worker is modelled.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualHooks;

impl ServiceHooks for ManualHooks {
    fn on_start(&self, _ctx: &ServiceContext) -> Result<(), BoxError> {
        Ok(())
    }

    fn on_stop(&self, _ctx: &ServiceContext) -> Result<(), BoxError> {
        Ok(())
    }
}
