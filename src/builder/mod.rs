//! Builder API for service construction.
//!
//! `ServiceBuilder` collects hooks and configuration with a fluent API and
//! validates them in `build()`.

pub mod config;
pub mod error;

pub use config::{ConfigError, HookExecution, ServiceConfig};
pub use error::BuildError;

use crate::service::{Service, ServiceHooks};

/// Fluent builder for [`Service`].
///
/// # Example
///
/// ```rust
/// use lifecycle_guard::{HookExecution, ScriptedHooks, Service, State};
/// use std::time::Duration;
///
/// let service = Service::builder()
///     .name("cache-warmer")
///     .hook_execution(HookExecution::DedicatedThread)
///     .hooks(ScriptedHooks::new())
///     .build()
///     .unwrap();
///
/// service.start_async().unwrap();
/// service.await_running_for(Duration::from_secs(5)).unwrap();
/// assert_eq!(service.to_string(), "cache-warmer [RUNNING]");
/// ```
pub struct ServiceBuilder {
    config: ServiceConfig,
    hooks: Option<Box<dyn ServiceHooks>>,
}

impl ServiceBuilder {
    pub fn new() -> Self {
        Self::from_config(ServiceConfig::default())
    }

    /// Start from a loaded configuration.
    pub fn from_config(config: ServiceConfig) -> Self {
        Self {
            config,
            hooks: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn hook_execution(mut self, execution: HookExecution) -> Self {
        self.config.hook_execution = execution;
        self
    }

    /// Set the start/stop hooks (required).
    pub fn hooks(mut self, hooks: impl ServiceHooks) -> Self {
        self.hooks = Some(Box::new(hooks));
        self
    }

    /// Build the service in state NEW.
    pub fn build(self) -> Result<Service, BuildError> {
        let hooks = self.hooks.ok_or(BuildError::MissingHooks)?;
        if self.config.name.trim().is_empty() {
            return Err(BuildError::EmptyName);
        }
        Ok(Service::from_parts(self.config, hooks))
    }
}

impl Default for ServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
