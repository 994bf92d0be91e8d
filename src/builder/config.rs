//! Service configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where start and stop hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookExecution {
    /// On the thread calling `start_async` / `stop_async` (or the
    /// `notify_started` that releases a queued stop).
    #[default]
    Inline,
    /// On a freshly spawned thread named `<service>-start` / `<service>-stop`.
    DedicatedThread,
}

/// Construction-time settings of a service.
///
/// Every field has a default, so partial documents are accepted.
///
/// # Example
///
/// ```rust
/// use lifecycle_guard::{HookExecution, ServiceConfig};
///
/// let config = ServiceConfig::from_json(r#"{ "name": "ingest", "hook_execution": "dedicated_thread" }"#)
///     .unwrap();
/// assert_eq!(config.name, "ingest");
/// assert_eq!(config.hook_execution, HookExecution::DedicatedThread);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Name used in logs, thread names and `Display`
    pub name: String,
    pub hook_execution: HookExecution,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "service".to_string(),
            hook_execution: HookExecution::Inline,
        }
    }
}

impl ServiceConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Errors loading a [`ServiceConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid service configuration: {0}")]
    Json(#[from] serde_json::Error),
}
