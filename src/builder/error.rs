//! Build errors for the service builder.

use thiserror::Error;

/// Errors that can occur when building a service.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Service hooks not specified. Call .hooks(hooks) before .build()")]
    MissingHooks,

    #[error("Service name must not be empty")]
    EmptyName,
}
