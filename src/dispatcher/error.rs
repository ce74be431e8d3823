//! Errors raised by dispatcher binding and named-dispatcher lookup.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Errors raised by [`crate::dispatcher::Dispatcher`] operations and the
/// environment's named-dispatcher registry.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// `bind_named` referenced a dispatcher name that was never registered.
    #[error("named dispatcher '{0}' not found")]
    NamedDispNotFound(String),

    /// A named dispatcher was found but is not the requested concrete kind.
    #[error("dispatcher '{0}' exists but is not of the requested type")]
    DispTypeMismatch(String),

    /// The dispatcher rejected a new binding (e.g. shut down already).
    #[error("dispatcher '{0}' is shutting down and cannot accept new bindings")]
    ShuttingDown(String),

    /// A dispatcher's backing runtime (dedicated thread or thread pool)
    /// could not be started.
    #[error("failed to start dispatcher runtime: {0}")]
    StartupFailed(String),
}
