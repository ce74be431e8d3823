//! Errors raised while building or registering a cooperation (spec §4.5).

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::dispatcher::DispatcherError;
use crate::mailbox::MailboxError;

/// Errors raised by [`crate::coop::CoopBuilder::register`] and cooperation
/// lookup.
#[derive(Debug, Error)]
pub enum CoopError {
    /// `create_coop` was called with a name already registered in this
    /// environment.
    #[error("a cooperation named '{0}' is already registered")]
    DuplicateName(String),

    /// `create_coop` named a parent cooperation that isn't registered (or
    /// has already been deregistered).
    #[error("parent cooperation '{0}' is not registered")]
    ParentNotFound(String),

    /// An agent's `define` phase tried to subscribe to a mailbox and
    /// failed.
    #[error("subscribing an agent during registration failed: {0}")]
    Subscribe(#[from] MailboxError),

    /// Reserving a dispatcher slot for an agent failed.
    #[error("binding an agent to its dispatcher failed: {0}")]
    Bind(#[from] DispatcherError),

    /// Registration failed and was rolled back; no agent from the
    /// attempted cooperation is visible to any dispatcher or mailbox. Spec
    /// §6 stable error code `CoopRegistrationFailed`.
    #[error("cooperation registration failed and was rolled back: {0}")]
    RegistrationFailed(String),
}
