//! Crate-level error aggregation.
//!
//! Each subsystem (mailbox, dispatcher, cooperation, timer, request) raises
//! its own `thiserror`-derived enum at the point of failure. [`RuntimeError`]
//! converts every one of those into a single type via `#[from]`, so callers
//! who don't need per-subsystem granularity can match on the stable error
//! codes listed in spec §6 without caring which subsystem raised them.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::coop::CoopError;
use crate::dispatcher::DispatcherError;
use crate::mailbox::MailboxError;
use crate::request::RequestError;
use crate::timer::TimerError;

/// Top-level runtime error, aggregating every subsystem's stable error
/// codes (spec §6 EXTERNAL INTERFACES).
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Mailbox-level delivery or subscription failure.
    #[error(transparent)]
    Mailbox(#[from] MailboxError),

    /// Dispatcher binding or lookup failure.
    #[error(transparent)]
    Dispatcher(#[from] DispatcherError),

    /// Cooperation registration or deregistration failure.
    #[error(transparent)]
    Coop(#[from] CoopError),

    /// Timer scheduling failure.
    #[error(transparent)]
    Timer(#[from] TimerError),

    /// Synchronous-request bridge failure.
    #[error(transparent)]
    Request(#[from] RequestError),
}
