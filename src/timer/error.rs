//! Errors raised by timer scheduling.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Errors raised by [`crate::timer::TimerBackend`] scheduling calls.
#[derive(Debug, Error)]
pub enum TimerError {
    /// `schedule_timer` was asked to re-deliver a mutable envelope on every
    /// tick, which would require cloning a uniquely-owned payload. Fails
    /// eagerly at schedule time rather than on the first re-delivery.
    #[error("cannot schedule a periodic timer for a mutable message")]
    MutablePeriodicMsg,

    /// The dedicated timer thread failed to start, or its runtime failed to
    /// report back a handle.
    #[error("timer runtime failed to start: {0}")]
    StartupFailed(String),
}
