//! Message-limit reactions: what a mailbox does when a subscriber's
//! `(agent, message_type)` counter is already at cap.

// Layer 1: Standard library imports
use std::fmt;
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::counter::LimitCounter;
use crate::mailbox::MailboxHandle;
use crate::message::Envelope;

/// Hop bound for `redirect` chains. The source does not specify one;
/// per Design Note "Open question — redirect loop bound" this crate picks a
/// small constant and falls back to `drop` once exceeded.
pub const REDIRECT_HOP_LIMIT: u32 = 32;

/// Computes the mailbox a redirected envelope should be re-delivered to.
pub type RedirectFn = Arc<dyn Fn(&Envelope) -> MailboxHandle + Send + Sync>;

/// Computes a replacement `(mailbox, envelope)` pair for a transformed
/// delivery.
pub type TransformFn = Arc<dyn Fn(Envelope) -> (MailboxHandle, Envelope) + Send + Sync>;

/// What to do when a limited `(agent, message_type)` counter is already at
/// cap and a new delivery arrives.
#[derive(Clone)]
pub enum LimitReaction {
    /// Discard the envelope silently.
    Drop,
    /// Log a diagnostic and terminate the process. Used to catch runaway
    /// producers during development; never recovers.
    AbortApp,
    /// Re-deliver to a mailbox computed from the envelope, bounded by
    /// [`REDIRECT_HOP_LIMIT`].
    Redirect(RedirectFn),
    /// Replace the envelope with a new `(mailbox, envelope)` pair.
    Transform(TransformFn),
}

impl fmt::Debug for LimitReaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drop => write!(f, "LimitReaction::Drop"),
            Self::AbortApp => write!(f, "LimitReaction::AbortApp"),
            Self::Redirect(_) => write!(f, "LimitReaction::Redirect(..)"),
            Self::Transform(_) => write!(f, "LimitReaction::Transform(..)"),
        }
    }
}

/// Bundles a [`LimitCounter`] with the reaction to run on overflow. One
/// instance per `(agent, message_type)` that has an explicit cap.
#[derive(Debug)]
pub struct MessageLimiter {
    counter: LimitCounter,
    reaction: LimitReaction,
}

impl MessageLimiter {
    /// Build a limiter with the given cap and overflow reaction.
    ///
    /// # Example
    /// ```rust
    /// use agentrt::limit::{LimitReaction, MessageLimiter};
    ///
    /// let limiter = MessageLimiter::new(1, LimitReaction::Drop);
    /// assert!(limiter.try_acquire());
    /// assert!(!limiter.try_acquire());
    /// ```
    pub fn new(cap: u64, reaction: LimitReaction) -> Self {
        Self {
            counter: LimitCounter::new(cap),
            reaction,
        }
    }

    /// Attempt to acquire a slot for one delivery.
    pub fn try_acquire(&self) -> bool {
        self.counter.try_acquire()
    }

    /// Release a slot after the demand is dequeued (handled or dropped).
    pub fn release(&self) {
        self.counter.release()
    }

    /// The configured overflow reaction.
    pub fn reaction(&self) -> &LimitReaction {
        &self.reaction
    }

    /// Configured cap.
    pub fn cap(&self) -> u64 {
        self.counter.cap()
    }

    /// Current in-flight count.
    pub fn current(&self) -> u64 {
        self.counter.current()
    }
}
