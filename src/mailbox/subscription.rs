//! Subscription-set entries: what a mailbox stores per `(type_index, agent)`.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::limit::MessageLimiter;
use crate::message::Envelope;
use crate::queue::EventQueueSender;

/// Optional predicate evaluated before a delivery is enqueued.
pub type FilterFn = Arc<dyn Fn(&Envelope) -> bool + Send + Sync>;

/// One entry in a mailbox's subscription set: where to enqueue, an optional
/// filter, and an optional message-limit policy for this `(agent, type)`.
#[derive(Clone)]
pub struct Subscription {
    pub(crate) filter: Option<FilterFn>,
    pub(crate) queue: EventQueueSender,
    pub(crate) limiter: Option<Arc<MessageLimiter>>,
}

impl Subscription {
    /// Build a subscription entry.
    pub fn new(queue: EventQueueSender, filter: Option<FilterFn>, limiter: Option<Arc<MessageLimiter>>) -> Self {
        Self {
            filter,
            queue,
            limiter,
        }
    }

    /// Evaluate the optional filter against an envelope. Absent filter
    /// always passes.
    pub(crate) fn passes(&self, envelope: &Envelope) -> bool {
        match &self.filter {
            Some(f) => f(envelope),
            None => true,
        }
    }
}
