//! Errors surfaced synchronously by mailbox delivery and subscription calls.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::util::{AgentId, TypeIndex};

/// Errors raised by [`crate::mailbox::Mailbox`] operations.
#[derive(Debug, Error)]
pub enum MailboxError {
    /// A mutable payload matched more than one subscriber.
    #[error("mutable message of type {type_index} matched more than one subscriber")]
    TooManyReceivers {
        /// The payload type that over-matched.
        type_index: TypeIndex,
    },

    /// A synchronous request matched zero subscribers at send time.
    #[error("no service handler is subscribed for type {type_index}")]
    NoSvcHandlers {
        /// The request payload's type index.
        type_index: TypeIndex,
    },

    /// A synchronous request matched more than one subscriber, so no single
    /// reply could be chosen.
    #[error("more than one service handler matched type {type_index}")]
    MoreThanOneSvcHandler {
        /// The request payload's type index.
        type_index: TypeIndex,
    },

    /// `(mailbox, type_index, agent)` already has a registered subscription.
    #[error("agent {agent} is already subscribed to type {type_index} on this mailbox")]
    AlreadySubscribed {
        /// The subscriber.
        agent: AgentId,
        /// The payload type.
        type_index: TypeIndex,
    },

    /// A direct mailbox received a subscription attempt from an agent other
    /// than its owner.
    #[error("direct mailbox only accepts subscriptions from its owning agent")]
    ForeignSubscriber,
}
