//! A demand: a fully resolved delivery tuple enqueued on one agent's event
//! queue.

// Layer 1: Standard library imports
use std::any::Any;
use std::error::Error as StdError;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use tokio::sync::oneshot;

// Layer 3: Internal module imports
use crate::limit::MessageLimiter;
use crate::message::Envelope;
use crate::util::{MailboxId, TypeIndex};

/// What a handler hands back when resolving a synchronous request: either a
/// boxed reply value or a boxed error.
pub type HandlerReply = Result<Option<Box<dyn Any + Send>>, Box<dyn StdError + Send + Sync>>;

/// The sender half of a synchronous-request bridge, carried inside a
/// [`Demand`] so the handler that eventually runs can resolve the caller's
/// future.
pub type ReplySender = oneshot::Sender<HandlerReply>;

/// A demand: `(mailbox, type_index, envelope, handler_ref)` resolved at
/// enqueue time, per spec §3 DATA MODEL. The `handler_ref` half is resolved
/// lazily by the agent's frozen per-state handler table at dispatch time
/// (not stored here), since the same demand may be looked up under whatever
/// state the agent is in when it's actually popped.
pub struct Demand {
    mailbox_id: MailboxId,
    type_index: TypeIndex,
    envelope: Envelope,
    limiter: Option<Arc<MessageLimiter>>,
    reply: Option<ReplySender>,
}

impl Demand {
    /// Build an ordinary (fire-and-forget) demand.
    pub fn new(mailbox_id: MailboxId, type_index: TypeIndex, envelope: Envelope, limiter: Option<Arc<MessageLimiter>>) -> Self {
        Self {
            mailbox_id,
            type_index,
            envelope,
            limiter,
            reply: None,
        }
    }

    /// Build a demand riding a synchronous-request reply channel.
    pub fn with_reply(
        mailbox_id: MailboxId,
        type_index: TypeIndex,
        envelope: Envelope,
        limiter: Option<Arc<MessageLimiter>>,
        reply: ReplySender,
    ) -> Self {
        Self {
            mailbox_id,
            type_index,
            envelope,
            limiter,
            reply: Some(reply),
        }
    }

    /// Which mailbox this demand arrived through.
    pub fn mailbox_id(&self) -> MailboxId {
        self.mailbox_id
    }

    /// The payload's type index.
    pub fn type_index(&self) -> TypeIndex {
        self.type_index
    }

    /// Borrow the envelope.
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Consume the demand, splitting it into its envelope and reply
    /// channel (if any). The limiter is released as part of this call,
    /// since by this point the demand has been dequeued for handling.
    pub fn into_parts(self) -> (Envelope, Option<ReplySender>) {
        if let Some(limiter) = &self.limiter {
            limiter.release();
        }
        (self.envelope, self.reply)
    }

    /// True if this demand carries a synchronous-request reply channel.
    pub fn is_request(&self) -> bool {
        self.reply.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[derive(Debug, Clone)]
    struct Ping;

    impl Message for Ping {
        const MESSAGE_TYPE: &'static str = "ping";
    }

    #[test]
    fn test_ordinary_demand_has_no_reply() {
        let demand = Demand::new(MailboxId::new(), TypeIndex::of::<Ping>(), Envelope::immutable(Ping), None);
        assert!(!demand.is_request());
    }

    #[test]
    fn test_request_demand_carries_reply() {
        let (tx, _rx) = oneshot::channel();
        let demand = Demand::with_reply(MailboxId::new(), TypeIndex::of::<Ping>(), Envelope::immutable(Ping), None, tx);
        assert!(demand.is_request());
        let (_env, reply) = demand.into_parts();
        assert!(reply.is_some());
    }

    #[test]
    fn test_into_parts_releases_limiter() {
        use crate::limit::{LimitReaction, MessageLimiter};

        let limiter = Arc::new(MessageLimiter::new(1, LimitReaction::Drop));
        assert!(limiter.try_acquire());
        let demand = Demand::new(
            MailboxId::new(),
            TypeIndex::of::<Ping>(),
            Envelope::immutable(Ping),
            Some(Arc::clone(&limiter)),
        );
        let _ = demand.into_parts();
        assert_eq!(limiter.current(), 0);
    }
}
