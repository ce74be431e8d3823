//! Type-erased message envelope: the unit of delivery between a mailbox and
//! an agent's event queue.
//!
//! Agents in this runtime are heterogeneous: a single mailbox may carry many
//! distinct message types over its lifetime, and a single agent may subscribe
//! to several of them across several states. Representing every payload as a
//! generic `MessageEnvelope<M>` (one concrete type per mailbox) would not
//! support that, so the envelope instead carries an erased payload keyed by
//! `TypeIndex`, per Design Note §9 ("Heterogeneous message types without
//! inheritance").

// Layer 1: Standard library imports
use std::any::Any;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};

// Layer 3: Internal module imports
use super::traits::{Message, MessagePriority, Signal};
use crate::util::{AgentAddress, EnvelopeId, TypeIndex};

/// Whether an envelope's payload is shared (immutable) or uniquely owned
/// (mutable). Determines fan-out behavior at delivery time: a mutable
/// payload can be handed to at most one subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    /// Payload is reference-counted and shared across every matching
    /// subscriber.
    Immutable,
    /// Payload is uniquely owned; delivery fails with `TooManyReceivers`
    /// if more than one subscription matches.
    Mutable,
}

/// Erased payload storage. `Signal` carries nothing at all.
enum Payload {
    Shared(Arc<dyn Any + Send + Sync>),
    Owned(Box<dyn Any + Send>),
    Signal,
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shared(_) => write!(f, "Payload::Shared(..)"),
            Self::Owned(_) => write!(f, "Payload::Owned(..)"),
            Self::Signal => write!(f, "Payload::Signal"),
        }
    }
}

/// An immutable record carrying a type index, an optional erased payload,
/// and routing metadata. The unit delivered by [`crate::mailbox::Mailbox`]
/// and carried inside a [`crate::queue::Demand`].
#[derive(Debug)]
pub struct Envelope {
    id: EnvelopeId,
    type_index: TypeIndex,
    type_name: &'static str,
    payload: Payload,
    mutability: Mutability,
    sender: Option<AgentAddress>,
    reply_to: Option<AgentAddress>,
    timestamp: DateTime<Utc>,
    priority: MessagePriority,
}

impl Envelope {
    /// Wrap an immutable (shareable) message.
    ///
    /// # Example
    /// ```rust
    /// use agentrt::message::{Envelope, Message};
    ///
    /// #[derive(Debug, Clone)]
    /// struct Ping;
    /// impl Message for Ping {
    ///     const MESSAGE_TYPE: &'static str = "ping";
    /// }
    ///
    /// let env = Envelope::immutable(Ping);
    /// assert_eq!(env.type_name(), "ping");
    /// ```
    pub fn immutable<M: Message + Send + Sync>(payload: M) -> Self {
        let priority = payload.priority();
        Self {
            id: EnvelopeId::new(),
            type_index: TypeIndex::of::<M>(),
            type_name: M::MESSAGE_TYPE,
            payload: Payload::Shared(Arc::new(payload)),
            mutability: Mutability::Immutable,
            sender: None,
            reply_to: None,
            timestamp: Utc::now(),
            priority,
        }
    }

    /// Wrap a mutable (uniquely owned) message.
    pub fn mutable<M: Message>(payload: M) -> Self {
        let priority = payload.priority();
        Self {
            id: EnvelopeId::new(),
            type_index: TypeIndex::of::<M>(),
            type_name: M::MESSAGE_TYPE,
            payload: Payload::Owned(Box::new(payload)),
            mutability: Mutability::Mutable,
            sender: None,
            reply_to: None,
            timestamp: Utc::now(),
            priority,
        }
    }

    /// Build a payload-less signal envelope.
    pub fn signal<S: Signal>() -> Self {
        Self {
            id: EnvelopeId::new(),
            type_index: TypeIndex::of::<S>(),
            type_name: S::SIGNAL_TYPE,
            payload: Payload::Signal,
            mutability: Mutability::Immutable,
            sender: None,
            reply_to: None,
            timestamp: Utc::now(),
            priority: MessagePriority::Normal,
        }
    }

    /// Builder: attach a sender address.
    pub fn with_sender(mut self, sender: AgentAddress) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Builder: attach a reply-to address.
    pub fn with_reply_to(mut self, reply_to: AgentAddress) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    /// Share this envelope for delivery to another matching subscriber.
    /// Returns `None` for mutable envelopes — callers must check
    /// [`Envelope::mutability`] before fanning out and treat a second
    /// match as `TooManyReceivers` instead of calling this.
    pub(crate) fn try_share(&self) -> Option<Self> {
        match &self.payload {
            Payload::Shared(arc) => Some(Self {
                id: self.id,
                type_index: self.type_index,
                type_name: self.type_name,
                payload: Payload::Shared(Arc::clone(arc)),
                mutability: self.mutability,
                sender: self.sender.clone(),
                reply_to: self.reply_to.clone(),
                timestamp: self.timestamp,
                priority: self.priority,
            }),
            Payload::Signal => Some(Self {
                id: self.id,
                type_index: self.type_index,
                type_name: self.type_name,
                payload: Payload::Signal,
                mutability: self.mutability,
                sender: self.sender.clone(),
                reply_to: self.reply_to.clone(),
                timestamp: self.timestamp,
                priority: self.priority,
            }),
            Payload::Owned(_) => None,
        }
    }

    /// Downcast the payload to `M`, consuming the envelope.
    ///
    /// Returns `Err(self)` if the concrete type doesn't match — this should
    /// never happen for demands resolved through the subscription table,
    /// since the table is keyed by `TypeIndex`, but is kept total rather
    /// than panicking.
    pub fn into_payload<M: Message>(self) -> Result<M, Self> {
        match self.payload {
            Payload::Shared(arc) => match arc.downcast::<M>() {
                Ok(boxed) => match Arc::try_unwrap(boxed) {
                    Ok(value) => Ok(value),
                    Err(arc) => Err(Self {
                        payload: Payload::Shared(arc),
                        ..self
                    }),
                },
                Err(arc) => Err(Self {
                    payload: Payload::Shared(arc),
                    ..self
                }),
            },
            Payload::Owned(boxed) => match boxed.downcast::<M>() {
                Ok(boxed) => Ok(*boxed),
                Err(boxed) => Err(Self {
                    payload: Payload::Owned(boxed),
                    ..self
                }),
            },
            Payload::Signal => Err(self),
        }
    }

    /// The subscription-key type index of this envelope's payload.
    pub fn type_index(&self) -> TypeIndex {
        self.type_index
    }

    /// Diagnostic type name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Mutability classification.
    pub fn mutability(&self) -> Mutability {
        self.mutability
    }

    /// Unique envelope id.
    pub fn id(&self) -> EnvelopeId {
        self.id
    }

    /// Sender address, if recorded.
    pub fn sender(&self) -> Option<&AgentAddress> {
        self.sender.as_ref()
    }

    /// Reply-to address, if recorded.
    pub fn reply_to(&self) -> Option<&AgentAddress> {
        self.reply_to.as_ref()
    }

    /// Creation timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Routing priority.
    pub fn priority(&self) -> MessagePriority {
        self.priority
    }

    /// True for a payload-less signal.
    pub fn is_signal(&self) -> bool {
        matches!(self.payload, Payload::Signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping(u32);

    impl Message for Ping {
        const MESSAGE_TYPE: &'static str = "ping";
    }

    #[derive(Debug)]
    struct OwnedJob(String);

    impl Message for OwnedJob {
        const MESSAGE_TYPE: &'static str = "owned_job";
    }

    #[derive(Debug, Clone, Copy)]
    struct Tick;

    impl Signal for Tick {
        const SIGNAL_TYPE: &'static str = "tick";
    }

    #[test]
    fn test_immutable_roundtrip() {
        let env = Envelope::immutable(Ping(7));
        assert_eq!(env.mutability(), Mutability::Immutable);
        assert_eq!(env.into_payload::<Ping>().unwrap(), Ping(7));
    }

    #[test]
    fn test_mutable_roundtrip() {
        let env = Envelope::mutable(OwnedJob("work".to_string()));
        assert_eq!(env.mutability(), Mutability::Mutable);
        let job = env.into_payload::<OwnedJob>().unwrap();
        assert_eq!(job.0, "work");
    }

    #[test]
    fn test_mutable_cannot_be_shared() {
        let env = Envelope::mutable(OwnedJob("x".to_string()));
        assert!(env.try_share().is_none());
    }

    #[test]
    fn test_immutable_can_be_shared() {
        let env = Envelope::immutable(Ping(1));
        let shared = env.try_share().expect("immutable shares");
        assert_eq!(shared.into_payload::<Ping>().unwrap(), Ping(1));
    }

    #[test]
    fn test_signal_has_no_payload_but_shares() {
        let env = Envelope::signal::<Tick>();
        assert!(env.is_signal());
        let shared = env.try_share().expect("signals share");
        assert!(shared.is_signal());
    }

    #[test]
    fn test_wrong_type_downcast_fails() {
        let env = Envelope::immutable(Ping(1));
        let env = env.into_payload::<OwnedJob>().unwrap_err();
        assert_eq!(env.type_name(), "ping");
    }

    #[test]
    fn test_sender_and_reply_to_builders() {
        let sender = AgentAddress::named("sender");
        let reply_to = AgentAddress::named("reply");
        let env = Envelope::immutable(Ping(1))
            .with_sender(sender.clone())
            .with_reply_to(reply_to.clone());
        assert_eq!(env.sender(), Some(&sender));
        assert_eq!(env.reply_to(), Some(&reply_to));
    }
}
