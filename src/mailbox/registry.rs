//! The `Mailbox` routing primitive.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::DashMap;

// Layer 3: Internal module imports
use super::error::MailboxError;
use super::metrics::MailboxMetrics;
use super::subscription::{FilterFn, Subscription};
use crate::limit::{MessageLimiter, REDIRECT_HOP_LIMIT};
use crate::message::{Envelope, Mutability, Signal};
use crate::queue::{Demand, EventQueueSender, ReplySender};
use crate::util::{AgentId, TypeIndex};

/// Whether a mailbox is shared (many possible subscribers) or owned
/// privately by exactly one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxKind {
    /// Anonymous, many-subscriber mailbox.
    Mpmc,
    /// Owned by exactly one agent; accepts subscriptions only from its
    /// owner.
    Direct(AgentId),
}

/// A routing endpoint carrying a subscription set keyed by
/// `(type_index, agent)`. See spec §3/§4.1.
///
/// # Example
/// ```rust
/// use agentrt::mailbox::{Mailbox, MailboxKind};
/// use agentrt::message::{Envelope, Message, Mutability};
/// use agentrt::util::{AgentId, TypeIndex};
///
/// #[derive(Debug, Clone)]
/// struct Ping;
/// impl Message for Ping {
///     const MESSAGE_TYPE: &'static str = "ping";
/// }
///
/// let mailbox = Mailbox::new(MailboxKind::Mpmc);
/// let agent = AgentId::new();
/// let (queue, mut rx) = agentrt::queue::unbounded();
/// mailbox.subscribe(TypeIndex::of::<Ping>(), agent, None, None, queue).unwrap();
/// mailbox
///     .deliver_message(TypeIndex::of::<Ping>(), Envelope::immutable(Ping), Mutability::Immutable)
///     .unwrap();
/// assert!(rx.try_pop().is_some());
/// ```
pub struct Mailbox {
    id: crate::util::MailboxId,
    kind: MailboxKind,
    subscriptions: DashMap<(TypeIndex, AgentId), Subscription>,
    metrics: MailboxMetrics,
}

/// Shared handle to a mailbox, the unit callers pass around and the unit a
/// redirect/transform reaction computes as its target.
pub type MailboxHandle = Arc<Mailbox>;

impl Mailbox {
    /// Build a new mailbox of the given kind, wrapped in a shareable
    /// handle.
    pub fn new(kind: MailboxKind) -> MailboxHandle {
        Arc::new(Self {
            id: crate::util::MailboxId::new(),
            kind,
            subscriptions: DashMap::new(),
            metrics: MailboxMetrics::default(),
        })
    }

    /// Stable identity, used as part of an agent's handler-table key.
    pub fn id(&self) -> crate::util::MailboxId {
        self.id
    }

    /// This mailbox's kind.
    pub fn kind(&self) -> MailboxKind {
        self.kind
    }

    /// Delivery/drop counters, for diagnostics and tests.
    pub fn metrics(&self) -> &MailboxMetrics {
        &self.metrics
    }

    /// Register a subscription. `state` scoping lives on the agent's own
    /// handler table; the mailbox only needs to know where to enqueue.
    pub fn subscribe(
        &self,
        type_index: TypeIndex,
        agent: AgentId,
        filter: Option<FilterFn>,
        limiter: Option<Arc<MessageLimiter>>,
        queue: EventQueueSender,
    ) -> Result<(), MailboxError> {
        if let MailboxKind::Direct(owner) = self.kind {
            if owner != agent {
                return Err(MailboxError::ForeignSubscriber);
            }
        }

        let key = (type_index, agent);
        if self.subscriptions.contains_key(&key) {
            return Err(MailboxError::AlreadySubscribed { agent, type_index });
        }
        self.subscriptions.insert(key, Subscription::new(queue, filter, limiter));
        Ok(())
    }

    /// Remove a subscription. No-op if absent.
    pub fn unsubscribe(&self, type_index: TypeIndex, agent: AgentId) {
        self.subscriptions.remove(&(type_index, agent));
    }

    /// Deliver a message, fanning out to every matching subscription.
    /// Mutable payloads fail with [`MailboxError::TooManyReceivers`] when
    /// more than one subscription matches.
    pub fn deliver_message(
        &self,
        type_index: TypeIndex,
        envelope: Envelope,
        mutability: Mutability,
    ) -> Result<(), MailboxError> {
        let _ = mutability;
        self.deliver_internal(type_index, envelope, None, 0)
    }

    /// Deliver a payload-less signal.
    pub fn deliver_signal<S: Signal>(&self) -> Result<(), MailboxError> {
        let envelope = Envelope::signal::<S>();
        self.deliver_internal(TypeIndex::of::<S>(), envelope, None, 0)
    }

    /// Deliver a synchronous-request envelope. Requires exactly one
    /// matching subscription; fails synchronously with
    /// [`MailboxError::NoSvcHandlers`] or
    /// [`MailboxError::MoreThanOneSvcHandler`] otherwise.
    pub fn deliver_request(
        &self,
        type_index: TypeIndex,
        envelope: Envelope,
        reply: ReplySender,
    ) -> Result<(), MailboxError> {
        self.deliver_internal(type_index, envelope, Some(reply), 0)
    }

    fn matching_subscriptions(&self, type_index: TypeIndex, envelope: &Envelope) -> Vec<Subscription> {
        self.subscriptions
            .iter()
            .filter(|entry| entry.key().0 == type_index && entry.value().passes(envelope))
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn deliver_internal(
        &self,
        type_index: TypeIndex,
        envelope: Envelope,
        reply: Option<ReplySender>,
        hop: u32,
    ) -> Result<(), MailboxError> {
        let matches = self.matching_subscriptions(type_index, &envelope);

        if reply.is_some() {
            if matches.is_empty() {
                return Err(MailboxError::NoSvcHandlers { type_index });
            }
            if matches.len() > 1 {
                return Err(MailboxError::MoreThanOneSvcHandler { type_index });
            }
        } else if envelope.mutability() == Mutability::Mutable && matches.len() > 1 {
            return Err(MailboxError::TooManyReceivers { type_index });
        }

        if matches.is_empty() {
            self.metrics.record_dropped();
            return Ok(());
        }

        let last_idx = matches.len() - 1;
        let mut envelope_opt = Some(envelope);
        let mut reply_opt = reply;

        for (idx, sub) in matches.into_iter().enumerate() {
            let env_for_sub = if idx == last_idx {
                envelope_opt.take().expect("envelope consumed exactly once")
            } else {
                envelope_opt
                    .as_ref()
                    .expect("envelope present while fanning out")
                    .try_share()
                    .expect("fan-out only reachable for shareable payloads")
            };
            let reply_for_sub = if idx == last_idx { reply_opt.take() } else { None };
            self.route_one(sub, type_index, env_for_sub, reply_for_sub, hop)?;
        }
        Ok(())
    }

    fn route_one(
        &self,
        sub: Subscription,
        type_index: TypeIndex,
        envelope: Envelope,
        reply: Option<ReplySender>,
        hop: u32,
    ) -> Result<(), MailboxError> {
        if let Some(limiter) = sub.limiter.clone() {
            if !limiter.try_acquire() {
                return self.apply_reaction(limiter.reaction(), type_index, envelope, reply, hop);
            }
        }

        let limiter_for_demand = sub.limiter.clone();
        let demand = match reply {
            Some(r) => Demand::with_reply(self.id, type_index, envelope, limiter_for_demand, r),
            None => Demand::new(self.id, type_index, envelope, limiter_for_demand),
        };

        if let Err(demand) = sub.queue.push(demand) {
            if let Some(limiter) = &sub.limiter {
                limiter.release();
            }
            self.metrics.record_dropped();
            tracing::warn!(type_name = type_index.type_name(), "event queue full, dropping demand");
            let _ = demand;
        } else {
            self.metrics.record_enqueued();
        }
        Ok(())
    }

    fn apply_reaction(
        &self,
        reaction: &crate::limit::LimitReaction,
        type_index: TypeIndex,
        envelope: Envelope,
        reply: Option<ReplySender>,
        hop: u32,
    ) -> Result<(), MailboxError> {
        use crate::limit::LimitReaction;

        match reaction {
            LimitReaction::Drop => {
                self.metrics.record_dropped();
                tracing::debug!(type_name = type_index.type_name(), "message limit reached, dropping");
                Ok(())
            }
            LimitReaction::AbortApp => {
                tracing::error!(type_name = type_index.type_name(), "message limit reached, aborting process");
                std::process::abort();
            }
            LimitReaction::Redirect(redirect_fn) => {
                if hop + 1 > REDIRECT_HOP_LIMIT {
                    tracing::warn!("redirect hop limit exceeded, dropping");
                    self.metrics.record_dropped();
                    return Ok(());
                }
                self.metrics.record_redirected();
                let target = redirect_fn(&envelope);
                let had_reply = reply.is_some();
                let result = target.deliver_internal(type_index, envelope, reply, hop + 1);
                if had_reply {
                    result
                } else {
                    if let Err(e) = result {
                        tracing::debug!(error = %e, "redirected delivery failed, dropping");
                    }
                    Ok(())
                }
            }
            LimitReaction::Transform(transform_fn) => {
                let (target, new_envelope) = transform_fn(envelope);
                let new_type_index = new_envelope.type_index();
                let had_reply = reply.is_some();
                let result = target.deliver_internal(new_type_index, new_envelope, reply, hop);
                if had_reply {
                    result
                } else {
                    if let Err(e) = result {
                        tracing::debug!(error = %e, "transformed delivery failed, dropping");
                    }
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limit::LimitReaction;
    use crate::message::Message;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping;

    impl Message for Ping {
        const MESSAGE_TYPE: &'static str = "ping";
    }

    #[test]
    fn test_deliver_with_no_subscribers_is_ok() {
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let result = mailbox.deliver_message(TypeIndex::of::<Ping>(), Envelope::immutable(Ping), Mutability::Immutable);
        assert!(result.is_ok());
        assert_eq!(mailbox.metrics().dropped(), 1);
    }

    #[test]
    fn test_fan_out_to_multiple_subscribers() {
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let (q1, mut rx1) = crate::queue::unbounded();
        let (q2, mut rx2) = crate::queue::unbounded();
        mailbox
            .subscribe(TypeIndex::of::<Ping>(), AgentId::new(), None, None, q1)
            .unwrap();
        mailbox
            .subscribe(TypeIndex::of::<Ping>(), AgentId::new(), None, None, q2)
            .unwrap();
        mailbox
            .deliver_message(TypeIndex::of::<Ping>(), Envelope::immutable(Ping), Mutability::Immutable)
            .unwrap();
        assert!(rx1.try_pop().is_some());
        assert!(rx2.try_pop().is_some());
    }

    #[test]
    fn test_mutable_fan_out_fails() {
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let (q1, _rx1) = crate::queue::unbounded();
        let (q2, _rx2) = crate::queue::unbounded();
        mailbox
            .subscribe(TypeIndex::of::<Ping>(), AgentId::new(), None, None, q1)
            .unwrap();
        mailbox
            .subscribe(TypeIndex::of::<Ping>(), AgentId::new(), None, None, q2)
            .unwrap();
        let result = mailbox.deliver_message(TypeIndex::of::<Ping>(), Envelope::mutable(Ping), Mutability::Mutable);
        assert!(matches!(result, Err(MailboxError::TooManyReceivers { .. })));
    }

    #[test]
    fn test_request_with_no_handler_fails() {
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let (tx, _rx) = tokio::sync::oneshot::channel();
        let result = mailbox.deliver_request(TypeIndex::of::<Ping>(), Envelope::immutable(Ping), tx);
        assert!(matches!(result, Err(MailboxError::NoSvcHandlers { .. })));
    }

    #[test]
    fn test_request_with_two_handlers_fails() {
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let (q1, _rx1) = crate::queue::unbounded();
        let (q2, _rx2) = crate::queue::unbounded();
        mailbox
            .subscribe(TypeIndex::of::<Ping>(), AgentId::new(), None, None, q1)
            .unwrap();
        mailbox
            .subscribe(TypeIndex::of::<Ping>(), AgentId::new(), None, None, q2)
            .unwrap();
        let (tx, _rx) = tokio::sync::oneshot::channel();
        let result = mailbox.deliver_request(TypeIndex::of::<Ping>(), Envelope::immutable(Ping), tx);
        assert!(matches!(result, Err(MailboxError::MoreThanOneSvcHandler { .. })));
    }

    #[test]
    fn test_duplicate_subscription_rejected() {
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let agent = AgentId::new();
        let (q1, _rx1) = crate::queue::unbounded();
        let (q2, _rx2) = crate::queue::unbounded();
        mailbox.subscribe(TypeIndex::of::<Ping>(), agent, None, None, q1).unwrap();
        let result = mailbox.subscribe(TypeIndex::of::<Ping>(), agent, None, None, q2);
        assert!(matches!(result, Err(MailboxError::AlreadySubscribed { .. })));
    }

    #[test]
    fn test_direct_mailbox_rejects_foreign_subscriber() {
        let owner = AgentId::new();
        let mailbox = Mailbox::new(MailboxKind::Direct(owner));
        let (q, _rx) = crate::queue::unbounded();
        let result = mailbox.subscribe(TypeIndex::of::<Ping>(), AgentId::new(), None, None, q);
        assert!(matches!(result, Err(MailboxError::ForeignSubscriber)));
    }

    #[test]
    fn test_limit_then_drop() {
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let agent = AgentId::new();
        let (q, mut rx) = crate::queue::unbounded();
        let limiter = Arc::new(MessageLimiter::new(1, LimitReaction::Drop));
        mailbox
            .subscribe(TypeIndex::of::<Ping>(), agent, None, Some(limiter), q)
            .unwrap();
        for _ in 0..3 {
            mailbox
                .deliver_message(TypeIndex::of::<Ping>(), Envelope::immutable(Ping), Mutability::Immutable)
                .unwrap();
        }
        assert!(rx.try_pop().is_some());
        assert!(rx.try_pop().is_none());
    }

    #[test]
    fn test_limit_then_redirect() {
        let target = Mailbox::new(MailboxKind::Mpmc);
        let target_agent = AgentId::new();
        let (target_queue, mut target_rx) = crate::queue::unbounded();
        target
            .subscribe(TypeIndex::of::<Ping>(), target_agent, None, None, target_queue)
            .unwrap();

        let target_clone = Arc::clone(&target);
        let redirect: crate::limit::RedirectFn = Arc::new(move |_env| Arc::clone(&target_clone));
        let limiter = Arc::new(MessageLimiter::new(0, LimitReaction::Redirect(redirect)));

        let source = Mailbox::new(MailboxKind::Mpmc);
        let source_agent = AgentId::new();
        let (source_queue, _source_rx) = crate::queue::unbounded();
        source
            .subscribe(TypeIndex::of::<Ping>(), source_agent, None, Some(limiter), source_queue)
            .unwrap();

        source
            .deliver_message(TypeIndex::of::<Ping>(), Envelope::immutable(Ping), Mutability::Immutable)
            .unwrap();

        assert!(target_rx.try_pop().is_some());
        assert_eq!(source.metrics().redirected(), 1);
    }
}
