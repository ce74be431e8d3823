//! The define-phase builder: accumulates `(state, mailbox, type_index) ->
//! handler` bindings, then freezes into an immutable table.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::context::AgentContext;
use super::traits::{Agent, BoxFuture, Handles, HandlesConcurrently, Reply};
use crate::environment::EnvironmentHandle;
use crate::limit::MessageLimiter;
use crate::mailbox::{FilterFn, MailboxHandle};
use crate::message::Envelope;
use crate::util::{MailboxId, TypeIndex};

/// Uniform error shape handlers are erased to at the dispatch boundary, so
/// the dispatcher and environment don't need to be generic over each
/// agent's concrete `Error` type.
pub type DispatchError = Box<dyn std::error::Error + Send + Sync>;

type ErasedHandler<A> = Arc<
    dyn for<'a> Fn(
            &'a mut A,
            &'a AgentContext<<A as Agent>::State>,
            Envelope,
        ) -> BoxFuture<'a, Result<Reply, DispatchError>>
        + Send
        + Sync,
>;

type ErasedConcurrentHandler<A> = Arc<
    dyn for<'a> Fn(
            &'a A,
            &'a AgentContext<<A as Agent>::State>,
            Envelope,
        ) -> BoxFuture<'a, Result<Reply, DispatchError>>
        + Send
        + Sync,
>;

/// One entry in an agent's frozen handler table.
pub enum HandlerEntry<A: Agent> {
    /// An ordinary handler, invoked with exclusive (`&mut self`) access.
    Call(ErasedHandler<A>),
    /// A thread-safe handler, invoked with shared (`&self`) access; may run
    /// concurrently with other thread-safe handlers of the same agent when
    /// the dispatcher permits it (spec §4.2 step 2).
    ConcurrentCall(ErasedConcurrentHandler<A>),
    /// A pure transition arrow: dispatch swaps the current state without
    /// invoking any user code (spec §4.2 `just_switch_to`).
    Transition(A::State),
}

impl<A: Agent> Clone for HandlerEntry<A> {
    fn clone(&self) -> Self {
        match self {
            Self::Call(f) => Self::Call(Arc::clone(f)),
            Self::ConcurrentCall(f) => Self::ConcurrentCall(Arc::clone(f)),
            Self::Transition(s) => Self::Transition(*s),
        }
    }
}

/// A pending mailbox registration collected during `define()`, applied
/// exactly once per `(mailbox, type_index)` during cooperation
/// registration, per the "at most one subscription per (mailbox,
/// type_index, agent) triple" invariant in spec §3.
pub struct PendingSubscription {
    pub(crate) mailbox: MailboxHandle,
    pub(crate) type_index: TypeIndex,
    pub(crate) filter: Option<FilterFn>,
    pub(crate) limiter: Option<Arc<MessageLimiter>>,
}

/// The frozen result of a define phase: a handler table keyed by
/// `(state, mailbox, type_index)`, plus the distinct mailbox
/// subscriptions that must be registered once at coop-registration time.
pub struct HandlerTable<A: Agent> {
    pub(crate) entries: HashMap<(A::State, MailboxId, TypeIndex), HandlerEntry<A>>,
    pub(crate) subscriptions: Vec<PendingSubscription>,
}

impl<A: Agent> HandlerTable<A> {
    /// Look up a handler for `(state, mailbox, type_index)`, falling back
    /// to the agent's default state if absent there, per spec §4.2 step 1.
    pub fn lookup(&self, state: A::State, mailbox: MailboxId, type_index: TypeIndex) -> Option<&HandlerEntry<A>> {
        self.entries
            .get(&(state, mailbox, type_index))
            .or_else(|| self.entries.get(&(A::State::default(), mailbox, type_index)))
    }
}

/// Builder passed to [`Agent::define`]. Accumulates handler bindings;
/// consumed into a [`HandlerTable`] once define-phase completes.
pub struct Define<A: Agent> {
    entries: HashMap<(A::State, MailboxId, TypeIndex), HandlerEntry<A>>,
    subscriptions: HashMap<(MailboxId, TypeIndex), PendingSubscription>,
    direct_mailbox: Option<MailboxHandle>,
    environment: Option<EnvironmentHandle>,
}

impl<A: Agent> Default for Define<A> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            subscriptions: HashMap::new(),
            direct_mailbox: None,
            environment: None,
        }
    }
}

impl<A: Agent> Define<A> {
    /// Build a define-phase builder pre-populated with the agent's own
    /// direct mailbox and a handle to the owning environment. Used by
    /// cooperation registration; tests that don't need either can keep using
    /// [`Define::default`].
    pub(crate) fn for_agent(direct_mailbox: MailboxHandle, environment: EnvironmentHandle) -> Self {
        Self {
            entries: HashMap::new(),
            subscriptions: HashMap::new(),
            direct_mailbox: Some(direct_mailbox),
            environment: Some(environment),
        }
    }

    /// This agent's own private mailbox, if the builder was constructed with
    /// one (always true during cooperation registration).
    pub fn direct_mailbox(&self) -> Option<&MailboxHandle> {
        self.direct_mailbox.as_ref()
    }

    /// The owning environment, if the builder was constructed with one
    /// (always true during cooperation registration). Used to look up named,
    /// shared mailboxes to subscribe to.
    pub fn environment(&self) -> Option<&EnvironmentHandle> {
        self.environment.as_ref()
    }

    /// Register an ordinary handler for `(state, mailbox, M::MESSAGE_TYPE)`.
    pub fn on<M>(
        &mut self,
        state: A::State,
        mailbox: &MailboxHandle,
        filter: Option<FilterFn>,
        limiter: Option<Arc<MessageLimiter>>,
    ) -> &mut Self
    where
        A: Handles<M>,
        M: crate::message::Message,
    {
        let type_index = TypeIndex::of::<M>();
        let handler: ErasedHandler<A> = Arc::new(move |agent: &mut A, ctx, envelope| {
            Box::pin(async move {
                match envelope.into_payload::<M>() {
                    Ok(message) => agent
                        .handle(message, ctx)
                        .await
                        .map_err(|e| Box::new(e) as DispatchError),
                    Err(_) => Ok(None),
                }
            })
        });
        self.insert(state, mailbox, type_index, HandlerEntry::Call(handler), filter, limiter);
        self
    }

    /// Register a thread-safe handler for `(state, mailbox,
    /// M::MESSAGE_TYPE)`. See [`HandlesConcurrently`].
    pub fn on_concurrent<M>(
        &mut self,
        state: A::State,
        mailbox: &MailboxHandle,
        filter: Option<FilterFn>,
        limiter: Option<Arc<MessageLimiter>>,
    ) -> &mut Self
    where
        A: HandlesConcurrently<M>,
        M: crate::message::Message,
    {
        let type_index = TypeIndex::of::<M>();
        let handler: ErasedConcurrentHandler<A> = Arc::new(move |agent: &A, ctx, envelope| {
            Box::pin(async move {
                match envelope.into_payload::<M>() {
                    Ok(message) => agent
                        .handle_concurrent(message, ctx)
                        .await
                        .map_err(|e| Box::new(e) as DispatchError),
                    Err(_) => Ok(None),
                }
            })
        });
        self.insert(state, mailbox, type_index, HandlerEntry::ConcurrentCall(handler), filter, limiter);
        self
    }

    /// Register a pure transition arrow for `(state, mailbox,
    /// M::MESSAGE_TYPE)`: dispatch switches to `target` without invoking a
    /// handler body.
    pub fn just_switch_to<M: crate::message::Message>(
        &mut self,
        state: A::State,
        mailbox: &MailboxHandle,
        target: A::State,
        filter: Option<FilterFn>,
        limiter: Option<Arc<MessageLimiter>>,
    ) -> &mut Self {
        let type_index = TypeIndex::of::<M>();
        self.insert(state, mailbox, type_index, HandlerEntry::Transition(target), filter, limiter);
        self
    }

    fn insert(
        &mut self,
        state: A::State,
        mailbox: &MailboxHandle,
        type_index: TypeIndex,
        entry: HandlerEntry<A>,
        filter: Option<FilterFn>,
        limiter: Option<Arc<MessageLimiter>>,
    ) {
        self.entries.insert((state, mailbox.id(), type_index), entry);
        self.subscriptions
            .entry((mailbox.id(), type_index))
            .or_insert_with(|| PendingSubscription {
                mailbox: Arc::clone(mailbox),
                type_index,
                filter,
                limiter,
            });
    }

    /// Freeze the builder into an immutable handler table.
    pub fn freeze(self) -> HandlerTable<A> {
        HandlerTable {
            entries: self.entries,
            subscriptions: self.subscriptions.into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentState;
    use crate::mailbox::{Mailbox, MailboxKind};
    use crate::message::Message;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    enum Idle {
        #[default]
        Default,
    }
    impl AgentState for Idle {}

    #[derive(Debug, thiserror::Error)]
    #[error("test error")]
    struct TestError;

    struct Echo;

    #[derive(Debug, Clone)]
    struct Ping;
    impl Message for Ping {
        const MESSAGE_TYPE: &'static str = "ping";
    }

    #[async_trait::async_trait]
    impl Agent for Echo {
        type State = Idle;
        type Error = TestError;

        fn define(_define: &mut Define<Self>) {}
    }

    #[async_trait::async_trait]
    impl Handles<Ping> for Echo {
        async fn handle(&mut self, _message: Ping, _ctx: &AgentContext<Idle>) -> Result<Reply, TestError> {
            Ok(None)
        }
    }

    #[test]
    fn test_define_registers_one_subscription_per_mailbox_type() {
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let mut define: Define<Echo> = Define::default();
        define.on::<Ping>(Idle::Default, &mailbox, None, None);
        let table = define.freeze();
        assert_eq!(table.subscriptions.len(), 1);
        assert!(table.lookup(Idle::Default, mailbox.id(), TypeIndex::of::<Ping>()).is_some());
    }

    #[test]
    fn test_lookup_falls_back_to_default_state() {
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let mut define: Define<Echo> = Define::default();
        define.on::<Ping>(Idle::Default, &mailbox, None, None);
        let table = define.freeze();
        assert!(table.lookup(Idle::Default, mailbox.id(), TypeIndex::of::<Ping>()).is_some());
    }
}
