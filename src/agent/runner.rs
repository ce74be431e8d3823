//! Type-erased agent handle: the unit a [`crate::dispatcher::Dispatcher`]
//! actually drives. Bridges one concrete `Agent` implementation's frozen
//! handler table to the dispatcher-facing interface, per spec §4.2
//! "Event dispatch".

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, Notify, RwLock as AsyncRwLock};

// Layer 3: Internal module imports
use super::context::AgentContext;
use super::define::{DispatchError, HandlerEntry, HandlerTable};
use super::traits::Agent;
use crate::coop::CoopHandle;
use crate::queue::{EventQueueReceiver, TryPopOutcome};
use crate::util::AgentAddress;

/// What happened when a dispatcher asked an agent to process its next
/// demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcome {
    /// A handler ran to completion (successfully or not).
    Handled,
    /// No handler matched `(state, mailbox, type_index)`; the demand was
    /// dropped after its limit counter was released, per spec §4.2 step 1.
    Dropped,
    /// The event queue has no sender left and is empty; this agent is done
    /// and can be retired by its dispatcher.
    QueueClosed,
}

/// Type-erased interface a [`crate::dispatcher::Dispatcher`] drives,
/// hiding each agent's concrete `Agent` implementation and state type.
#[async_trait]
pub trait ErasedAgent: Send + Sync {
    /// Stable identity.
    fn id(&self) -> crate::util::AgentId;

    /// Address (named or anonymous).
    fn address(&self) -> &AgentAddress;

    /// Named group, consulted only by `active_group` dispatchers.
    fn group(&self) -> Option<&str>;

    /// The cooperation this agent is registered under.
    fn coop(&self) -> &CoopHandle;

    /// Fires once after successful cooperation registration.
    async fn run_start(&self);

    /// Fires once before the agent is retired.
    async fn run_finish(&self);

    /// Resolve once `run_finish` has completed. Used by cooperation
    /// deregistration to know when it's safe to report this agent as fully
    /// drained.
    async fn drained(&self);

    /// Await and process the next demand. Awaits on the agent's own event
    /// queue, so this only resolves once work is available or the queue
    /// closes. Every dispatcher kind drives agents through this single
    /// entry point; what differs between dispatcher kinds is how many
    /// concurrent calls to it are admitted at once (see
    /// [`crate::dispatcher::ConcurrencyGate`]).
    async fn drive_one(&self) -> DriveOutcome;

    /// Non-blocking variant of [`Self::drive_one`]: checks whether a demand
    /// is already queued and, only if so, runs its handler to completion.
    /// Never cancels a handler invocation once started. Returns `None` when
    /// the queue is open but currently empty, so a cooperative dispatcher
    /// can move on to the next agent without blocking.
    async fn try_drive_one(&self) -> Option<DriveOutcome>;
}

/// Concrete, generic implementation of [`ErasedAgent`] for one `Agent`
/// type. Holds the agent behind a [`tokio::sync::RwLock`] so non-thread-safe
/// handlers take the write half (exclusive, serialized) and thread-safe
/// handlers take the read half (shared, concurrent) — spec §4.2 step 2.
pub struct RunningAgent<A: Agent> {
    agent: AsyncRwLock<A>,
    table: HandlerTable<A>,
    ctx: Arc<AgentContext<A::State>>,
    queue_rx: AsyncMutex<EventQueueReceiver>,
    group: Option<String>,
    coop: CoopHandle,
    /// Whether the dispatcher this agent is bound to permits concurrent
    /// invocation of thread-safe handlers (only `advanced_thread_pool`
    /// does). Resolved once at bind time.
    allow_concurrent: bool,
    is_drained: AtomicBool,
    drained_notify: Notify,
}

impl<A: Agent> RunningAgent<A> {
    /// Build a running agent from its frozen define-phase output.
    pub fn new(
        agent: A,
        table: HandlerTable<A>,
        ctx: Arc<AgentContext<A::State>>,
        queue_rx: EventQueueReceiver,
        group: Option<String>,
        coop: CoopHandle,
        allow_concurrent: bool,
    ) -> Self {
        Self {
            agent: AsyncRwLock::new(agent),
            table,
            ctx,
            queue_rx: AsyncMutex::new(queue_rx),
            group,
            coop,
            allow_concurrent,
            is_drained: AtomicBool::new(false),
            drained_notify: Notify::new(),
        }
    }

    async fn dispatch(&self, demand: crate::queue::Demand) -> DriveOutcome {
        let mailbox_id = demand.mailbox_id();
        let type_index = demand.type_index();
        let state = self.ctx.current_state();
        let entry = self.table.lookup(state, mailbox_id, type_index).cloned();
        let (envelope, reply) = demand.into_parts();

        let entry = match entry {
            Some(entry) => entry,
            None => {
                tracing::trace!(
                    agent = %self.ctx.address(),
                    type_name = type_index.type_name(),
                    "no handler for demand, dropping"
                );
                return DriveOutcome::Dropped;
            }
        };

        match entry {
            HandlerEntry::Transition(target) => {
                self.ctx.switch_to(target);
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(None));
                }
                DriveOutcome::Handled
            }
            HandlerEntry::Call(handler) => {
                let result = {
                    let mut guard = self.agent.write().await;
                    handler(&mut guard, &self.ctx, envelope).await
                };
                self.settle(result, reply).await;
                DriveOutcome::Handled
            }
            HandlerEntry::ConcurrentCall(handler) => {
                let result = if self.allow_concurrent {
                    let guard = self.agent.read().await;
                    handler(&guard, &self.ctx, envelope).await
                } else {
                    // Dispatcher doesn't permit concurrent invocation: take
                    // the write lock so this demand still serializes against
                    // every other handler of this agent, per spec §4.2 step 2.
                    let guard = self.agent.write().await;
                    handler(&guard, &self.ctx, envelope).await
                };
                self.settle(result, reply).await;
                DriveOutcome::Handled
            }
        }
    }

    async fn settle(
        &self,
        result: Result<crate::agent::traits::Reply, DispatchError>,
        reply: Option<crate::queue::ReplySender>,
    ) {
        match result {
            Ok(value) => {
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(value));
                }
            }
            Err(error) => {
                if let Some(reply) = reply {
                    let _ = reply.send(Err(error));
                } else {
                    self.coop.report_handler_error(self.ctx.address(), error);
                }
            }
        }
    }
}

#[async_trait]
impl<A: Agent> ErasedAgent for RunningAgent<A> {
    fn id(&self) -> crate::util::AgentId {
        self.ctx.id()
    }

    fn address(&self) -> &AgentAddress {
        self.ctx.address()
    }

    fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    fn coop(&self) -> &CoopHandle {
        &self.coop
    }

    async fn run_start(&self) {
        let mut guard = self.agent.write().await;
        if let Err(error) = guard.evt_start(&self.ctx).await {
            drop(guard);
            self.coop
                .report_handler_error(self.ctx.address(), Box::new(error));
        }
    }

    async fn run_finish(&self) {
        let mut guard = self.agent.write().await;
        guard.evt_finish(&self.ctx).await;
        drop(guard);
        self.is_drained.store(true, Ordering::Release);
        self.drained_notify.notify_waiters();
    }

    async fn drained(&self) {
        loop {
            let notified = self.drained_notify.notified();
            if self.is_drained.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }

    async fn drive_one(&self) -> DriveOutcome {
        let demand = {
            let mut rx = self.queue_rx.lock().await;
            rx.pop().await
        };
        match demand {
            Some(demand) => self.dispatch(demand).await,
            None => DriveOutcome::QueueClosed,
        }
    }

    async fn try_drive_one(&self) -> Option<DriveOutcome> {
        let outcome = {
            let mut rx = self.queue_rx.lock().await;
            rx.try_pop_detailed()
        };
        match outcome {
            TryPopOutcome::Ready(demand) => Some(self.dispatch(demand).await),
            TryPopOutcome::Empty => None,
            TryPopOutcome::Closed => Some(DriveOutcome::QueueClosed),
        }
    }
}
