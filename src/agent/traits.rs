//! The `Agent` trait and the `Handles<M>` per-message-type handler trait.

// Layer 1: Standard library imports
use std::any::Any;
use std::future::Future;
use std::pin::Pin;

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal module imports
use super::context::AgentContext;
use super::define::Define;
use super::state::AgentState;
use crate::message::Message;

/// A boxed, pinned future, the shape async-trait desugars `async fn` into.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a handler hands back for a synchronous request: `Some(value)` to
/// resolve the caller's future, `None` for a handler that doesn't reply.
pub type Reply = Option<Box<dyn Any + Send>>;

/// A message-driven entity with identity, state, subscriptions, and a
/// bound dispatcher (spec §3 DATA MODEL "Agent").
///
/// Implementors declare their handler table once, in [`Agent::define`],
/// called during cooperation registration before the agent's first event.
#[async_trait]
pub trait Agent: Send + Sync + Sized + 'static {
    /// The agent's closed set of named states.
    type State: AgentState;
    /// The error type returned by this agent's handlers.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Register `(state, mailbox, type_index) -> handler` bindings. Called
    /// exactly once, before `evt_start`; the resulting table is frozen
    /// afterward (spec §9 "State machine declarations").
    fn define(define: &mut Define<Self>);

    /// Fires once after successful cooperation registration, before any
    /// subscribed event is dispatched. Default: no-op.
    async fn evt_start(&mut self, _ctx: &AgentContext<Self::State>) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Fires once before deallocation, after pending demands are drained
    /// or discarded per shutdown policy. Default: no-op.
    async fn evt_finish(&mut self, _ctx: &AgentContext<Self::State>) {}
}

/// Implemented once per message type an agent handles. Mirrors the
/// `Handler<M>` idiom used across the Rust actor ecosystem, generalizing
/// this crate's originally single-message-type `Actor::handle_message` to
/// the heterogeneous, per-type dispatch spec §9 calls for.
#[async_trait]
pub trait Handles<M: Message>: Agent {
    /// Handle one demand of type `M`. Returning `Ok(Some(value))` resolves
    /// a pending synchronous request, if this demand carries one; it is
    /// ignored for ordinary asynchronous deliveries.
    ///
    /// Runs with exclusive access to the agent: at most one call to any
    /// `Handles` or [`HandlesConcurrently`] handler of this agent is in
    /// flight at the same time this one is.
    async fn handle(&mut self, message: M, ctx: &AgentContext<Self::State>) -> Result<Reply, Self::Error>;
}

/// A *thread-safe* handler (spec §4.2 step 2): takes `&self` rather than
/// `&mut self`, so the agent is responsible for its own interior
/// synchronization of any state this handler touches. Under
/// `advanced_thread_pool`, several demands of thread-safe-handled types may
/// be dispatched to the same agent concurrently; under every other
/// dispatcher kind they still run one at a time, same as [`Handles`].
#[async_trait]
pub trait HandlesConcurrently<M: Message>: Agent {
    /// Handle one demand of type `M` without exclusive access to the
    /// agent.
    async fn handle_concurrent(&self, message: M, ctx: &AgentContext<Self::State>) -> Result<Reply, Self::Error>;
}
