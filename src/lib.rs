//! # agentrt — an in-process actor runtime
//!
//! Mailboxes, agents, a cooperation lifecycle, and a dispatcher family for
//! building concurrent systems out of independent, message-driven state
//! machines within one process.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use agentrt::prelude::*;
//! use async_trait::async_trait;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
//! enum CounterState {
//!     #[default]
//!     Running,
//! }
//! impl AgentState for CounterState {}
//!
//! #[derive(Debug, Clone)]
//! struct Increment;
//! impl Message for Increment {
//!     const MESSAGE_TYPE: &'static str = "increment";
//! }
//!
//! struct Counter {
//!     count: u64,
//! }
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("counter error")]
//! struct CounterError;
//!
//! #[async_trait]
//! impl Agent for Counter {
//!     type State = CounterState;
//!     type Error = CounterError;
//!
//!     fn define(define: &mut Define<Self>) {
//!         let mailbox = define.direct_mailbox().expect("direct mailbox").clone();
//!         define.on::<Increment>(CounterState::Running, &mailbox, None, None);
//!     }
//! }
//!
//! #[async_trait]
//! impl Handles<Increment> for Counter {
//!     async fn handle(&mut self, _msg: Increment, _ctx: &AgentContext<CounterState>) -> Result<Reply, CounterError> {
//!         self.count += 1;
//!         Ok(None)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let env = Environment::new().unwrap();
//!     let dispatcher = std::sync::Arc::new(dispatcher::one_thread("workers").unwrap());
//!
//!     let coop = CoopBuilder::new("root")
//!         .agent(AgentAddress::named("counter-1"), dispatcher, None, Counter { count: 0 })
//!         .register(&env)
//!         .unwrap();
//!
//!     env.stop().await;
//!     let _ = coop;
//! }
//! ```
//!
//! # Module organization
//!
//! ## Core model
//! - [`message`] — the `Message`/`Signal` traits, mutability, and the
//!   type-erased [`message::Envelope`] used for delivery.
//! - [`mailbox`] — subscription-routed delivery endpoint, the wiring between
//!   senders and an agent's event queue.
//! - [`queue`] — the per-agent FIFO of resolved [`queue::Demand`]s a
//!   dispatcher drains.
//! - [`agent`] — the `Agent`/`Handles`/`HandlesConcurrently` traits, the
//!   define-phase handler-table builder, and the type-erased running-agent
//!   shell a dispatcher actually drives.
//!
//! ## Lifecycle and scheduling
//! - [`coop`] — cooperation: the atomic, all-or-nothing unit of agent
//!   registration and teardown.
//! - [`dispatcher`] — the scheduler family (`one_thread`, `active_object`,
//!   `active_group`, `thread_pool`, `advanced_thread_pool`,
//!   `single_threaded_not_mt_safe`).
//! - [`environment`] — the owning scope for named mailboxes, named
//!   dispatchers, the timer service, and the cooperation registry.
//!
//! ## Ambient services
//! - [`limit`] — per-`(agent, message_type)` message-rate policies and their
//!   overflow reactions.
//! - [`timer`] — single-shot and periodic delivery onto a target mailbox.
//! - [`request`] — the synchronous request/reply bridge for non-agent
//!   callers.
//! - [`util`] — identifiers (`AgentId`, `MailboxId`, `TypeIndex`, ...) shared
//!   across the runtime.
//!
//! [`error::RuntimeError`] aggregates every subsystem's error type behind one
//! enum for callers who don't need per-subsystem granularity.

pub mod agent;
pub mod coop;
pub mod dispatcher;
pub mod environment;
pub mod error;
pub mod limit;
pub mod mailbox;
pub mod message;
pub mod prelude;
pub mod queue;
pub mod request;
pub mod timer;
pub mod util;

pub use agent::{Agent, AgentContext, AgentState, Define, Handles, HandlesConcurrently, Reply};
pub use coop::{CoopBuilder, CoopError, CoopHandle, DeregisterReason};
pub use environment::{Environment, EnvironmentHandle, EnvironmentParams};
pub use error::RuntimeError;
pub use mailbox::{Mailbox, MailboxError, MailboxHandle, MailboxKind};
pub use message::{Envelope, Message, MessagePriority, Mutability, Signal};
pub use util::{AgentAddress, AgentId, MailboxId, TypeIndex};
