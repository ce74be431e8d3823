//! Agent core: identity, state machine, subscription table, and the
//! define-phase handler builder.

pub mod context;
pub mod define;
pub mod runner;
pub mod state;
pub mod traits;

pub use context::AgentContext;
pub use define::{Define, DispatchError, HandlerEntry, HandlerTable, PendingSubscription};
pub use runner::{DriveOutcome, ErasedAgent, RunningAgent};
pub use state::AgentState;
pub use traits::{Agent, BoxFuture, Handles, HandlesConcurrently, Reply};
