//! Prelude: the common imports for building agents with this crate.
//!
//! ```rust
//! use agentrt::prelude::*;
//! ```

// Core agent model
pub use crate::agent::{Agent, AgentContext, AgentState, Define, Handles, HandlesConcurrently, Reply};

// Cooperation lifecycle
pub use crate::coop::{CoopBuilder, CoopError, CoopHandle, CoopNotifier, DeregisterReason};

// Dispatcher family
pub use crate::dispatcher::{
    active_group, active_object, advanced_thread_pool, one_thread, single_threaded_not_mt_safe, thread_pool, Dispatcher, DispatcherError,
    FifoMode,
};

// Environment
pub use crate::environment::{Environment, EnvironmentConfig, EnvironmentHandle, EnvironmentParams, ExceptionReaction, InfrastructureKind};

// Messaging
pub use crate::message::{Envelope, Message, MessagePriority, Mutability, Signal};

// Mailbox
pub use crate::mailbox::{Mailbox, MailboxError, MailboxHandle, MailboxKind};

// Message limits
pub use crate::limit::{LimitReaction, MessageLimiter, RedirectFn, TransformFn};

// Timers
pub use crate::timer::TimerError;

// Synchronous request bridge
pub use crate::request::{request_future, request_value, send, send_mut, send_signal, RequestError};

// Crate-level error aggregation
pub use crate::error::RuntimeError;

// Utilities
pub use crate::util::{AgentAddress, AgentId, TypeIndex};
