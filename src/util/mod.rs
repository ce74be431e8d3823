//! Utility types and helpers shared across the runtime.

pub mod ids;
pub mod serde_helpers;

pub use ids::{AgentAddress, AgentId, EnvelopeId, MailboxId, TypeIndex};
pub use serde_helpers::duration_serde;
