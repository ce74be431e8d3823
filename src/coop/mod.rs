//! Cooperation: the atomic unit of agent lifecycle management (spec §4.5).
//! A cooperation is a named group of agents registered and deregistered
//! together; an agent belongs to exactly one cooperation for its whole
//! life. Cooperations may nest — a parent cannot be deregistered while any
//! child remains registered.

pub mod builder;
pub mod error;
pub mod handle;
pub mod registry;

pub use builder::CoopBuilder;
pub use error::CoopError;
pub use handle::{CoopHandle, CoopNotifier, DeregisterReason};
pub use registry::CoopRegistry;
