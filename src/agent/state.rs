//! The `AgentState` trait: a named node in an agent's state machine.

// Layer 1: Standard library imports
use std::fmt::Debug;
use std::hash::Hash;

/// A closed set of named states for one agent type. `Default` supplies the
/// implicit default state every agent starts in before any transition;
/// handlers registered on an explicit state shadow handlers registered on
/// the default one, per spec §3.
///
/// # Example
/// ```rust
/// use agentrt::agent::AgentState;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
/// enum Door {
///     #[default]
///     Closed,
///     Open,
/// }
///
/// impl AgentState for Door {}
///
/// assert_eq!(Door::default(), Door::Closed);
/// ```
pub trait AgentState: Copy + Eq + Hash + Debug + Send + Sync + Default + 'static {}
