// Layer 1: Standard library imports
use std::any::TypeId;
use std::fmt::{self, Display};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Layer 3: Internal module imports
// (none)

/// Unique identifier for an agent in the system.
///
/// # Example
/// ```rust
/// use agentrt::util::AgentId;
///
/// let id1 = AgentId::new();
/// let id2 = AgentId::new();
/// assert_ne!(id1, id2); // Globally unique
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(Uuid);

impl AgentId {
    /// Generate a new random agent id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an agent id from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a mailbox, used as part of the handler-table key
/// `(state, mailbox, type_index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MailboxId(Uuid);

impl MailboxId {
    /// Generate a new random mailbox id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MailboxId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for MailboxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an envelope, used for correlation and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvelopeId(Uuid);

impl EnvelopeId {
    /// Generate a new random envelope id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EnvelopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for EnvelopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Agent address: either named (discoverable, useful for coop registration
/// diagnostics) or anonymous (identified only by its id). The address is the
/// agent half of a subscription key `(mailbox, type_index, agent)`.
///
/// # Example
/// ```rust
/// use agentrt::util::AgentAddress;
///
/// let named = AgentAddress::named("philosopher-1");
/// assert_eq!(named.name(), Some("philosopher-1"));
///
/// let anon = AgentAddress::anonymous();
/// assert_eq!(anon.name(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentAddress {
    /// Named agent with a human-readable identifier.
    Named { id: AgentId, name: String },
    /// Anonymous agent, addressable only by id.
    Anonymous { id: AgentId },
}

impl AgentAddress {
    /// Create a new named agent address.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named {
            id: AgentId::new(),
            name: name.into(),
        }
    }

    /// Create a new anonymous agent address.
    pub fn anonymous() -> Self {
        Self::Anonymous { id: AgentId::new() }
    }

    /// Get the agent id.
    pub fn id(&self) -> &AgentId {
        match self {
            Self::Named { id, .. } => id,
            Self::Anonymous { id } => id,
        }
    }

    /// Get the agent name, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named { name, .. } => Some(name),
            Self::Anonymous { .. } => None,
        }
    }
}

impl Display for AgentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { id, name } => write!(f, "{name}@{id}"),
            Self::Anonymous { id } => write!(f, "anonymous@{id}"),
        }
    }
}

/// Stable identifier for a message payload type, used as half of a
/// subscription key `(type_index, agent)`.
///
/// Wraps [`TypeId`] rather than reflecting over it at runtime: subscription
/// lookups are a hash-map probe on `TypeIndex`, resolved once per message
/// type at the call site via [`TypeIndex::of`].
///
/// # Example
/// ```rust
/// use agentrt::util::TypeIndex;
///
/// #[derive(Debug)]
/// struct Ping;
/// #[derive(Debug)]
/// struct Pong;
///
/// assert_ne!(TypeIndex::of::<Ping>(), TypeIndex::of::<Pong>());
/// assert_eq!(TypeIndex::of::<Ping>(), TypeIndex::of::<Ping>());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeIndex {
    type_id: TypeId,
    type_name: &'static str,
}

impl TypeIndex {
    /// Resolve the type index for `T`.
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Human-readable type name, for diagnostics only — never used as a key.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl Display for TypeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_creation() {
        let id1 = AgentId::new();
        let id2 = AgentId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_agent_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = AgentId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), &uuid);
    }

    #[test]
    fn test_agent_address_named() {
        let addr = AgentAddress::named("worker");
        assert_eq!(addr.name(), Some("worker"));
    }

    #[test]
    fn test_agent_address_anonymous() {
        let addr = AgentAddress::anonymous();
        assert_eq!(addr.name(), None);
    }

    #[test]
    fn test_agent_address_display() {
        let addr = AgentAddress::named("p1");
        assert!(format!("{addr}").starts_with("p1@"));
    }

    #[test]
    fn test_agent_address_equality_distinct_ids() {
        let a = AgentAddress::named("same-name");
        let b = AgentAddress::named("same-name");
        assert_ne!(a, b);
    }

    #[test]
    fn test_type_index_distinct_types() {
        struct A;
        struct B;
        assert_ne!(TypeIndex::of::<A>(), TypeIndex::of::<B>());
    }

    #[test]
    fn test_type_index_same_type_equal() {
        struct A;
        assert_eq!(TypeIndex::of::<A>(), TypeIndex::of::<A>());
    }

    #[test]
    fn test_type_index_name_contains_type() {
        struct MyUniqueMarker;
        let ti = TypeIndex::of::<MyUniqueMarker>();
        assert!(ti.type_name().contains("MyUniqueMarker"));
    }

    #[test]
    fn test_envelope_id_unique() {
        assert_ne!(EnvelopeId::new(), EnvelopeId::new());
    }

    #[test]
    fn test_mailbox_id_unique() {
        assert_ne!(MailboxId::new(), MailboxId::new());
    }
}
