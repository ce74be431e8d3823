//! Per-agent context handed to every handler invocation.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

// Layer 3: Internal module imports
use super::state::AgentState;
use crate::environment::EnvironmentHandle;
use crate::mailbox::MailboxHandle;
use crate::util::{AgentAddress, AgentId};

/// Identity, current state, and environment access handed to an agent's
/// handlers. One instance per agent, constructed at coop-registration time
/// and held for the agent's whole lifetime.
pub struct AgentContext<S: AgentState> {
    id: AgentId,
    address: AgentAddress,
    direct_mailbox: MailboxHandle,
    state: Mutex<S>,
    created_at: DateTime<Utc>,
    env: EnvironmentHandle,
}

impl<S: AgentState> AgentContext<S> {
    /// Build a new context. Called once by the coop registration protocol.
    pub fn new(address: AgentAddress, direct_mailbox: MailboxHandle, env: EnvironmentHandle) -> Self {
        Self {
            id: *address.id(),
            address,
            direct_mailbox,
            state: Mutex::new(S::default()),
            created_at: Utc::now(),
            env,
        }
    }

    /// This agent's id.
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// This agent's address.
    pub fn address(&self) -> &AgentAddress {
        &self.address
    }

    /// This agent's private direct mailbox.
    pub fn direct_mailbox(&self) -> &MailboxHandle {
        &self.direct_mailbox
    }

    /// When this agent was registered.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Handle to the owning environment, for sends, requests, and timers.
    pub fn environment(&self) -> &EnvironmentHandle {
        &self.env
    }

    /// Read the current state.
    ///
    /// # Example
    /// ```rust
    /// use agentrt::agent::{AgentContext, AgentState};
    /// use agentrt::environment::Environment;
    /// use agentrt::mailbox::{Mailbox, MailboxKind};
    /// use agentrt::util::AgentAddress;
    ///
    /// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// enum Door {
    ///     #[default]
    ///     Closed,
    ///     Open,
    /// }
    /// impl AgentState for Door {}
    ///
    /// let env = Environment::new().expect("environment starts");
    /// let mailbox = Mailbox::new(MailboxKind::Mpmc);
    /// let ctx: AgentContext<Door> = AgentContext::new(AgentAddress::anonymous(), mailbox, env);
    /// assert_eq!(ctx.current_state(), Door::Closed);
    /// ctx.switch_to(Door::Open);
    /// assert_eq!(ctx.current_state(), Door::Open);
    /// ```
    pub fn current_state(&self) -> S {
        *self.state.lock()
    }

    /// Transition to a new state. Observed by the dispatcher before the
    /// next demand for this agent is looked up, per spec §5 ordering
    /// guarantees.
    pub fn switch_to(&self, new_state: S) {
        *self.state.lock() = new_state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::mailbox::{Mailbox, MailboxKind};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    enum Door {
        #[default]
        Closed,
        Open,
    }
    impl AgentState for Door {}

    #[test]
    fn test_starts_in_default_state() {
        let env = Environment::new().expect("environment starts");
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let ctx: AgentContext<Door> = AgentContext::new(AgentAddress::anonymous(), mailbox, env);
        assert_eq!(ctx.current_state(), Door::Closed);
    }

    #[test]
    fn test_switch_to_updates_state() {
        let env = Environment::new().expect("environment starts");
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let ctx: AgentContext<Door> = AgentContext::new(AgentAddress::anonymous(), mailbox, env);
        ctx.switch_to(Door::Open);
        assert_eq!(ctx.current_state(), Door::Open);
    }
}
