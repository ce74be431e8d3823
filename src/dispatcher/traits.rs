//! The `Dispatcher` trait every scheduler variant implements (spec §4.4).

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal module imports
use super::activator::BindingActivator;
use super::error::DispatcherError;
use crate::agent::ErasedAgent;
use crate::environment::EnvironmentHandle;
use crate::util::AgentId;

/// A scheduler owning one or more worker threads and an assignment policy
/// from agents to threads. See spec §4.4 for the variant set.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Name used for diagnostics and named-dispatcher lookup.
    fn name(&self) -> &str;

    /// Whether this dispatcher admits concurrent invocation of thread-safe
    /// handlers for the same agent. Only `advanced_thread_pool` returns
    /// `true`.
    fn allows_concurrent(&self) -> bool {
        false
    }

    /// Reserve a slot for `agent` without starting delivery. Returns a
    /// [`BindingActivator`] the cooperation registration protocol commits
    /// or rolls back.
    fn bind(&self, agent: Arc<dyn ErasedAgent>) -> Result<BindingActivator, DispatcherError>;

    /// Release any bookkeeping held for an agent that is being torn down.
    /// Does not interrupt a driver loop already running; that loop exits on
    /// its own once the agent's event queue closes.
    fn unbind(&self, agent_id: AgentId);

    /// Give the dispatcher a handle to the owning environment. Called once,
    /// before the first `bind`.
    fn start(&self, env: EnvironmentHandle);

    /// Expose the concrete dispatcher for typed, named lookup (see
    /// `Environment::dispatcher_as`). Every implementor just wraps `self`.
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn std::any::Any + Send + Sync>;

    /// Stop accepting new bindings and signal every worker to drain.
    async fn shutdown(&self);

    /// Block until every worker this dispatcher owns has drained and
    /// joined.
    async fn wait(&self);
}
