//! `one_thread`: one dedicated thread shared by every bound agent, strict
//! FIFO across agents (spec §4.4).

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

// Layer 3: Internal module imports
use super::activator::BindingActivator;
use super::driver::spawn_agent_loops;
use super::error::DispatcherError;
use super::runtime_pool::DedicatedRuntime;
use super::traits::Dispatcher;
use crate::agent::ErasedAgent;
use crate::environment::EnvironmentHandle;
use crate::util::AgentId;

struct OneThreadInner {
    runtime: Mutex<DedicatedRuntime>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// One dedicated OS thread running a current-thread tokio runtime; every
/// agent bound here is driven by a task spawned onto that same thread, so
/// handler invocations across all bound agents are strictly serialized.
pub struct OneThreadDispatcher {
    name: String,
    inner: Arc<OneThreadInner>,
}

impl OneThreadDispatcher {
    /// Spawn the dedicated thread and build a dispatcher bound to it.
    pub fn new(name: impl Into<String>) -> Result<Self, DispatcherError> {
        let name = name.into();
        let runtime = DedicatedRuntime::spawn(format!("disp-one-thread-{name}"))?;
        Ok(Self {
            name,
            inner: Arc::new(OneThreadInner {
                runtime: Mutex::new(runtime),
                tasks: Mutex::new(Vec::new()),
            }),
        })
    }
}

#[async_trait]
impl Dispatcher for OneThreadDispatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn bind(&self, agent: Arc<dyn ErasedAgent>) -> Result<BindingActivator, DispatcherError> {
        let handle = self.inner.runtime.lock().handle().clone();
        let inner = Arc::clone(&self.inner);
        let activate = move || {
            let join = spawn_agent_loops(&handle, agent, 1, false);
            inner.tasks.lock().push(join);
        };
        Ok(BindingActivator::new(activate, || {}))
    }

    fn unbind(&self, _agent_id: AgentId) {
        // The driver loop retires itself once the agent's queue closes;
        // nothing to release eagerly for a shared thread.
    }

    fn start(&self, _env: EnvironmentHandle) {}

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn std::any::Any + Send + Sync> {
        self
    }

    async fn shutdown(&self) {
        self.inner.runtime.lock().shutdown();
    }

    async fn wait(&self) {
        let joins: Vec<_> = self.inner.tasks.lock().drain(..).collect();
        for join in joins {
            let _ = join.await;
        }
        let inner = Arc::clone(&self.inner);
        let _ = tokio::task::spawn_blocking(move || {
            inner.runtime.lock().join();
        })
        .await;
    }
}
