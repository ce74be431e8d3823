//! `active_object`: each agent gets its own dedicated thread, so handlers
//! for different agents run in parallel while handlers for one agent stay
//! serial (spec §4.4).

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use dashmap::DashMap;
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

struct ActiveObjectInner {
    name: String,
    runtimes: DashMap<AgentId, Mutex<DedicatedRuntime>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// One dedicated thread per bound agent.
pub struct ActiveObjectDispatcher {
    name: String,
    inner: Arc<ActiveObjectInner>,
}

impl ActiveObjectDispatcher {
    /// Build an empty dispatcher. Each `bind` spawns a fresh dedicated
    /// thread for the newly bound agent.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name: name.clone(),
            inner: Arc::new(ActiveObjectInner {
                name,
                runtimes: DashMap::new(),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }
}

#[async_trait]
impl Dispatcher for ActiveObjectDispatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn bind(&self, agent: Arc<dyn ErasedAgent>) -> Result<BindingActivator, DispatcherError> {
        let agent_id = agent.id();
        let runtime = DedicatedRuntime::spawn(format!("disp-{}-agent-{agent_id}", self.inner.name))?;
        let handle = runtime.handle().clone();
        self.inner.runtimes.insert(agent_id, Mutex::new(runtime));

        let inner = Arc::clone(&self.inner);
        let activate = move || {
            let join = spawn_agent_loops(&handle, agent, 1, false);
            inner.tasks.lock().push(join);
        };

        let inner_cancel = Arc::clone(&self.inner);
        let cancel = move || {
            if let Some((_, mut runtime)) = inner_cancel.runtimes.remove(&agent_id) {
                runtime.get_mut().shutdown();
                runtime.get_mut().join();
            }
        };

        Ok(BindingActivator::new(activate, cancel))
    }

    fn unbind(&self, agent_id: AgentId) {
        if let Some((_, mut runtime)) = self.inner.runtimes.remove(&agent_id) {
            runtime.get_mut().shutdown();
        }
    }

    fn start(&self, _env: EnvironmentHandle) {}

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn std::any::Any + Send + Sync> {
        self
    }

    async fn shutdown(&self) {
        for mut entry in self.inner.runtimes.iter_mut() {
            entry.value_mut().lock().shutdown();
        }
    }

    async fn wait(&self) {
        let joins: Vec<_> = self.inner.tasks.lock().drain(..).collect();
        for join in joins {
            let _ = join.await;
        }
        let inner = Arc::clone(&self.inner);
        let _ = tokio::task::spawn_blocking(move || {
            for mut entry in inner.runtimes.iter_mut() {
                entry.value_mut().lock().join();
            }
        })
        .await;
    }
}
