//! `active_group`: agents are grouped by name, one dedicated thread per
//! group (spec §4.4). An agent with no group name is its own singleton
//! group, keyed by agent id.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicUsize, Ordering};
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

struct GroupRuntime {
    runtime: Mutex<DedicatedRuntime>,
    refcount: AtomicUsize,
}

struct ActiveGroupInner {
    name: String,
    groups: DashMap<String, Arc<GroupRuntime>>,
    groups_lock: Mutex<()>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ActiveGroupInner {
    fn release_group(&self, key: &str) {
        let _guard = self.groups_lock.lock();
        let Some(group) = self.groups.get(key).map(|g| Arc::clone(&g)) else {
            return;
        };
        if group.refcount.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.groups.remove(key);
            group.runtime.lock().shutdown();
            group.runtime.lock().join();
        }
    }
}

/// One dedicated thread per named group of agents.
pub struct ActiveGroupDispatcher {
    name: String,
    inner: Arc<ActiveGroupInner>,
}

impl ActiveGroupDispatcher {
    /// Build an empty dispatcher. Groups are created lazily on first bind.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name: name.clone(),
            inner: Arc::new(ActiveGroupInner {
                name,
                groups: DashMap::new(),
                groups_lock: Mutex::new(()),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }
}

#[async_trait]
impl Dispatcher for ActiveGroupDispatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn bind(&self, agent: Arc<dyn ErasedAgent>) -> Result<BindingActivator, DispatcherError> {
        let key = agent.group().map(str::to_string).unwrap_or_else(|| agent.id().to_string());

        let group = {
            let _guard = self.inner.groups_lock.lock();
            if let Some(existing) = self.inner.groups.get(&key) {
                Arc::clone(&existing)
            } else {
                let runtime = DedicatedRuntime::spawn(format!("disp-{}-group-{key}", self.inner.name))?;
                let group = Arc::new(GroupRuntime {
                    runtime: Mutex::new(runtime),
                    refcount: AtomicUsize::new(0),
                });
                self.inner.groups.insert(key.clone(), Arc::clone(&group));
                group
            }
        };
        group.refcount.fetch_add(1, Ordering::SeqCst);

        let handle = group.runtime.lock().handle().clone();
        let inner = Arc::clone(&self.inner);
        let activate = move || {
            let join = spawn_agent_loops(&handle, agent, 1, false);
            inner.tasks.lock().push(join);
        };

        let inner_cancel = Arc::clone(&self.inner);
        let key_for_cancel = key;
        let cancel = move || {
            inner_cancel.release_group(&key_for_cancel);
        };

        Ok(BindingActivator::new(activate, cancel))
    }

    fn unbind(&self, agent_id: AgentId) {
        // Groups are keyed by name, not agent id; releasing requires the
        // group key, which the agent itself (not this dispatcher) knows.
        // Ungrouped agents are released via their own id as key.
        self.inner.release_group(&agent_id.to_string());
    }

    fn start(&self, _env: EnvironmentHandle) {}

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn std::any::Any + Send + Sync> {
        self
    }

    async fn shutdown(&self) {
        for entry in self.inner.groups.iter() {
            entry.value().runtime.lock().shutdown();
        }
    }

    async fn wait(&self) {
        let joins: Vec<_> = self.inner.tasks.lock().drain(..).collect();
        for join in joins {
            let _ = join.await;
        }
        let inner = Arc::clone(&self.inner);
        let _ = tokio::task::spawn_blocking(move || {
            for entry in inner.groups.iter() {
                entry.value().runtime.lock().join();
            }
        })
        .await;
    }
}
