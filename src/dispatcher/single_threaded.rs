//! `single_threaded_not_mt_safe`: no worker threads. The environment's
//! `run()` drives this dispatcher's cooperative event loop on the caller's
//! own thread (spec §4.4, §5 "Scheduling model").

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use parking_lot::Mutex;

// Layer 3: Internal module imports
use super::activator::BindingActivator;
use super::error::DispatcherError;
use super::traits::Dispatcher;
use crate::agent::{DriveOutcome, ErasedAgent};
use crate::environment::EnvironmentHandle;
use crate::util::AgentId;

struct SingleThreadedInner {
    agents: Mutex<Vec<Arc<dyn ErasedAgent>>>,
    pending: Mutex<Vec<Arc<dyn ErasedAgent>>>,
    running: AtomicBool,
}

/// Cooperative, threadless dispatcher. Bound agents are driven in-line by
/// whichever thread calls [`SingleThreadedDispatcher::run_until_drained`] —
/// normally [`crate::environment::Environment::run`].
pub struct SingleThreadedDispatcher {
    name: String,
    inner: Arc<SingleThreadedInner>,
}

impl SingleThreadedDispatcher {
    /// Build an empty cooperative dispatcher.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(SingleThreadedInner {
                agents: Mutex::new(Vec::new()),
                pending: Mutex::new(Vec::new()),
                running: AtomicBool::new(true),
            }),
        }
    }

    /// Drain every bound agent's ready work until no agent has a pending
    /// demand and none remain bound, or `shutdown` is called. Each agent is
    /// polled with a non-cancelling check for a queued demand; an agent with
    /// nothing ready is skipped without blocking, so every bound agent is
    /// served round-robin on the calling thread without a dedicated executor
    /// per agent, and a handler that's actually running is never torn down
    /// mid-flight.
    pub async fn run_until_drained(&self) {
        loop {
            if !self.inner.running.load(Ordering::SeqCst) {
                break;
            }

            let newly_started: Vec<_> = self.inner.pending.lock().drain(..).collect();
            for agent in &newly_started {
                agent.run_start().await;
            }
            if !newly_started.is_empty() {
                self.inner.agents.lock().extend(newly_started);
            }

            let agents: Vec<_> = self.inner.agents.lock().clone();
            if agents.is_empty() {
                break;
            }

            let mut progressed = false;
            let mut closed = Vec::new();
            for agent in &agents {
                match agent.try_drive_one().await {
                    Some(DriveOutcome::QueueClosed) => closed.push(Arc::clone(agent)),
                    Some(_) => progressed = true,
                    None => {}
                }
            }
            if !closed.is_empty() {
                let closed_ids: Vec<_> = closed.iter().map(|a| a.id()).collect();
                self.inner.agents.lock().retain(|a| !closed_ids.contains(&a.id()));
                for agent in closed {
                    agent.run_finish().await;
                }
            }
            if !progressed {
                tokio::task::yield_now().await;
            }
        }
    }
}

#[async_trait]
impl Dispatcher for SingleThreadedDispatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn bind(&self, agent: Arc<dyn ErasedAgent>) -> Result<BindingActivator, DispatcherError> {
        if !self.inner.running.load(Ordering::SeqCst) {
            return Err(DispatcherError::ShuttingDown(self.name.clone()));
        }
        let inner = Arc::clone(&self.inner);
        let activate = move || {
            // Queued for `run_until_drained` to pick up: it calls
            // `run_start` once before adding the agent to its active
            // roster, so activation never blocks the registration caller.
            inner.pending.lock().push(agent);
        };
        Ok(BindingActivator::new(activate, || {}))
    }

    fn unbind(&self, agent_id: AgentId) {
        self.inner.agents.lock().retain(|a| a.id() != agent_id);
        self.inner.pending.lock().retain(|a| a.id() != agent_id);
    }

    fn start(&self, _env: EnvironmentHandle) {}

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn std::any::Any + Send + Sync> {
        self
    }

    async fn shutdown(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
    }

    async fn wait(&self) {}
}
