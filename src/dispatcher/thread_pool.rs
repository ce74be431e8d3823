//! `thread_pool(N)` and `advanced_thread_pool(N)`: N workers sharing one
//! multi-thread tokio runtime (spec §4.4).
//!
//! The two `thread_pool` sub-modes differ only in whether a worker yields
//! after each demand: `individual_fifo` drains an agent's mini-queue in a
//! batch before another worker gets a turn at it; `cooperative_fifo` yields
//! after every demand so the pool round-robins fairly, one demand per
//! scheduling turn. `advanced_thread_pool` additionally runs more than one
//! driver loop per agent, so thread-safe handlers ([`HandlesConcurrently`])
//! may execute in parallel for the same agent — ordinary handlers still
//! serialize, since [`crate::agent::RunningAgent`] takes the write half of
//! its lock for those regardless of how many loops call `drive_one`.
//!
//! [`HandlesConcurrently`]: crate::agent::HandlesConcurrently

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::runtime::{Builder as RtBuilder, Runtime};
use tokio::task::JoinHandle;

// Layer 3: Internal module imports
use super::activator::BindingActivator;
use super::driver::spawn_agent_loops;
use super::error::DispatcherError;
use super::traits::Dispatcher;
use crate::agent::ErasedAgent;
use crate::environment::EnvironmentHandle;
use crate::util::AgentId;

/// Which FIFO discipline a non-advanced thread pool follows. Has no effect
/// on `advanced_thread_pool`, which always runs its configured concurrency
/// degree regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoMode {
    /// A worker drains one agent's queue in a batch before moving on.
    IndividualFifo,
    /// A worker yields after every demand, round-robining across agents.
    CooperativeFifo,
}

struct PoolInner {
    name: String,
    runtime: Mutex<Option<Runtime>>,
    accepting: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    concurrency: usize,
    cooperative: bool,
}

/// A shared pool of N worker threads, one tokio multi-thread runtime.
pub struct ThreadPoolDispatcher {
    name: String,
    inner: Arc<PoolInner>,
}

impl ThreadPoolDispatcher {
    /// `thread_pool(n)`: at most one driver loop per agent regardless of
    /// handler thread-safety.
    pub fn thread_pool(name: impl Into<String>, workers: usize, mode: FifoMode) -> Result<Self, DispatcherError> {
        Self::build(name, workers, 1, mode == FifoMode::CooperativeFifo)
    }

    /// `advanced_thread_pool(n)`: `concurrency` driver loops per agent, so
    /// thread-safe handlers may run in parallel for one agent.
    pub fn advanced_thread_pool(name: impl Into<String>, workers: usize, concurrency: usize) -> Result<Self, DispatcherError> {
        Self::build(name, workers, concurrency.max(1), false)
    }

    fn build(name: impl Into<String>, workers: usize, concurrency: usize, cooperative: bool) -> Result<Self, DispatcherError> {
        let name = name.into();
        let runtime = RtBuilder::new_multi_thread()
            .worker_threads(workers.max(1))
            .thread_name(format!("disp-pool-{name}"))
            .enable_all()
            .build()
            .map_err(|error| DispatcherError::StartupFailed(error.to_string()))?;
        Ok(Self {
            name: name.clone(),
            inner: Arc::new(PoolInner {
                name,
                runtime: Mutex::new(Some(runtime)),
                accepting: AtomicBool::new(true),
                tasks: Mutex::new(Vec::new()),
                concurrency,
                cooperative,
            }),
        })
    }
}

#[async_trait]
impl Dispatcher for ThreadPoolDispatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn allows_concurrent(&self) -> bool {
        self.inner.concurrency > 1
    }

    fn bind(&self, agent: Arc<dyn ErasedAgent>) -> Result<BindingActivator, DispatcherError> {
        if !self.inner.accepting.load(Ordering::SeqCst) {
            return Err(DispatcherError::ShuttingDown(self.inner.name.clone()));
        }
        let handle = {
            let guard = self.inner.runtime.lock();
            match guard.as_ref() {
                Some(rt) => rt.handle().clone(),
                None => return Err(DispatcherError::ShuttingDown(self.inner.name.clone())),
            }
        };
        let concurrency = self.inner.concurrency;
        let cooperative = self.inner.cooperative;
        let inner = Arc::clone(&self.inner);
        let activate = move || {
            let join = spawn_agent_loops(&handle, agent, concurrency, cooperative);
            inner.tasks.lock().push(join);
        };
        Ok(BindingActivator::new(activate, || {}))
    }

    fn unbind(&self, _agent_id: AgentId) {}

    fn start(&self, _env: EnvironmentHandle) {}

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn std::any::Any + Send + Sync> {
        self
    }

    async fn shutdown(&self) {
        self.inner.accepting.store(false, Ordering::SeqCst);
    }

    async fn wait(&self) {
        let joins: Vec<_> = self.inner.tasks.lock().drain(..).collect();
        for join in joins {
            let _ = join.await;
        }
        let runtime = self.inner.runtime.lock().take();
        if let Some(runtime) = runtime {
            let _ = tokio::task::spawn_blocking(move || {
                runtime.shutdown_timeout(Duration::from_secs(5));
            })
            .await;
        }
    }
}
