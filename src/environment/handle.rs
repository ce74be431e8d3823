//! `Environment`: process-wide scope owning named mailboxes, named
//! dispatchers, the timer service, and the cooperation registry (spec §3
//! "Environment"). Realized as an explicitly-threaded `Arc<Environment>`
//! rather than a global static — every agent context and dispatcher holds
//! a clone of the same handle, constructed once per process by the caller.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use tokio::sync::Notify;

// Layer 3: Internal module imports
use super::config::{EnvironmentConfig, InfrastructureKind};
use crate::coop::CoopRegistry;
use crate::dispatcher::{Dispatcher, DispatcherError};
use crate::error::RuntimeError;
use crate::mailbox::{Mailbox, MailboxHandle, MailboxKind};
use crate::timer::TimerService;

/// Reserved name under which [`EnvironmentParams::single_threaded`]
/// registers its dispatcher, so `environment.run()` knows which registered
/// dispatcher to drive on the caller's own thread.
pub const COOPERATIVE_DISPATCHER_NAME: &str = "__cooperative__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnvironmentState {
    Running,
    ShuttingDown,
    Stopped,
}

/// Process-wide runtime scope. See module docs.
pub struct Environment {
    config: EnvironmentConfig,
    mailboxes: DashMap<String, MailboxHandle>,
    named_dispatchers: DashMap<String, Arc<dyn Dispatcher>>,
    all_dispatchers: DashMap<usize, Arc<dyn Dispatcher>>,
    coops: CoopRegistry,
    timer: TimerService,
    state: parking_lot::Mutex<EnvironmentState>,
    shutdown_notify: Notify,
}

/// Shared handle to an [`Environment`]. Cloned freely; every clone refers
/// to the same underlying scope.
pub type EnvironmentHandle = Arc<Environment>;

fn dispatcher_key(dispatcher: &Arc<dyn Dispatcher>) -> usize {
    Arc::as_ptr(dispatcher) as *const () as usize
}

impl Environment {
    /// Build an environment with default configuration and no pre-registered
    /// dispatchers.
    pub fn new() -> Result<EnvironmentHandle, RuntimeError> {
        Self::with_params(EnvironmentParams::new())
    }

    /// Build an environment from caller-supplied parameters, starting and
    /// registering every dispatcher listed in `params` (spec §6
    /// "Environment launch").
    pub fn with_params(params: EnvironmentParams) -> Result<EnvironmentHandle, RuntimeError> {
        let env = Arc::new(Self {
            config: params.config,
            mailboxes: DashMap::new(),
            named_dispatchers: DashMap::new(),
            all_dispatchers: DashMap::new(),
            coops: CoopRegistry::new(),
            timer: TimerService::new()?,
            state: parking_lot::Mutex::new(EnvironmentState::Running),
            shutdown_notify: Notify::new(),
        });

        for (name, dispatcher) in params.dispatchers {
            dispatcher.start(Arc::clone(&env));
            env.track_dispatcher(&dispatcher);
            env.named_dispatchers.insert(name, dispatcher);
        }

        Ok(env)
    }

    /// This environment's configuration.
    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// The cooperation registry.
    pub fn coops(&self) -> &CoopRegistry {
        &self.coops
    }

    /// The timer service.
    pub fn timer(&self) -> &TimerService {
        &self.timer
    }

    /// Look up (or lazily create) a named, shared mailbox.
    pub fn mailbox(&self, name: impl Into<String>) -> MailboxHandle {
        self.mailboxes.entry(name.into()).or_insert_with(|| Mailbox::new(MailboxKind::Mpmc)).clone()
    }

    /// Look up a named dispatcher.
    pub fn dispatcher(&self, name: &str) -> Result<Arc<dyn Dispatcher>, DispatcherError> {
        self.named_dispatchers
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DispatcherError::NamedDispNotFound(name.to_string()))
    }

    /// Look up a named dispatcher and downcast it to a concrete type,
    /// e.g. [`crate::dispatcher::SingleThreadedDispatcher`].
    pub fn dispatcher_as<D: Dispatcher + 'static>(&self, name: &str) -> Result<Arc<D>, DispatcherError> {
        let dispatcher = self.dispatcher(name)?;
        dispatcher.as_any_arc().downcast::<D>().map_err(|_| DispatcherError::DispTypeMismatch(name.to_string()))
    }

    /// Record a dispatcher as tracked (for shutdown), returning `false` if
    /// it was already tracked (pointer-identity dedup).
    pub fn track_dispatcher(&self, dispatcher: &Arc<dyn Dispatcher>) -> bool {
        let key = dispatcher_key(dispatcher);
        if self.all_dispatchers.contains_key(&key) {
            return false;
        }
        self.all_dispatchers.insert(key, Arc::clone(dispatcher));
        true
    }

    /// Run on the caller's thread until shutdown. In
    /// [`InfrastructureKind::SingleThreadedCooperative`] mode, drives the
    /// cooperative dispatcher's drain loop directly; otherwise simply waits
    /// for [`Environment::stop`] to be called from elsewhere.
    pub async fn run(self: &EnvironmentHandle) {
        if self.config.infrastructure() == InfrastructureKind::SingleThreadedCooperative {
            if let Ok(cooperative) = self.dispatcher_as::<crate::dispatcher::SingleThreadedDispatcher>(COOPERATIVE_DISPATCHER_NAME) {
                cooperative.run_until_drained().await;
            }
            self.shutdown_notify.notify_waiters();
        } else {
            self.shutdown_notify.notified().await;
        }
    }

    /// Deregister every root cooperation, stop the timer service, then shut
    /// down and join every tracked dispatcher (spec §4.5 "Shutdown").
    pub async fn stop(self: &EnvironmentHandle) {
        {
            let mut state = self.state.lock();
            if *state != EnvironmentState::Running {
                return;
            }
            *state = EnvironmentState::ShuttingDown;
        }

        for root in self.coops.roots() {
            root.deregister(crate::coop::DeregisterReason::Shutdown).await;
        }

        self.timer.shutdown();

        for entry in self.all_dispatchers.iter() {
            entry.value().shutdown().await;
        }

        let shutdown_timeout = self.config.shutdown_timeout();
        let wait_all = async {
            for entry in self.all_dispatchers.iter() {
                entry.value().wait().await;
            }
        };
        if tokio::time::timeout(shutdown_timeout, wait_all).await.is_err() {
            tracing::warn!(timeout = ?shutdown_timeout, "environment stop timed out waiting for dispatchers to drain");
        }

        *self.state.lock() = EnvironmentState::Stopped;
        self.shutdown_notify.notify_waiters();
    }
}

/// Caller-supplied launch parameters (spec §6 "Environment launch"): which
/// infrastructure factory to use, which named dispatchers to pre-register,
/// and the exception reaction.
#[derive(Default)]
pub struct EnvironmentParams {
    config: EnvironmentConfig,
    dispatchers: Vec<(String, Arc<dyn Dispatcher>)>,
}

impl EnvironmentParams {
    /// Start with default configuration and no dispatchers registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: EnvironmentConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the exception reaction.
    pub fn exception_reaction(mut self, reaction: super::config::ExceptionReaction) -> Self {
        self.config = EnvironmentConfig::builder()
            .with_infrastructure(self.config.infrastructure())
            .with_exception_reaction(reaction)
            .with_mailbox_capacity(self.config.default_mailbox_capacity())
            .with_shutdown_timeout(self.config.shutdown_timeout())
            .build()
            .unwrap_or_default();
        self
    }

    /// Set the infrastructure kind explicitly.
    pub fn infrastructure(mut self, kind: InfrastructureKind) -> Self {
        self.config = EnvironmentConfig::builder()
            .with_infrastructure(kind)
            .with_exception_reaction(self.config.exception_reaction())
            .with_mailbox_capacity(self.config.default_mailbox_capacity())
            .with_shutdown_timeout(self.config.shutdown_timeout())
            .build()
            .unwrap_or_default();
        self
    }

    /// Register a named dispatcher, started once the environment is built.
    pub fn register_dispatcher(mut self, name: impl Into<String>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatchers.push((name.into(), dispatcher));
        self
    }

    /// Register `dispatcher` as the environment's single cooperative
    /// dispatcher and switch infrastructure to
    /// [`InfrastructureKind::SingleThreadedCooperative`].
    pub fn single_threaded(self, dispatcher: crate::dispatcher::SingleThreadedDispatcher) -> Self {
        self.infrastructure(InfrastructureKind::SingleThreadedCooperative)
            .register_dispatcher(COOPERATIVE_DISPATCHER_NAME, Arc::new(dispatcher))
    }
}
