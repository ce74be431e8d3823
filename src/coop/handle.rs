//! `CoopHandle`: the live, shared handle to a registered cooperation (spec
//! §4.5). Agents and the dispatcher-error path hold clones of this; the
//! environment's [`super::registry::CoopRegistry`] holds the canonical
//! entry until it fully drains.

// Layer 1: Standard library imports
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use crate::agent::{DispatchError, ErasedAgent};
use crate::dispatcher::Dispatcher;
use crate::environment::{Environment, ExceptionReaction};
use crate::mailbox::MailboxHandle;
use crate::util::{AgentAddress, TypeIndex};

/// A bound agent as tracked by its cooperation: the agent itself, the
/// dispatcher it's bound to, and every `(mailbox, type_index)` pair it
/// subscribed during `define()`. Torn down in reverse on deregistration:
/// unsubscribe, then unbind.
#[derive(Clone)]
pub(crate) struct BoundAgent {
    pub(crate) agent: Arc<dyn ErasedAgent>,
    pub(crate) dispatcher: Arc<dyn Dispatcher>,
    pub(crate) subscriptions: Vec<(MailboxHandle, TypeIndex)>,
}

/// Why a cooperation is being torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeregisterReason {
    /// `environment.stop()` is shutting everything down.
    Shutdown,
    /// An agent's handler returned an error and the exception reaction
    /// policy is `shutdown_on_exception` (the default).
    UnhandledException,
    /// Explicit caller-initiated `deregister_coop`.
    Requested,
}

/// Called once a cooperation has fully drained (spec §4.5 "completion is
/// reported via an optional notifier").
pub type CoopNotifier = Arc<dyn Fn(&str, DeregisterReason) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoopState {
    Active,
    Draining,
    Done,
}

struct CoopInner {
    name: String,
    parent: Option<CoopHandle>,
    children: Mutex<Vec<CoopHandle>>,
    agents: Mutex<Vec<BoundAgent>>,
    state: Mutex<CoopState>,
    env: Weak<Environment>,
    notifier: Option<CoopNotifier>,
}

/// Shared handle to a registered cooperation.
#[derive(Clone)]
pub struct CoopHandle(Arc<CoopInner>);

impl fmt::Debug for CoopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoopHandle").field("name", &self.0.name).finish()
    }
}

impl CoopHandle {
    pub(crate) fn new(
        name: String,
        parent: Option<CoopHandle>,
        env: Weak<Environment>,
        notifier: Option<CoopNotifier>,
    ) -> Self {
        let handle = Self(Arc::new(CoopInner {
            name,
            parent: parent.clone(),
            children: Mutex::new(Vec::new()),
            agents: Mutex::new(Vec::new()),
            state: Mutex::new(CoopState::Active),
            env,
            notifier,
        }));
        if let Some(parent) = parent {
            parent.add_child(handle.clone());
        }
        handle
    }

    /// This cooperation's registered name.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// True if this cooperation has no parent.
    pub fn is_root(&self) -> bool {
        self.0.parent.is_none()
    }

    fn add_child(&self, child: CoopHandle) {
        self.0.children.lock().push(child);
    }

    /// Unlink a child cooperation by name. Used by
    /// [`super::builder::CoopBuilder::register`] to roll back a failed
    /// registration attempt that had already been linked to its parent.
    pub(crate) fn remove_child(&self, name: &str) {
        self.0.children.lock().retain(|child| child.name() != name);
    }

    /// Register a bound agent as a member of this cooperation. Called once
    /// per agent during `register()`, after its dispatcher binding has
    /// been activated.
    pub(crate) fn register_agent(&self, agent: BoundAgent) {
        self.0.agents.lock().push(agent);
    }

    /// Route an unhandled handler error through the environment's
    /// exception-reaction policy (spec §4.2 step 4, §7 taxonomy item 3).
    /// Fire-and-forget: the caller (a dispatcher driver loop) must not
    /// block on this.
    pub fn report_handler_error(&self, address: &AgentAddress, error: DispatchError) {
        let Some(env) = self.0.env.upgrade() else {
            return;
        };
        match env.config().exception_reaction() {
            ExceptionReaction::AbortOnException => {
                tracing::error!(agent = %address, error = %error, "unhandled agent error, aborting process");
                std::process::abort();
            }
            ExceptionReaction::ShutdownOnException => {
                tracing::warn!(agent = %address, error = %error, "unhandled agent error, deregistering cooperation");
                let coop = self.clone();
                tokio::spawn(async move {
                    coop.deregister(DeregisterReason::UnhandledException).await;
                });
            }
            ExceptionReaction::IgnoreException => {
                tracing::debug!(agent = %address, error = %error, "unhandled agent error, ignoring");
            }
        }
    }

    /// Drain this cooperation: deregister all children first, unsubscribe
    /// and unbind every member agent, wait for each to report drained, then
    /// remove this cooperation from the environment's registry. Idempotent
    /// — a second call while already draining or done is a no-op.
    pub fn deregister(&self, reason: DeregisterReason) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            {
                let mut state = self.0.state.lock();
                if *state != CoopState::Active {
                    return;
                }
                *state = CoopState::Draining;
            }

            let children = self.0.children.lock().clone();
            for child in children {
                child.deregister(reason).await;
            }

            let agents = self.0.agents.lock().clone();
            for bound in &agents {
                for (mailbox, type_index) in &bound.subscriptions {
                    mailbox.unsubscribe(*type_index, bound.agent.id());
                }
                bound.dispatcher.unbind(bound.agent.id());
            }
            for bound in &agents {
                bound.agent.drained().await;
            }

            if let Some(env) = self.0.env.upgrade() {
                env.coops().remove(&self.0.name);
            }

            *self.0.state.lock() = CoopState::Done;

            if let Some(notifier) = &self.0.notifier {
                notifier(&self.0.name, reason);
            }
        })
    }
}
