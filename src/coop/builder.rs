//! `CoopBuilder`: the atomic registration protocol for a cooperation (spec
//! §4.5 "register_coop"). Collects agents to register, then either commits
//! every one of them — mailbox subscriptions, dispatcher bindings, and the
//! coop's own entry in the environment's registry — or rolls all of it back,
//! leaving no trace of a partially-registered cooperation.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::error::CoopError;
use super::handle::{BoundAgent, CoopHandle, CoopNotifier};
use crate::agent::{Agent, AgentContext, Define, ErasedAgent, RunningAgent};
use crate::dispatcher::{BindingActivator, Dispatcher};
use crate::environment::EnvironmentHandle;
use crate::mailbox::{Mailbox, MailboxHandle, MailboxKind};
use crate::util::{AgentAddress, TypeIndex};

struct Built {
    bound: BoundAgent,
    activator: BindingActivator,
}

type PendingAgent = Box<dyn FnOnce(&EnvironmentHandle, &CoopHandle) -> Result<Built, CoopError> + Send>;

fn build_pending<A: Agent>(address: AgentAddress, dispatcher: Arc<dyn Dispatcher>, group: Option<String>, agent: A) -> PendingAgent {
    Box::new(move |env: &EnvironmentHandle, coop: &CoopHandle| -> Result<Built, CoopError> {
        let direct_mailbox = Mailbox::new(MailboxKind::Direct(*address.id()));

        let mut define = Define::<A>::for_agent(Arc::clone(&direct_mailbox), Arc::clone(env));
        A::define(&mut define);
        let table = define.freeze();

        let ctx = Arc::new(AgentContext::<A::State>::new(
            address.clone(),
            Arc::clone(&direct_mailbox),
            Arc::clone(env),
        ));

        let (queue_tx, queue_rx) = crate::queue::unbounded();

        let mut subscribed: Vec<(MailboxHandle, TypeIndex)> = Vec::new();
        for sub in &table.subscriptions {
            let result = sub.mailbox.subscribe(
                sub.type_index,
                *address.id(),
                sub.filter.clone(),
                sub.limiter.clone(),
                queue_tx.clone(),
            );
            match result {
                Ok(()) => subscribed.push((Arc::clone(&sub.mailbox), sub.type_index)),
                Err(error) => {
                    for (mailbox, type_index) in &subscribed {
                        mailbox.unsubscribe(*type_index, *address.id());
                    }
                    return Err(CoopError::from(error));
                }
            }
        }

        let allow_concurrent = dispatcher.allows_concurrent();
        let running = RunningAgent::new(agent, table, ctx, queue_rx, group, coop.clone(), allow_concurrent);
        let erased: Arc<dyn ErasedAgent> = Arc::new(running);

        let activator = match dispatcher.bind(Arc::clone(&erased)) {
            Ok(activator) => activator,
            Err(error) => {
                for (mailbox, type_index) in &subscribed {
                    mailbox.unsubscribe(*type_index, *address.id());
                }
                return Err(CoopError::from(error));
            }
        };

        Ok(Built {
            bound: BoundAgent {
                agent: erased,
                dispatcher,
                subscriptions: subscribed,
            },
            activator,
        })
    })
}

/// Builder for `register_coop`. Accumulates the agents to register as one
/// group; `register` either binds and subscribes every one of them or rolls
/// the whole attempt back.
pub struct CoopBuilder {
    name: String,
    parent: Option<String>,
    notifier: Option<CoopNotifier>,
    agents: Vec<PendingAgent>,
}

impl CoopBuilder {
    /// Start building a cooperation with the given (unique) name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            notifier: None,
            agents: Vec::new(),
        }
    }

    /// Register this cooperation as a child of an already-registered parent.
    /// A parent cannot be deregistered while it still has children.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Run `notifier` once this cooperation has fully drained.
    pub fn on_complete(mut self, notifier: CoopNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Add an agent to this cooperation: its address, the dispatcher it
    /// should bind to, its optional named group (consulted by
    /// `active_group` dispatchers), and the agent value itself. `define()`
    /// runs lazily, during `register`.
    pub fn agent<A: Agent>(mut self, address: AgentAddress, dispatcher: Arc<dyn Dispatcher>, group: Option<String>, agent: A) -> Self {
        self.agents.push(build_pending(address, dispatcher, group, agent));
        self
    }

    /// Commit the registration: build every agent's handler table, subscribe
    /// every mailbox binding, reserve every dispatcher slot, then activate
    /// all of it at once. Any single failure rolls back everything built so
    /// far and leaves no trace — no agent becomes visible to any mailbox or
    /// dispatcher (spec §4.5 "all-or-nothing").
    pub fn register(self, env: &EnvironmentHandle) -> Result<CoopHandle, CoopError> {
        if env.coops().contains(&self.name) {
            return Err(CoopError::DuplicateName(self.name));
        }

        let parent = match &self.parent {
            Some(parent_name) => Some(
                env.coops()
                    .get(parent_name)
                    .ok_or_else(|| CoopError::ParentNotFound(parent_name.clone()))?,
            ),
            None => None,
        };

        let coop = CoopHandle::new(self.name.clone(), parent.clone(), Arc::downgrade(env), self.notifier);

        let mut built = Vec::with_capacity(self.agents.len());
        for pending in self.agents {
            match pending(env, &coop) {
                Ok(item) => built.push(item),
                Err(error) => {
                    roll_back(built, &parent, &self.name);
                    return Err(CoopError::RegistrationFailed(error.to_string()));
                }
            }
        }

        if !env.coops().insert(coop.clone()) {
            roll_back(built, &parent, &self.name);
            return Err(CoopError::DuplicateName(self.name));
        }

        for item in built {
            coop.register_agent(item.bound);
            item.activator.activate();
        }

        Ok(coop)
    }
}

fn roll_back(built: Vec<Built>, parent: &Option<CoopHandle>, name: &str) {
    for item in built {
        for (mailbox, type_index) in &item.bound.subscriptions {
            mailbox.unsubscribe(*type_index, item.bound.agent.id());
        }
        item.activator.cancel();
    }
    if let Some(parent) = parent {
        parent.remove_child(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentState, Handles, Reply};
    use crate::dispatcher::single_threaded_not_mt_safe;
    use crate::message::Message;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    enum Idle {
        #[default]
        Default,
    }
    impl AgentState for Idle {}

    #[derive(Debug, thiserror::Error)]
    #[error("test error")]
    struct TestError;

    #[derive(Debug, Clone)]
    struct Ping;
    impl Message for Ping {
        const MESSAGE_TYPE: &'static str = "ping";
    }

    struct Echo;

    #[async_trait::async_trait]
    impl Agent for Echo {
        type State = Idle;
        type Error = TestError;

        fn define(define: &mut Define<Self>) {
            let mailbox = define.direct_mailbox().expect("direct mailbox present").clone();
            define.on::<Ping>(Idle::Default, &mailbox, None, None);
        }
    }

    #[async_trait::async_trait]
    impl Handles<Ping> for Echo {
        async fn handle(&mut self, _message: Ping, _ctx: &AgentContext<Idle>) -> Result<Reply, TestError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_register_binds_and_activates_agent() {
        let env = crate::environment::Environment::new().expect("environment starts");
        let dispatcher: Arc<dyn Dispatcher> = Arc::new(single_threaded_not_mt_safe("disp"));
        let address = AgentAddress::named("echo-1");

        let coop = CoopBuilder::new("root")
            .agent(address, dispatcher, None, Echo)
            .register(&env)
            .expect("registration succeeds");

        assert_eq!(coop.name(), "root");
        assert!(env.coops().contains("root"));
    }

    #[tokio::test]
    async fn test_register_duplicate_name_rejected() {
        let env = crate::environment::Environment::new().expect("environment starts");
        let dispatcher: Arc<dyn Dispatcher> = Arc::new(single_threaded_not_mt_safe("disp"));

        CoopBuilder::new("root")
            .agent(AgentAddress::named("echo-1"), Arc::clone(&dispatcher), None, Echo)
            .register(&env)
            .expect("first registration succeeds");

        let result = CoopBuilder::new("root")
            .agent(AgentAddress::named("echo-2"), dispatcher, None, Echo)
            .register(&env);

        assert!(matches!(result, Err(CoopError::DuplicateName(_))));
    }

    #[tokio::test]
    async fn test_register_missing_parent_rejected() {
        let env = crate::environment::Environment::new().expect("environment starts");
        let dispatcher: Arc<dyn Dispatcher> = Arc::new(single_threaded_not_mt_safe("disp"));

        let result = CoopBuilder::new("child")
            .with_parent("nonexistent")
            .agent(AgentAddress::named("echo-1"), dispatcher, None, Echo)
            .register(&env);

        assert!(matches!(result, Err(CoopError::ParentNotFound(_))));
    }

    #[tokio::test]
    async fn test_register_rolls_back_on_bind_failure() {
        let env = crate::environment::Environment::new().expect("environment starts");
        let dispatcher = crate::dispatcher::single_threaded_not_mt_safe("disp");
        dispatcher.shutdown().await;
        let dispatcher: Arc<dyn Dispatcher> = Arc::new(dispatcher);

        let result = CoopBuilder::new("root")
            .agent(AgentAddress::named("echo-1"), Arc::clone(&dispatcher), None, Echo)
            .agent(AgentAddress::named("echo-2"), dispatcher, None, Echo)
            .register(&env);

        assert!(matches!(result, Err(CoopError::RegistrationFailed(_))));
        assert!(!env.coops().contains("root"));
    }
}
