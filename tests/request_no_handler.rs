//! End-to-end scenario: a synchronous request against a mailbox with zero
//! subscribers fails synchronously with `NoSvcHandlers`, and the
//! environment keeps working afterward.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal module imports
use agentrt::dispatcher::single_threaded_not_mt_safe;
use agentrt::prelude::*;
use agentrt::request::request_future;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
enum Ready {
    #[default]
    Ready,
}
impl AgentState for Ready {}

#[derive(Debug, thiserror::Error)]
#[error("echo error")]
struct EchoError;

#[derive(Debug, Clone, Copy)]
struct Probe;
impl Message for Probe {
    const MESSAGE_TYPE: &'static str = "probe";
}

struct Echo;

#[async_trait]
impl Agent for Echo {
    type State = Ready;
    type Error = EchoError;

    fn define(_define: &mut Define<Self>) {}
}

#[tokio::test]
async fn no_subscriber_fails_synchronously_and_environment_keeps_working() {
    let env = Environment::new().expect("environment starts");
    let mailbox = env.mailbox("nobody-home");

    let result = request_future::<Probe, String>(&mailbox, Probe);
    assert!(matches!(result, Err(RequestError::Mailbox(MailboxError::NoSvcHandlers { .. }))));

    // The failed request didn't poison anything: a fresh cooperation still
    // registers and tears down cleanly afterward.
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(single_threaded_not_mt_safe("after"));
    let coop = CoopBuilder::new("after-failure")
        .agent(AgentAddress::named("echo"), Arc::clone(&dispatcher), None, Echo)
        .register(&env)
        .expect("registration still succeeds after the earlier request failure");

    coop.deregister(DeregisterReason::Requested).await;
    dispatcher.shutdown().await;
    dispatcher.wait().await;
}
