//! End-to-end scenario: a cap-1 `drop` limit on one message type. A burst of
//! 3 sends while the dispatcher is deliberately left undriven resolves the
//! limiter synchronously at each send, so the outcome (1 admitted, 2
//! dropped) is fixed before any handler ever runs — no timing race.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal module imports
use agentrt::dispatcher::{single_threaded_not_mt_safe, SingleThreadedDispatcher};
use agentrt::prelude::*;
use agentrt::request::send;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
enum Ready {
    #[default]
    Ready,
}
impl AgentState for Ready {}

#[derive(Debug, thiserror::Error)]
#[error("limited agent error")]
struct LimitedError;

#[derive(Debug, Clone, Copy)]
struct X;
impl Message for X {
    const MESSAGE_TYPE: &'static str = "x";
}

struct LimitedAgent {
    handled: Arc<AtomicU64>,
}

#[async_trait]
impl Agent for LimitedAgent {
    type State = Ready;
    type Error = LimitedError;

    fn define(define: &mut Define<Self>) {
        let env = define.environment().expect("environment present").clone();
        let mailbox = env.mailbox("x-mailbox");
        let limiter = Arc::new(MessageLimiter::new(1, LimitReaction::Drop));
        define.on::<X>(Ready::Ready, &mailbox, None, Some(limiter));
    }
}

#[async_trait]
impl Handles<X> for LimitedAgent {
    async fn handle(&mut self, _message: X, _ctx: &AgentContext<Ready>) -> Result<Reply, LimitedError> {
        self.handled.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

#[tokio::test]
async fn burst_of_three_admits_exactly_one() {
    let env = Environment::new().expect("environment starts");
    let dispatcher = Arc::new(single_threaded_not_mt_safe("limiter"));
    let dispatcher_erased: Arc<dyn Dispatcher> = Arc::clone(&dispatcher) as Arc<dyn Dispatcher>;

    let handled = Arc::new(AtomicU64::new(0));

    let coop = CoopBuilder::new("limit-drop")
        .agent(
            AgentAddress::named("limited"),
            dispatcher_erased,
            None,
            LimitedAgent { handled: Arc::clone(&handled) },
        )
        .register(&env)
        .expect("registration succeeds");

    let mailbox = env.mailbox("x-mailbox");
    for _ in 0..3 {
        send(&mailbox, X).expect("send never fails synchronously here");
    }

    // Resolved entirely at send time: nothing has been dequeued yet.
    assert_eq!(mailbox.metrics().dropped(), 2);
    assert_eq!(handled.load(Ordering::SeqCst), 0);

    let drained: Arc<SingleThreadedDispatcher> = Arc::clone(&dispatcher);
    let driver = tokio::spawn(async move { drained.run_until_drained().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    dispatcher.shutdown().await;
    driver.await.expect("drain loop doesn't panic");

    assert_eq!(handled.load(Ordering::SeqCst), 1);
    assert_eq!(mailbox.metrics().dropped(), 2);

    coop.deregister(DeregisterReason::Requested).await;
    dispatcher.wait().await;
}
