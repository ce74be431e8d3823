//! End-to-end scenario: a non-classical, 5-seat dining philosophers run.
//! Safety (a fork is never held by two philosophers at once) is enforced
//! structurally by routing every acquire/release through one serializing
//! agent; this test checks the progress property — every philosopher eats
//! at least once — over a bounded number of rounds rather than a literal
//! 20-second wall-clock run (spec §8 scenario 2 permits this simplification).

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal module imports
use agentrt::dispatcher::one_thread;
use agentrt::prelude::*;
use agentrt::request::request_value;

const SEATS: usize = 5;
const ROUNDS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
enum Ready {
    #[default]
    Ready,
}
impl AgentState for Ready {}

#[derive(Debug, thiserror::Error)]
#[error("fork pool error")]
struct ForkPoolError;

#[derive(Debug, Clone, Copy)]
struct AcquireFork {
    fork: usize,
}
impl Message for AcquireFork {
    const MESSAGE_TYPE: &'static str = "acquire-fork";
}

#[derive(Debug, Clone, Copy)]
struct ReleaseFork {
    fork: usize,
}
impl Message for ReleaseFork {
    const MESSAGE_TYPE: &'static str = "release-fork";
}

/// Owns every fork's held/free state behind one agent, so a grant can never
/// race with another grant: `Handles` serializes all calls to this agent.
/// Subscribes on a named (rather than its own private direct) mailbox so
/// the philosopher tasks below can address it directly.
struct ForkPool {
    held: [bool; SEATS],
}

#[async_trait]
impl Agent for ForkPool {
    type State = Ready;
    type Error = ForkPoolError;

    fn define(define: &mut Define<Self>) {
        let env = define.environment().expect("environment present").clone();
        let mailbox = env.mailbox("fork-pool");
        define.on::<AcquireFork>(Ready::Ready, &mailbox, None, None);
        define.on::<ReleaseFork>(Ready::Ready, &mailbox, None, None);
    }
}

#[async_trait]
impl Handles<AcquireFork> for ForkPool {
    async fn handle(&mut self, message: AcquireFork, _ctx: &AgentContext<Ready>) -> Result<Reply, ForkPoolError> {
        let granted = !self.held[message.fork];
        if granted {
            self.held[message.fork] = true;
        }
        Ok(Some(Box::new(granted)))
    }
}

#[async_trait]
impl Handles<ReleaseFork> for ForkPool {
    async fn handle(&mut self, message: ReleaseFork, _ctx: &AgentContext<Ready>) -> Result<Reply, ForkPoolError> {
        assert!(self.held[message.fork], "releasing a fork that was never granted");
        self.held[message.fork] = false;
        Ok(None)
    }
}

#[tokio::test]
async fn every_philosopher_eats_at_least_once() {
    let env = Environment::new().expect("environment starts");
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(one_thread("fork-pool").expect("dispatcher spawns"));

    let coop = CoopBuilder::new("dining")
        .agent(AgentAddress::named("fork-pool"), Arc::clone(&dispatcher), None, ForkPool { held: [false; SEATS] })
        .register(&env)
        .expect("registration succeeds");

    let forks = env.mailbox("fork-pool");
    let meals = Arc::new((0..SEATS).map(|_| AtomicUsize::new(0)).collect::<Vec<_>>());

    let mut tasks = Vec::with_capacity(SEATS);
    for seat in 0..SEATS {
        let forks = Arc::clone(&forks);
        let meals = Arc::clone(&meals);
        tasks.push(tokio::spawn(async move {
            let left = seat;
            let right = (seat + 1) % SEATS;
            for _ in 0..ROUNDS {
                let got_left: bool = request_value(&forks, Duration::from_millis(50), AcquireFork { fork: left })
                    .await
                    .expect("acquire-left replies");
                if !got_left {
                    tokio::task::yield_now().await;
                    continue;
                }
                let got_right: bool = request_value(&forks, Duration::from_millis(50), AcquireFork { fork: right })
                    .await
                    .expect("acquire-right replies");
                if !got_right {
                    let _: Option<()> = request_value(&forks, Duration::from_millis(50), ReleaseFork { fork: left }).await.ok();
                    tokio::task::yield_now().await;
                    continue;
                }

                meals[seat].fetch_add(1, Ordering::SeqCst);

                let _: Option<()> = request_value(&forks, Duration::from_millis(50), ReleaseFork { fork: left }).await.ok();
                let _: Option<()> = request_value(&forks, Duration::from_millis(50), ReleaseFork { fork: right }).await.ok();
                tokio::task::yield_now().await;
            }
        }));
    }

    for task in tasks {
        task.await.expect("philosopher task doesn't panic");
    }

    for (seat, count) in meals.iter().enumerate() {
        assert!(count.load(Ordering::SeqCst) >= 1, "seat {seat} never ate");
    }

    coop.deregister(agentrt::coop::DeregisterReason::Requested).await;
    dispatcher.shutdown().await;
    dispatcher.wait().await;
}
