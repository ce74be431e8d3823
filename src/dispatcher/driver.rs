//! The driver loop every dispatcher kind spawns a bound agent onto. What
//! differs between dispatcher kinds is which [`tokio::runtime::Handle`] this
//! is spawned on and how many concurrent loops run per agent — not the loop
//! itself.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

// Layer 3: Internal module imports
use crate::agent::{DriveOutcome, ErasedAgent};

/// Spawn `concurrency` driver loops for `agent` onto `handle`, wrapped in
/// `run_start`/`run_finish` lifecycle calls that fire exactly once no matter
/// how many loops are running. `cooperative` yields after every demand, so a
/// shared pool thread round-robins fairly across agents instead of one
/// agent draining its whole queue before another gets a turn.
///
/// Returns a supervisory join handle that resolves once every loop has
/// exited and `run_finish` has completed — the unit a dispatcher's `wait()`
/// joins on.
pub(super) fn spawn_agent_loops(
    handle: &Handle,
    agent: Arc<dyn ErasedAgent>,
    concurrency: usize,
    cooperative: bool,
) -> JoinHandle<()> {
    let concurrency = concurrency.max(1);
    handle.spawn(async move {
        agent.run_start().await;

        let mut loops = Vec::with_capacity(concurrency);
        for _ in 0..concurrency {
            let agent = Arc::clone(&agent);
            loops.push(tokio::spawn(async move {
                loop {
                    match agent.drive_one().await {
                        DriveOutcome::QueueClosed => break,
                        DriveOutcome::Handled | DriveOutcome::Dropped => {
                            if cooperative {
                                tokio::task::yield_now().await;
                            }
                        }
                    }
                }
            }));
        }
        for join in loops {
            let _ = join.await;
        }

        agent.run_finish().await;
    })
}
