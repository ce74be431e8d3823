//! A dedicated OS thread driving a single-threaded tokio runtime. Shared by
//! `one_thread`, `active_object`, and `active_group`, which differ only in
//! how many of these a dispatcher keeps and how agents are assigned to one.

// Layer 1: Standard library imports
use std::sync::mpsc as std_mpsc;
use std::thread::{Builder, JoinHandle};

// Layer 2: Third-party crate imports
use tokio::runtime::{Builder as RtBuilder, Handle};
use tokio::sync::oneshot;

// Layer 3: Internal module imports
use super::error::DispatcherError;

/// One dedicated thread + current-thread runtime. `block_on` on the
/// dedicated thread drives every task spawned onto `handle`, including ones
/// spawned from other threads — the dedicated thread never does anything
/// but poll this runtime's executor until shutdown is signalled.
pub(super) struct DedicatedRuntime {
    handle: Handle,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl DedicatedRuntime {
    /// Spawn the dedicated thread and build its runtime. Blocks the calling
    /// thread only long enough for the new thread to report its runtime
    /// handle back.
    pub(super) fn spawn(thread_name: impl Into<String>) -> Result<Self, DispatcherError> {
        let thread_name = thread_name.into();
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let join = Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                let built = RtBuilder::new_current_thread().enable_all().build();
                let rt = match built {
                    Ok(rt) => rt,
                    Err(error) => {
                        let _ = ready_tx.send(Err(error.to_string()));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(rt.handle().clone()));
                rt.block_on(async {
                    let _ = shutdown_rx.await;
                });
            })
            .map_err(|error| DispatcherError::StartupFailed(error.to_string()))?;

        let handle = ready_rx
            .recv()
            .map_err(|error| DispatcherError::StartupFailed(error.to_string()))?
            .map_err(DispatcherError::StartupFailed)?;

        Ok(Self {
            handle,
            shutdown_tx: Some(shutdown_tx),
            join: Some(join),
        })
    }

    pub(super) fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Signal the dedicated thread's `block_on` to return. Idempotent.
    pub(super) fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Join the dedicated thread. Only returns once `shutdown` has been
    /// called and every task on its runtime has finished.
    pub(super) fn join(&mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}
