//! The pluggable timer backend contract, plus the tokio-backed default
//! implementation. Grounded on the dedicated-thread pattern used by
//! `crate::dispatcher::runtime_pool::DedicatedRuntime`: a timer must keep
//! firing independently of whatever dispatcher threads are doing, so it
//! gets its own small runtime rather than borrowing one.

// Layer 1: Standard library imports
use std::fmt;
use std::sync::mpsc as std_mpsc;
use std::sync::Mutex;
use std::thread::{Builder, JoinHandle as ThreadJoinHandle};
use std::time::Duration;

// Layer 2: Third-party crate imports
use tokio::runtime::{Builder as RtBuilder, Handle};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

// Layer 3: Internal module imports
use super::error::TimerError;
use crate::mailbox::MailboxHandle;
use crate::message::{Envelope, Mutability};
use crate::util::TypeIndex;

/// A cancellable, scheduled periodic timer. Dropping it aborts the
/// underlying delivery task, per spec §4.8 "dropping the returned timer_id
/// cancels a periodic timer".
pub struct TimerId(Option<JoinHandle<()>>);

impl fmt::Debug for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerId").field("active", &self.0.is_some()).finish()
    }
}

impl Drop for TimerId {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

/// What the timer service asks a backend to do: deliver one envelope onto
/// `target` after `delay`, optionally repeating every `period` thereafter.
/// The core only assumes this contract; it never inspects how a backend
/// tracks due times internally.
pub trait TimerBackend: Send + Sync {
    /// Schedule a one-shot delivery. Fire-and-forget: failures are logged,
    /// never surfaced to the caller (there is nothing for the caller to do
    /// differently at schedule time for a delivery that hasn't happened
    /// yet).
    fn single_timer(&self, type_index: TypeIndex, envelope: Envelope, target: MailboxHandle, delay: Duration);

    /// Schedule a repeating delivery. Rejects a mutable envelope eagerly,
    /// since every tick after the first would need to clone a uniquely-owned
    /// payload.
    fn schedule_timer(
        &self,
        type_index: TypeIndex,
        envelope: Envelope,
        target: MailboxHandle,
        delay: Duration,
        period: Duration,
    ) -> Result<TimerId, TimerError>;

    /// Stop accepting new timers and let outstanding ones finish naturally;
    /// does not forcibly cancel in-flight single-shot deliveries.
    fn shutdown(&self);
}

struct DedicatedTimerRuntime {
    handle: Handle,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: Option<ThreadJoinHandle<()>>,
}

impl DedicatedTimerRuntime {
    fn spawn() -> Result<Self, TimerError> {
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let join = Builder::new()
            .name("agentrt-timer".to_string())
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
            .map_err(|error| TimerError::StartupFailed(error.to_string()))?;

        let handle = ready_rx
            .recv()
            .map_err(|error| TimerError::StartupFailed(error.to_string()))?
            .map_err(TimerError::StartupFailed)?;

        Ok(Self {
            handle,
            shutdown_tx: Some(shutdown_tx),
            join: Some(join),
        })
    }
}

/// Default [`TimerBackend`]: a single dedicated thread running a
/// current-thread tokio runtime, onto which every scheduled delivery is
/// spawned as a task.
pub struct TokioTimerBackend {
    runtime: Mutex<DedicatedTimerRuntime>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TokioTimerBackend {
    /// Spawn the dedicated timer thread.
    pub fn new() -> Result<Self, TimerError> {
        Ok(Self {
            runtime: Mutex::new(DedicatedTimerRuntime::spawn()?),
            tasks: Mutex::new(Vec::new()),
        })
    }

    fn handle(&self) -> Handle {
        self.runtime.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).handle.clone()
    }
}

async fn deliver_once(type_index: TypeIndex, envelope: Envelope, target: MailboxHandle) {
    if let Err(error) = target.deliver_message(type_index, envelope, Mutability::Immutable) {
        tracing::debug!(error = %error, type_name = type_index.type_name(), "timer delivery failed");
    }
}

async fn periodic_loop(type_index: TypeIndex, base: Envelope, target: MailboxHandle, delay: Duration, period: Duration) {
    tokio::time::sleep(delay).await;
    loop {
        let Some(envelope) = base.try_share() else {
            tracing::error!(type_name = type_index.type_name(), "periodic timer envelope is not shareable, stopping");
            break;
        };
        deliver_once(type_index, envelope, target.clone()).await;
        tokio::time::sleep(period).await;
    }
}

impl TimerBackend for TokioTimerBackend {
    fn single_timer(&self, type_index: TypeIndex, envelope: Envelope, target: MailboxHandle, delay: Duration) {
        let handle = self.handle();
        let join = handle.spawn(async move {
            tokio::time::sleep(delay).await;
            deliver_once(type_index, envelope, target).await;
        });
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(join);
    }

    fn schedule_timer(
        &self,
        type_index: TypeIndex,
        envelope: Envelope,
        target: MailboxHandle,
        delay: Duration,
        period: Duration,
    ) -> Result<TimerId, TimerError> {
        if envelope.mutability() == Mutability::Mutable {
            return Err(TimerError::MutablePeriodicMsg);
        }
        let handle = self.handle();
        let join = handle.spawn(periodic_loop(type_index, envelope, target, delay, period));
        Ok(TimerId(Some(join)))
    }

    fn shutdown(&self) {
        let mut guard = self.runtime.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(tx) = guard.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(join) = guard.join.take() {
            let _ = join.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::{Mailbox, MailboxKind};
    use crate::message::Message;
    use crate::util::AgentId;

    #[derive(Debug, Clone)]
    struct Tick;
    impl Message for Tick {
        const MESSAGE_TYPE: &'static str = "tick";
    }

    #[tokio::test]
    async fn test_single_timer_delivers_after_delay() {
        let backend = TokioTimerBackend::new().expect("timer backend starts");
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let (queue, mut rx) = crate::queue::unbounded();
        mailbox.subscribe(TypeIndex::of::<Tick>(), AgentId::new(), None, None, queue).unwrap();

        backend.single_timer(TypeIndex::of::<Tick>(), Envelope::immutable(Tick), mailbox, Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_pop().is_some());
        backend.shutdown();
    }

    #[tokio::test]
    async fn test_schedule_timer_rejects_mutable_payload() {
        #[derive(Debug)]
        struct Job;
        impl Message for Job {
            const MESSAGE_TYPE: &'static str = "job";
        }

        let backend = TokioTimerBackend::new().expect("timer backend starts");
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let result = backend.schedule_timer(
            TypeIndex::of::<Job>(),
            Envelope::mutable(Job),
            mailbox,
            Duration::from_millis(10),
            Duration::from_millis(10),
        );
        assert!(matches!(result, Err(TimerError::MutablePeriodicMsg)));
        backend.shutdown();
    }

    #[tokio::test]
    async fn test_schedule_timer_repeats_and_cancels() {
        let backend = TokioTimerBackend::new().expect("timer backend starts");
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let (queue, mut rx) = crate::queue::unbounded();
        mailbox.subscribe(TypeIndex::of::<Tick>(), AgentId::new(), None, None, queue).unwrap();

        let timer_id = backend
            .schedule_timer(
                TypeIndex::of::<Tick>(),
                Envelope::immutable(Tick),
                mailbox,
                Duration::from_millis(5),
                Duration::from_millis(15),
            )
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(timer_id);
        let count_before = std::iter::from_fn(|| rx.try_pop()).count();
        assert!(count_before >= 1);

        tokio::time::sleep(Duration::from_millis(60)).await;
        let count_after = std::iter::from_fn(|| rx.try_pop()).count();
        assert_eq!(count_after, 0, "cancelled timer must not keep delivering");
        backend.shutdown();
    }
}
