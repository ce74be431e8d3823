//! Environment-facing timer API: wraps a [`TimerBackend`] trait object so
//! the environment itself stays agnostic to how delivery is actually
//! scheduled (spec §4.8).

// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::backend::{TimerBackend, TimerId, TokioTimerBackend};
use super::error::TimerError;
use crate::mailbox::MailboxHandle;
use crate::message::Envelope;
use crate::util::TypeIndex;

/// Environment-owned timer facility. One instance is shared by every
/// cooperation registered in the owning environment.
pub struct TimerService {
    backend: Arc<dyn TimerBackend>,
}

impl TimerService {
    /// Build a service backed by [`TokioTimerBackend`].
    pub fn new() -> Result<Self, TimerError> {
        Ok(Self::with_backend(Arc::new(TokioTimerBackend::new()?)))
    }

    /// Build a service backed by a caller-supplied backend. Exists mainly
    /// so tests can swap in a deterministic fake.
    pub fn with_backend(backend: Arc<dyn TimerBackend>) -> Self {
        Self { backend }
    }

    /// Schedule a one-shot delivery of `envelope` onto `target` after
    /// `delay`.
    pub fn single_timer(&self, type_index: TypeIndex, envelope: Envelope, target: MailboxHandle, delay: Duration) {
        self.backend.single_timer(type_index, envelope, target, delay);
    }

    /// Schedule a repeating delivery. The returned [`TimerId`] cancels the
    /// timer when dropped.
    pub fn schedule_timer(
        &self,
        type_index: TypeIndex,
        envelope: Envelope,
        target: MailboxHandle,
        delay: Duration,
        period: Duration,
    ) -> Result<TimerId, TimerError> {
        self.backend.schedule_timer(type_index, envelope, target, delay, period)
    }

    /// Shut down the backend. Called once during environment shutdown.
    pub fn shutdown(&self) {
        self.backend.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::{Mailbox, MailboxKind};
    use crate::message::Message;
    use crate::util::AgentId;

    #[derive(Debug, Clone)]
    struct Ping;
    impl Message for Ping {
        const MESSAGE_TYPE: &'static str = "ping";
    }

    #[tokio::test]
    async fn test_single_timer_delivers_through_service() {
        let service = TimerService::new().expect("timer service starts");
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let (queue, mut rx) = crate::queue::unbounded();
        mailbox.subscribe(TypeIndex::of::<Ping>(), AgentId::new(), None, None, queue).unwrap();

        service.single_timer(TypeIndex::of::<Ping>(), Envelope::immutable(Ping), mailbox, Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(rx.try_pop().is_some());
        service.shutdown();
    }

    #[tokio::test]
    async fn test_schedule_timer_rejects_mutable_message() {
        let service = TimerService::new().expect("timer service starts");
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let result = service.schedule_timer(
            TypeIndex::of::<Ping>(),
            Envelope::mutable(Ping),
            mailbox,
            Duration::from_millis(10),
            Duration::from_millis(10),
        );
        assert!(matches!(result, Err(TimerError::MutablePeriodicMsg)));
        service.shutdown();
    }
}
