//! Per-agent event queue: a FIFO of [`Demand`]s pushed by mailboxes on the
//! sender's thread and popped by the agent's bound dispatcher.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;
use tokio::sync::mpsc;

// Layer 3: Internal module imports
pub mod demand;

pub use demand::{Demand, HandlerReply, ReplySender};

/// Outcome of a non-blocking pop attempt, distinguishing "nothing ready
/// yet" from "every sender has been dropped" — `try_pop` alone can't tell
/// these apart, which a polling dispatcher needs to know to retire an
/// agent only once its queue is genuinely closed.
pub enum TryPopOutcome {
    /// A demand was ready and has been removed from the queue.
    Ready(Demand),
    /// The queue is empty but at least one sender is still live.
    Empty,
    /// The queue is empty and every sender has been dropped.
    Closed,
}

/// Raised when a bounded event queue is full at push time. Sending thread
/// never blocks; delivery fails synchronously instead.
#[derive(Debug, Error)]
#[error("event queue delivery overflow")]
pub struct MsgDeliveryOverflow;

enum Sender {
    Bounded(mpsc::Sender<Demand>),
    Unbounded(mpsc::UnboundedSender<Demand>),
}

/// The producer half, held by a mailbox subscription entry. Cheap to clone.
#[derive(Clone)]
pub struct EventQueueSender {
    inner: std::sync::Arc<Sender>,
}

impl EventQueueSender {
    /// Push a demand without blocking. Fails and hands the demand back
    /// (so a caller bridging a synchronous request can still resolve its
    /// reply channel with an error) only for a bounded queue that is
    /// already full, or a receiver that has been dropped.
    pub fn push(&self, demand: Demand) -> Result<(), Demand> {
        match &*self.inner {
            Sender::Bounded(tx) => tx.try_send(demand).map_err(|e| match e {
                mpsc::error::TrySendError::Full(d) => d,
                mpsc::error::TrySendError::Closed(d) => d,
            }),
            Sender::Unbounded(tx) => tx.send(demand).map_err(|e| e.0),
        }
    }
}

/// The consumer half, owned by the agent's bound dispatcher worker.
pub enum EventQueueReceiver {
    /// Bounded queue variant.
    Bounded(mpsc::Receiver<Demand>),
    /// Unbounded queue variant.
    Unbounded(mpsc::UnboundedReceiver<Demand>),
}

impl EventQueueReceiver {
    /// Asynchronously await the next demand, used by threaded dispatchers.
    pub async fn pop(&mut self) -> Option<Demand> {
        match self {
            Self::Bounded(rx) => rx.recv().await,
            Self::Unbounded(rx) => rx.recv().await,
        }
    }

    /// Non-blocking pop, used by tests that just need to observe whether a
    /// delivery landed.
    pub fn try_pop(&mut self) -> Option<Demand> {
        match self {
            Self::Bounded(rx) => rx.try_recv().ok(),
            Self::Unbounded(rx) => rx.try_recv().ok(),
        }
    }

    /// Non-blocking pop that distinguishes an empty-but-open queue from a
    /// closed one, used by the cooperative single-threaded dispatcher to
    /// poll every bound agent in turn without an executor per agent.
    pub fn try_pop_detailed(&mut self) -> TryPopOutcome {
        let result = match self {
            Self::Bounded(rx) => rx.try_recv(),
            Self::Unbounded(rx) => rx.try_recv(),
        };
        match result {
            Ok(demand) => TryPopOutcome::Ready(demand),
            Err(mpsc::error::TryRecvError::Empty) => TryPopOutcome::Empty,
            Err(mpsc::error::TryRecvError::Disconnected) => TryPopOutcome::Closed,
        }
    }
}

/// Build an unbounded event queue (default: spec allows either).
pub fn unbounded() -> (EventQueueSender, EventQueueReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        EventQueueSender {
            inner: std::sync::Arc::new(Sender::Unbounded(tx)),
        },
        EventQueueReceiver::Unbounded(rx),
    )
}

/// Build a bounded event queue with the given capacity.
pub fn bounded(capacity: usize) -> (EventQueueSender, EventQueueReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        EventQueueSender {
            inner: std::sync::Arc::new(Sender::Bounded(tx)),
        },
        EventQueueReceiver::Bounded(rx),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Envelope, Message};
    use crate::util::TypeIndex;

    #[derive(Debug, Clone)]
    struct Ping;

    impl Message for Ping {
        const MESSAGE_TYPE: &'static str = "ping";
    }

    fn demand() -> Demand {
        Demand::new(
            crate::util::MailboxId::new(),
            TypeIndex::of::<Ping>(),
            Envelope::immutable(Ping),
            None,
        )
    }

    #[tokio::test]
    async fn test_unbounded_push_and_pop() {
        let (tx, mut rx) = unbounded();
        tx.push(demand()).unwrap();
        let popped = rx.pop().await;
        assert!(popped.is_some());
    }

    #[tokio::test]
    async fn test_bounded_overflow() {
        let (tx, _rx) = bounded(1);
        tx.push(demand()).unwrap();
        assert!(tx.push(demand()).is_err());
    }

    #[test]
    fn test_bounded_try_pop_empty() {
        let (_tx, mut rx) = bounded(1);
        assert!(rx.try_pop().is_none());
    }
}
