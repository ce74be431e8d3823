//! Synchronous-request bridge: lets ordinary (non-agent) callers send a
//! message and await a reply, without becoming an agent themselves (spec
//! §4.7). Grounded on the send/request split exposed by SObjectizer's
//! `so_5::send_functions` free functions.

pub mod error;

// Layer 1: Standard library imports
use std::future::Future;
use std::time::Duration;

// Layer 2: Third-party crate imports
use tokio::sync::oneshot;

// Layer 3: Internal module imports
pub use error::RequestError;
use crate::mailbox::MailboxHandle;
use crate::message::{Envelope, Message, Signal};
use crate::util::TypeIndex;

/// Fire-and-forget delivery of an immutable message.
pub fn send<M: Message + Send + Sync>(mailbox: &MailboxHandle, message: M) -> Result<(), RequestError> {
    let type_index = TypeIndex::of::<M>();
    mailbox
        .deliver_message(type_index, Envelope::immutable(message), crate::message::Mutability::Immutable)
        .map_err(RequestError::from)
}

/// Fire-and-forget delivery of a uniquely-owned (mutable) message.
pub fn send_mut<M: Message>(mailbox: &MailboxHandle, message: M) -> Result<(), RequestError> {
    let type_index = TypeIndex::of::<M>();
    mailbox
        .deliver_message(type_index, Envelope::mutable(message), crate::message::Mutability::Mutable)
        .map_err(RequestError::from)
}

/// Fire-and-forget delivery of a payload-less signal.
pub fn send_signal<S: Signal>(mailbox: &MailboxHandle) -> Result<(), RequestError> {
    mailbox.deliver_signal::<S>().map_err(RequestError::from)
}

/// Send a synchronous request and return a future that resolves once a
/// subscribed handler replies. Fails synchronously (before returning a
/// future at all) if zero or more than one handler is subscribed — spec
/// §4.7 "NoSvcHandlers is raised synchronously at send time, never as a
/// future failure".
pub fn request_future<M, R>(
    mailbox: &MailboxHandle,
    message: M,
) -> Result<impl Future<Output = Result<R, RequestError>> + Send, RequestError>
where
    M: Message + Send + Sync,
    R: Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let type_index = TypeIndex::of::<M>();
    mailbox.deliver_request(type_index, Envelope::immutable(message), tx)?;

    Ok(async move {
        let reply = rx.await?;
        match reply {
            Ok(Some(value)) => error::downcast_reply::<R>(value),
            Ok(None) => Err(RequestError::NoReplyValue),
            Err(handler_error) => Err(RequestError::HandlerError(handler_error)),
        }
    })
}

/// [`request_future`], bounded by `timeout`. Resolves
/// [`RequestError::ServiceRequestTimeout`] if the handler hasn't replied in
/// time — the request itself is not cancelled, only the wait.
pub async fn request_value<M, R>(mailbox: &MailboxHandle, timeout: Duration, message: M) -> Result<R, RequestError>
where
    M: Message + Send + Sync,
    R: Send + 'static,
{
    let future = request_future::<M, R>(mailbox, message)?;
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_elapsed) => Err(RequestError::ServiceRequestTimeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::{Mailbox, MailboxKind};
    use crate::queue::Demand;
    use crate::util::AgentId;

    #[derive(Debug, Clone)]
    struct Ping;
    impl Message for Ping {
        const MESSAGE_TYPE: &'static str = "ping";
    }

    #[derive(Debug, Clone, Copy)]
    struct Shutdown;
    impl Signal for Shutdown {
        const SIGNAL_TYPE: &'static str = "shutdown";
    }

    #[test]
    fn test_send_delivers_to_subscriber() {
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let (queue, mut rx) = crate::queue::unbounded();
        mailbox.subscribe(TypeIndex::of::<Ping>(), AgentId::new(), None, None, queue).unwrap();
        send(&mailbox, Ping).unwrap();
        assert!(rx.try_pop().is_some());
    }

    #[test]
    fn test_send_signal_delivers_to_subscriber() {
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let (queue, mut rx) = crate::queue::unbounded();
        mailbox.subscribe(TypeIndex::of::<Shutdown>(), AgentId::new(), None, None, queue).unwrap();
        send_signal::<Shutdown>(&mailbox).unwrap();
        assert!(rx.try_pop().is_some());
    }

    #[test]
    fn test_request_future_fails_synchronously_with_no_handlers() {
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let result = request_future::<Ping, ()>(&mailbox, Ping);
        assert!(matches!(result, Err(RequestError::Mailbox(crate::mailbox::MailboxError::NoSvcHandlers { .. }))));
    }

    #[tokio::test]
    async fn test_request_future_resolves_handler_reply() {
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let (queue, mut rx) = crate::queue::unbounded();
        mailbox.subscribe(TypeIndex::of::<Ping>(), AgentId::new(), None, None, queue).unwrap();

        let future = request_future::<Ping, u32>(&mailbox, Ping).unwrap();

        let demand = rx.pop().await.expect("demand enqueued");
        let (_envelope, reply) = demand.into_parts();
        reply.unwrap().send(Ok(Some(Box::new(42u32)))).unwrap();

        assert_eq!(future.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_request_future_mismatched_type_errors() {
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let (queue, mut rx) = crate::queue::unbounded();
        mailbox.subscribe(TypeIndex::of::<Ping>(), AgentId::new(), None, None, queue).unwrap();

        let future = request_future::<Ping, u32>(&mailbox, Ping).unwrap();
        let demand = rx.pop().await.expect("demand enqueued");
        let (_envelope, reply) = demand.into_parts();
        reply.unwrap().send(Ok(Some(Box::new("not a number".to_string())))).unwrap();

        assert!(matches!(future.await, Err(RequestError::ResponseTypeMismatch)));
    }

    #[tokio::test]
    async fn test_request_value_times_out() {
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let (queue, _rx) = crate::queue::unbounded();
        mailbox.subscribe(TypeIndex::of::<Ping>(), AgentId::new(), None, None, queue).unwrap();

        let result = request_value::<Ping, ()>(&mailbox, Duration::from_millis(20), Ping).await;
        assert!(matches!(result, Err(RequestError::ServiceRequestTimeout)));
    }

    #[tokio::test]
    async fn test_request_future_handler_dropped_reply() {
        let mailbox = Mailbox::new(MailboxKind::Mpmc);
        let (queue, mut rx) = crate::queue::unbounded();
        mailbox.subscribe(TypeIndex::of::<Ping>(), AgentId::new(), None, None, queue).unwrap();

        let future = request_future::<Ping, u32>(&mailbox, Ping).unwrap();
        let demand: Demand = rx.pop().await.expect("demand enqueued");
        drop(demand);

        assert!(matches!(future.await, Err(RequestError::HandlerDropped)));
    }
}
