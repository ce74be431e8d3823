//! Errors surfaced by the synchronous-request bridge (spec §4.7).

// Layer 1: Standard library imports
use std::any::Any;

// Layer 2: Third-party crate imports
use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

// Layer 3: Internal module imports
use crate::mailbox::MailboxError;

/// Errors raised by [`crate::request::request_future`] and
/// [`crate::request::request_value`].
#[derive(Debug, Error)]
pub enum RequestError {
    /// The request failed synchronously at send time: no handler, or more
    /// than one, was subscribed for the request's type.
    #[error(transparent)]
    Mailbox(#[from] MailboxError),

    /// The request was not answered within the caller-supplied timeout.
    #[error("service request timed out")]
    ServiceRequestTimeout,

    /// The handling agent was dropped (or its reply channel closed) before
    /// it answered.
    #[error("handler was dropped before replying")]
    HandlerDropped,

    /// The handler ran to completion but chose not to produce a reply
    /// value.
    #[error("handler completed without producing a reply value")]
    NoReplyValue,

    /// The handler's reply value was not of the type the caller expected.
    #[error("reply value did not downcast to the expected type")]
    ResponseTypeMismatch,

    /// The handler ran and returned an error.
    #[error("handler returned an error: {0}")]
    HandlerError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<RecvError> for RequestError {
    fn from(_: RecvError) -> Self {
        Self::HandlerDropped
    }
}

pub(super) fn downcast_reply<R: Any>(value: Box<dyn Any + Send>) -> Result<R, RequestError> {
    value.downcast::<R>().map(|boxed| *boxed).map_err(|_| RequestError::ResponseTypeMismatch)
}
