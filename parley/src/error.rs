use thiserror::Error;

use crate::{Failure, Ticket};

/// The error returned when a successful response could not be decoded into the response type of
/// its [`Request`](crate::Request).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not decode response: {message}")]
pub struct DecodeError {
    message: String,
}

impl DecodeError {
    /// Construct a new decode error from any message.
    pub fn new(message: impl std::fmt::Display) -> Self {
        DecodeError {
            message: message.to_string(),
        }
    }

    /// The description of what went wrong.
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::new(err)
    }
}

/// An error surfaced by [`TryRun`](crate::TryRun), the variant of the interpreter which does not
/// swallow failures.
///
/// Only [`Rejected`](RunError::Rejected) allows the run to continue; every other variant means the
/// executor flow can no longer be trusted, and it is the last item of the stream.
///
/// Values removed by [`filter`](crate::RequestDsl::filter) or
/// [`from_option`](crate::RequestDsl::from_option) are never errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError<TxErr, RxErr> {
    /// The executor answered a submission with a non-success [`Answer`](crate::Answer).
    #[error("request {ticket} was not answered successfully: {failure}")]
    Rejected {
        /// The ticket of the rejected submission.
        ticket: Ticket,
        /// Why it was rejected.
        failure: Failure,
    },
    /// The executor flow refused a submission.
    #[error("executor flow failed to accept a submission")]
    Dispatch(#[source] TxErr),
    /// The executor flow failed while producing a reply.
    #[error("executor flow failed to produce a reply")]
    Collect(#[source] RxErr),
    /// The executor flow answered out of order.
    #[error("executor flow replied to {received} while {expected} was in flight")]
    Desynchronized {
        /// The ticket of the submission in flight.
        expected: Ticket,
        /// The ticket the executor replied to.
        received: Ticket,
    },
}

impl<TxErr, RxErr> RunError<TxErr, RxErr> {
    /// Whether the run continues after this error.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunError::Rejected { .. })
    }
}
