//! A "loopback" executor for the [`parley`] crate, which answers every request synchronously by
//! calling a function, without leaving the current task.
//!
//! This executor is useful primarily for testing and benchmarking, as it does the absolute minimum
//! amount of work, so that it is easier to isolate the behavior of the interpreter itself. It also
//! keeps a journal of every route it was asked to serve, so tests can check exactly which requests
//! a program submitted, and in what order.

#![allow(clippy::type_complexity)]
#![warn(missing_docs)]
#![warn(missing_copy_implementations, missing_debug_implementations)]
#![warn(unused_qualifications, unused_results)]
#![warn(future_incompatible)]
#![warn(unused)]
// Documentation configuration
#![forbid(rustdoc::broken_intra_doc_links)]

use parley::{Collector, Dispatcher, Executor, Failure, RawResponse, Reply, Route, Submission};
use std::{
    collections::VecDeque,
    fmt,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    task::{Context, Poll},
};
use thiserror::Error;

/// The function a [`Loopback`] answers requests with.
///
/// Returning `Err` means the request never reached the service, like a request dropped by a rate
/// limiter.
pub type Responder = Arc<dyn Fn(&Submission) -> Result<RawResponse, Failure> + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An [`Executor`] answering every request by calling a [`Responder`].
///
/// Cloning a `Loopback` shares its journal.
///
/// # Examples
///
/// ```
/// use parley_loopback::Loopback;
/// use parley::RawResponse;
///
/// let executor = Loopback::new(|submission| Ok(RawResponse::ok(submission.route().uri().to_owned())));
/// assert!(executor.journal().is_empty());
/// ```
#[derive(Clone)]
pub struct Loopback {
    responder: Responder,
    journal: Arc<Mutex<Vec<Route>>>,
}

impl Loopback {
    /// An executor answering each request with whatever `responder` returns for it.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&Submission) -> Result<RawResponse, Failure> + Send + Sync + 'static,
    {
        Loopback {
            responder: Arc::new(responder),
            journal: Arc::default(),
        }
    }

    /// An executor answering each request with `200 OK` and the body that request was sent with.
    pub fn echo() -> Self {
        Loopback::new(|submission| Ok(RawResponse::ok(submission.body().to_bytes())))
    }

    /// Every route submitted through this executor (and its clones) so far, in order.
    pub fn journal(&self) -> Vec<Route> {
        lock(&self.journal).clone()
    }

    /// How many requests have been submitted through this executor (and its clones) so far.
    pub fn submitted(&self) -> usize {
        lock(&self.journal).len()
    }

    /// Forget every route recorded so far.
    pub fn clear_journal(&self) {
        lock(&self.journal).clear();
    }

    /// Open a new flow.
    pub fn channel(&self) -> (Sender, Receiver) {
        let replies = Arc::new(Mutex::new(VecDeque::new()));
        (
            Sender {
                responder: self.responder.clone(),
                journal: self.journal.clone(),
                replies: replies.clone(),
                closed: false,
            },
            Receiver { replies },
        )
    }
}

impl Default for Loopback {
    fn default() -> Self {
        Loopback::echo()
    }
}

impl fmt::Debug for Loopback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loopback")
            .field("journal", &*lock(&self.journal))
            .finish_non_exhaustive()
    }
}

impl Executor for Loopback {
    type Tx = Sender;
    type Rx = Receiver;

    fn flow(&self) -> (Sender, Receiver) {
        self.channel()
    }
}

/// An error thrown while dispatching to or collecting from a loopback flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Error {
    /// A submission was dispatched after the [`Sender`] was closed.
    #[error("submission dispatched to a closed loopback flow")]
    Closed,
    /// A reply was requested, but every submission has already been answered.
    #[error("no submission is waiting for a reply")]
    NothingPending,
}

/// The dispatching half of a loopback flow: answers each submission as soon as it is dispatched.
pub struct Sender {
    responder: Responder,
    journal: Arc<Mutex<Vec<Route>>>,
    replies: Arc<Mutex<VecDeque<Reply>>>,
    closed: bool,
}

impl fmt::Debug for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

/// The collecting half of a loopback flow.
#[derive(Debug)]
pub struct Receiver {
    replies: Arc<Mutex<VecDeque<Reply>>>,
}

impl Dispatcher for Sender {
    type Error = Error;

    fn poll_ready(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(if self.closed {
            Err(Error::Closed)
        } else {
            Ok(())
        })
    }

    fn start_dispatch(self: Pin<&mut Self>, submission: Submission) -> Result<(), Self::Error> {
        if self.closed {
            return Err(Error::Closed);
        }
        lock(&self.journal).push(submission.route());
        let reply = match (self.responder)(&submission) {
            Ok(response) => submission.reply(response),
            Err(failure) => submission.fail(failure),
        };
        lock(&self.replies).push_back(reply);
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(mut self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.closed = true;
        Poll::Ready(Ok(()))
    }
}

impl Collector for Receiver {
    type Error = Error;

    fn poll_reply(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<Reply, Self::Error>> {
        Poll::Ready(lock(&self.replies).pop_front().ok_or(Error::NothingPending))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use parley::{
        executor::{CollectorExt, DispatcherExt},
        Answer, Body, DecodeError, Payload, Request, RequestExt, Ticket,
    };

    #[derive(Debug)]
    struct Post(&'static str);

    impl Request for Post {
        type Response = String;

        fn route(&self) -> Route {
            Route::post("https://example.com/echo")
        }

        fn body(&self) -> Body {
            Body::Form(self.0.to_owned())
        }

        fn decode(&self, response: &RawResponse) -> Result<Option<String>, DecodeError> {
            Ok(Some(response.text()))
        }
    }

    fn submission(ticket: u64, body: &'static str) -> Submission {
        Submission::new(
            Ticket(ticket),
            Arc::new(Post(body).map_response(Payload::new)),
        )
    }

    #[test]
    fn echo_replies_in_order() {
        let executor = Loopback::echo();
        let (mut tx, mut rx) = executor.channel();
        block_on(async {
            tx.dispatch(submission(0, "a")).await.unwrap();
            tx.dispatch(submission(1, "b")).await.unwrap();
            for (ticket, body) in [(0, "a"), (1, "b")] {
                let reply = rx.reply().await.unwrap();
                assert_eq!(reply.ticket, Ticket(ticket));
                match reply.answer {
                    Answer::Success(payload) => {
                        assert_eq!(payload.downcast::<String>().unwrap(), body)
                    }
                    other => panic!("unexpected answer: {:?}", other),
                }
            }
            assert_eq!(rx.reply().await.unwrap_err(), Error::NothingPending);
        });
        assert_eq!(executor.submitted(), 2);
    }

    #[test]
    fn responder_failures_become_failed_replies() {
        let executor = Loopback::new(|_| Err(Failure::Dropped("offline".to_string())));
        let (mut tx, mut rx) = executor.channel();
        block_on(async {
            tx.dispatch(submission(7, "x")).await.unwrap();
            let reply = rx.reply().await.unwrap();
            assert_eq!(reply.ticket, Ticket(7));
            assert!(matches!(reply.answer, Answer::Failure(Failure::Dropped(_))));
        });
    }

    #[test]
    fn closed_senders_refuse_submissions() {
        let executor = Loopback::echo();
        let (mut tx, _rx) = executor.channel();
        block_on(async {
            tx.close().await.unwrap();
            assert_eq!(tx.dispatch(submission(0, "a")).await, Err(Error::Closed));
        });
        assert!(executor.journal().is_empty());
    }
}
