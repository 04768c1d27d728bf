//! This crate provides an executor for the [`parley`] crate which serves requests from a separate
//! Tokio task, connected to the interpreter by [`tokio::sync::mpsc`] channels. Submissions travel
//! to the task over an unbounded channel (the interpreter never has more than one in flight), and
//! replies travel back over a bounded one.
//!
//! Select this executor if you're using the Tokio runtime for asynchrony, and you want to perform
//! the actual I/O for your requests with any async client you like: implement [`Handler`] for it
//! (or just write an `async` closure) and wrap it in a [`TaskExecutor`]. For full control over the
//! task, use [`spawn_worker`] or [`channel`] directly.

#![allow(clippy::type_complexity)]
#![warn(missing_docs)]
#![warn(missing_copy_implementations, missing_debug_implementations)]
#![warn(unused_qualifications, unused_results)]
#![warn(future_incompatible)]
#![warn(unused)]
// Documentation configuration
#![forbid(rustdoc::broken_intra_doc_links)]

use parley::{
    Collector, Dispatcher, Executor, Failure, RawResponse, Reply, Submission, Ticket,
};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use thiserror::Error;
use tokio::sync::mpsc;

/// The dispatching half of a flow served by a worker task. See [`channel`].
#[derive(Debug, Clone)]
pub struct Sender(Option<mpsc::UnboundedSender<Submission>>);

/// The collecting half of a flow served by a worker task. See [`channel`].
#[derive(Debug)]
pub struct Receiver(mpsc::Receiver<Reply>);

/// The worker's end of a flow: where submissions arrive, and where their replies go.
#[derive(Debug)]
pub struct Worker {
    submissions: mpsc::UnboundedReceiver<Submission>,
    replies: mpsc::Sender<Reply>,
}

/// Create a flow whose submissions are served by whoever holds the returned [`Worker`].
///
/// At most `buffer` replies may be waiting to be collected before the worker is made to wait.
///
/// # Panics
///
/// Panics if `buffer` is zero.
///
/// # Examples
///
/// ```
/// let ((tx, rx), worker) = parley_tokio_mpsc::channel(1);
/// ```
pub fn channel(buffer: usize) -> ((Sender, Receiver), Worker) {
    let (submit, submissions) = mpsc::unbounded_channel();
    let (replies, collect) = mpsc::channel(buffer);
    (
        (Sender(Some(submit)), Receiver(collect)),
        Worker {
            submissions,
            replies,
        },
    )
}

/// Create a flow and spawn a Tokio task to serve it, running the future `serve` builds from the
/// [`Worker`] end.
///
/// This must be called from within a Tokio runtime.
pub fn spawn_worker<F, Fut>(buffer: usize, serve: F) -> (Sender, Receiver)
where
    F: FnOnce(Worker) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (flow, worker) = channel(buffer);
    drop(tokio::spawn(serve(worker)));
    flow
}

impl Worker {
    /// Wait for the next submission, or `None` once the dispatching half has been closed or
    /// dropped.
    pub async fn next(&mut self) -> Option<Submission> {
        self.submissions.recv().await
    }

    /// Send back the reply to a submission.
    ///
    /// This fails only if the collecting half of the flow has been dropped, in which case nobody
    /// is waiting for the reply anymore.
    pub async fn reply(&self, reply: Reply) -> Result<(), Reply> {
        self.replies
            .send(reply)
            .await
            .map_err(|mpsc::error::SendError(reply)| reply)
    }

    /// Serve every submission on this flow with `handler`, one at a time, until either half of the
    /// flow goes away.
    pub async fn serve<H: Handler>(mut self, handler: H) {
        while let Some(submission) = self.next().await {
            let ticket = submission.ticket();
            tracing::debug!(%ticket, route = %submission.route(), "serving request");
            let reply = match handler.handle(submission.clone()).await {
                Ok(response) => submission.reply(response),
                Err(failure) => {
                    tracing::error!(%ticket, %failure, "request failed");
                    submission.fail(failure)
                }
            };
            if self.reply(reply).await.is_err() {
                tracing::debug!(%ticket, "flow collector is gone, dropping reply");
                break;
            }
        }
    }
}

/// Something which performs the I/O for a [`Submission`].
///
/// This is implemented for every `Clone` closure taking a [`Submission`] and returning a future of
/// a [`RawResponse`] (or a [`Failure`], if the request never reached the service).
pub trait Handler: Clone + Send + Sync + 'static {
    /// Perform the request described by `submission`.
    fn handle(
        &self,
        submission: Submission,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, Failure>> + Send>>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Submission) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<RawResponse, Failure>> + Send + 'static,
{
    fn handle(
        &self,
        submission: Submission,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, Failure>> + Send>> {
        Box::pin(self(submission))
    }
}

/// An [`Executor`] which spawns a fresh Tokio task for each flow, serving its submissions with a
/// [`Handler`].
///
/// Flows must be opened (i.e. programs must be run) from within a Tokio runtime.
///
/// # Examples
///
/// ```
/// use parley::RawResponse;
/// use parley_tokio_mpsc::TaskExecutor;
///
/// let executor = TaskExecutor::new(|submission: parley::Submission| async move {
///     Ok::<_, parley::Failure>(RawResponse::ok(submission.route().uri().to_owned()))
/// })
/// .buffer(4);
/// ```
#[derive(Debug, Clone)]
pub struct TaskExecutor<H> {
    handler: H,
    buffer: usize,
}

impl<H: Handler> TaskExecutor<H> {
    /// An executor serving every request with `handler`.
    pub fn new(handler: H) -> Self {
        TaskExecutor { handler, buffer: 1 }
    }

    /// Set how many replies may be waiting to be collected before the worker task waits. The
    /// default is 1.
    ///
    /// # Panics
    ///
    /// Panics if `buffer` is zero.
    pub fn buffer(mut self, buffer: usize) -> Self {
        assert!(buffer > 0, "reply buffer must be nonzero");
        self.buffer = buffer;
        self
    }
}

impl<H: Handler> Executor for TaskExecutor<H> {
    type Tx = Sender;
    type Rx = Receiver;

    fn flow(&self) -> (Sender, Receiver) {
        let handler = self.handler.clone();
        spawn_worker(self.buffer, move |worker| worker.serve(handler))
    }
}

/// An error thrown while dispatching to a worker task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// The dispatching half of the flow was already closed.
    #[error("submission dispatched after the flow was closed")]
    Closed,
    /// The worker task has stopped, so the submission could not be delivered.
    #[error("worker task has stopped, submission {0} was not delivered")]
    Disconnected(Ticket),
}

/// An error thrown while collecting from a worker task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecvError {
    /// The worker task stopped without replying.
    #[error("worker task stopped before replying")]
    Closed,
}

impl Dispatcher for Sender {
    type Error = SendError;

    fn poll_ready(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(match &self.0 {
            None => Err(SendError::Closed),
            Some(_) => Ok(()),
        })
    }

    fn start_dispatch(self: Pin<&mut Self>, submission: Submission) -> Result<(), Self::Error> {
        let tx = self.0.as_ref().ok_or(SendError::Closed)?;
        tx.send(submission)
            .map_err(|mpsc::error::SendError(submission)| {
                SendError::Disconnected(submission.ticket())
            })
    }

    fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(mut self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.0 = None;
        Poll::Ready(Ok(()))
    }
}

impl Collector for Receiver {
    type Error = RecvError;

    fn poll_reply(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Reply, Self::Error>> {
        self.0
            .poll_recv(cx)
            .map(|reply| reply.ok_or(RecvError::Closed))
    }
}
