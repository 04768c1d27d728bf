//! The interface implemented by every executor a [`RequestDsl`](crate::RequestDsl) runs against.
//!
//! An executor hands out *flows*: a [`Dispatcher`] `Tx` which accepts [`Submission`]s, paired with
//! a [`Collector`] `Rx` which produces the [`Reply`] to each of them. The interpreter submits one
//! request at a time, and waits for its reply before submitting the next, so a flow only ever has
//! to answer in the order it was asked.
//!
//! The extension traits [`DispatcherExt`] and [`CollectorExt`] provide
//! [`dispatch`](DispatcherExt::dispatch), [`flush`](DispatcherExt::flush),
//! [`close`](DispatcherExt::close), and [`reply`](CollectorExt::reply) asynchronous methods for
//! all flows. As the implementor of an executor, you do not need to implement them yourself.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use crate::{Reply, Submission};

/// The submitting half of an executor flow.
pub trait Dispatcher: Send + Unpin + 'static {
    /// The type of possible errors when dispatching.
    type Error;

    /// Attempts to prepare the dispatcher to accept a submission.
    ///
    /// This method must be called and return `Poll::Ready(Ok(()))` prior to each call to
    /// [`Dispatcher::start_dispatch`]. If it returns `Poll::Pending`, the current task is
    /// registered to be notified when [`poll_ready`](Dispatcher::poll_ready) should be called
    /// again.
    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>>;

    /// Begin the process of dispatching a submission. Each call to this function must be preceded
    /// by a successful call to [`Dispatcher::poll_ready`].
    fn start_dispatch(self: Pin<&mut Self>, submission: Submission) -> Result<(), Self::Error>;

    /// Flush any submissions this dispatcher is still holding on to.
    ///
    /// This method returns `Poll::Ready(Ok(()))` when every submission passed to
    /// [`start_dispatch`](Dispatcher::start_dispatch) has been handed over to whatever will answer
    /// it.
    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>>;

    /// Flush this dispatcher and attempt to close it. No submissions may follow.
    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>>;
}

/// The answering half of an executor flow.
pub trait Collector: Send + Unpin + 'static {
    /// The type of possible errors when collecting.
    type Error;

    /// Poll for the reply to the oldest unanswered submission.
    ///
    /// This method returns `Poll::Ready(Ok(reply))` when a [`Reply`] is available,
    /// `Poll::Pending` if it is not yet, or `Poll::Ready(Err(error))` if the flow broke down.
    fn poll_reply(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<Reply, Self::Error>>;
}

/// Something which can open fresh flows for programs to run against.
///
/// Every closure returning a `(Tx, Rx)` pair is an executor.
pub trait Executor {
    /// The submitting half of a flow.
    type Tx: Dispatcher;
    /// The answering half of a flow.
    type Rx: Collector;

    /// Open a new flow.
    fn flow(&self) -> (Self::Tx, Self::Rx);
}

impl<F, Tx, Rx> Executor for F
where
    F: Fn() -> (Tx, Rx),
    Tx: Dispatcher,
    Rx: Collector,
{
    type Tx = Tx;
    type Rx = Rx;

    fn flow(&self) -> (Tx, Rx) {
        self()
    }
}

/// This module defines the future types returned from the methods of [`DispatcherExt`] and
/// [`CollectorExt`].
pub mod futures {
    mod dispatch;
    mod drain;
    mod reply;

    pub use dispatch::Dispatch;
    pub use drain::{Close, Flush};
    pub use reply::Reply;
}

/// This extension trait is implemented for all [`Dispatcher`]s, providing a convenient way to
/// drive them in asynchronous code.
pub trait DispatcherExt: Dispatcher {
    /// Asynchronously dispatch a submission. This *does not* necessarily flush the dispatcher;
    /// call [`flush`](DispatcherExt::flush) to ensure it has been handed over.
    fn dispatch(&mut self, submission: Submission) -> futures::Dispatch<'_, Self> {
        futures::Dispatch::new(self, submission)
    }

    /// Asynchronously flush this dispatcher.
    fn flush(&mut self) -> futures::Flush<'_, Self> {
        futures::Flush::new(self)
    }

    /// Asynchronously flush and close this dispatcher.
    fn close(&mut self) -> futures::Close<'_, Self> {
        futures::Close::new(self)
    }
}

impl<Tx: Dispatcher> DispatcherExt for Tx {}

/// This extension trait is implemented for all [`Collector`]s, providing a convenient way to
/// await replies in asynchronous code.
pub trait CollectorExt: Collector {
    /// Asynchronously wait for the next reply.
    fn reply(&mut self) -> futures::Reply<'_, Self> {
        futures::Reply::new(self)
    }
}

impl<Rx: Collector> CollectorExt for Rx {}
