use crate::{executor::Dispatcher, Submission};
use futures::ready;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

/// The future returned from [`DispatcherExt::dispatch`](crate::executor::DispatcherExt::dispatch).
#[derive(Debug)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Dispatch<'a, Tx: ?Sized> {
    tx: &'a mut Tx,
    submission: Option<Submission>,
}

impl<'a, Tx: ?Sized> Dispatch<'a, Tx> {
    pub(crate) fn new(tx: &'a mut Tx, submission: Submission) -> Dispatch<'a, Tx> {
        Self {
            tx,
            submission: Some(submission),
        }
    }
}

impl<Tx: Unpin + ?Sized> Unpin for Dispatch<'_, Tx> {}

impl<Tx: Dispatcher + ?Sized> Future for Dispatch<'_, Tx> {
    type Output = Result<(), Tx::Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        ready!(Pin::new(&mut *this.tx).poll_ready(cx))?;
        let submission = this
            .submission
            .take()
            .expect("polled `Dispatch` after completion");
        Pin::new(&mut *this.tx).start_dispatch(submission)?;
        Poll::Ready(Ok(()))
    }
}
