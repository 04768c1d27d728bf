use crate::executor::Collector;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

/// The future returned from [`CollectorExt::reply`](crate::executor::CollectorExt::reply).
#[derive(Debug)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Reply<'a, Rx: ?Sized> {
    rx: &'a mut Rx,
}

impl<'a, Rx: ?Sized> Reply<'a, Rx> {
    pub(crate) fn new(rx: &'a mut Rx) -> Reply<'a, Rx> {
        Self { rx }
    }
}

impl<Rx: Unpin + ?Sized> Unpin for Reply<'_, Rx> {}

impl<Rx: Collector + ?Sized> Future for Reply<'_, Rx> {
    type Output = Result<crate::Reply, Rx::Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Collector::poll_reply(Pin::new(&mut *self.rx), cx)
    }
}
