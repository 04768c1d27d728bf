use crate::executor::Dispatcher;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

// Both futures borrow the dispatcher and forward to one of its polling methods until it resolves.
macro_rules! drain_future {
    ($(#[$doc:meta])* $name:ident => $poll:ident) => {
        $(#[$doc])*
        #[derive(Debug)]
        #[must_use = "futures do nothing unless you `.await` or poll them"]
        pub struct $name<'a, Tx: ?Sized> {
            tx: &'a mut Tx,
        }

        impl<'a, Tx: ?Sized> $name<'a, Tx> {
            pub(crate) fn new(tx: &'a mut Tx) -> Self {
                $name { tx }
            }
        }

        impl<Tx: Unpin + ?Sized> Unpin for $name<'_, Tx> {}

        impl<Tx: Dispatcher + ?Sized> Future for $name<'_, Tx> {
            type Output = Result<(), Tx::Error>;

            fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
                Dispatcher::$poll(Pin::new(&mut *self.tx), cx)
            }
        }
    };
}

drain_future! {
    /// The future returned from [`DispatcherExt::flush`](crate::executor::DispatcherExt::flush).
    ///
    /// Resolves once every submission dispatched so far has been handed over.
    Flush => poll_flush
}

drain_future! {
    /// The future returned from [`DispatcherExt::close`](crate::executor::DispatcherExt::close).
    Close => poll_close
}
