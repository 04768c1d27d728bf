//! The interpreter: turning a [`RequestDsl`] into a lazy stream of values over an executor flow.
//!
//! Interpretation is an in-order traversal of the program, driven entirely by the consumer of the
//! stream. Pending work lives on an explicit stack, and the steps a value must still pass through
//! live on a shared linked chain, one link per step. Each delivery calls exactly one step, so no
//! chain of [`flat_map`](RequestDsl::flat_map)s, however long or however it was built, grows the
//! call stack while it runs.

use futures::{ready, stream::FusedStream, Stream};
use pin_project::pin_project;
use std::{
    fmt,
    marker::PhantomData,
    mem,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use crate::{
    dsl::Step, Answer, Collector, Dispatcher, Executor, Payload, RequestDsl, RunError,
    Submission, Ticket, Value,
};

/// Run `program` against a fresh flow from `executor`; see [`RequestDsl::run`].
pub fn run<A: Value, E: Executor>(program: RequestDsl<A>, executor: &E) -> Run<A, E::Tx, E::Rx> {
    let (tx, rx) = executor.flow();
    Run::new(program, tx, rx)
}

/// Run `program` against a fresh flow from `executor`, surfacing failures; see
/// [`RequestDsl::try_run`].
pub fn try_run<A: Value, E: Executor>(
    program: RequestDsl<A>,
    executor: &E,
) -> TryRun<A, E::Tx, E::Rx> {
    let (tx, rx) = executor.flow();
    TryRun::new(program, tx, rx)
}

/// One step a value must still pass through, followed by the ones after it.
struct Link {
    then: Step,
    next: Option<Arc<Link>>,
}

impl Drop for Link {
    // Unlink iteratively: a long chain would otherwise drop one recursive call per link.
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(link) = next {
            next = match Arc::try_unwrap(link) {
                Ok(mut link) => link.next.take(),
                Err(_) => None,
            };
        }
    }
}

/// Put `steps`, in order, in front of `chain`.
fn link(steps: Vec<Step>, chain: Option<Arc<Link>>) -> Option<Arc<Link>> {
    steps
        .into_iter()
        .rev()
        .fold(chain, |next, then| Some(Arc::new(Link { then, next })))
}

/// A piece of the program still to be run, and where its values go.
struct Task {
    node: RequestDsl<Payload>,
    chain: Option<Arc<Link>>,
}

enum Stage {
    Dispatch(Submission),
    Flush,
    Await,
}

/// The single request currently handed to the executor flow.
struct InFlight {
    ticket: Ticket,
    stage: Stage,
    chain: Option<Arc<Link>>,
}

impl InFlight {
    fn poll<Tx: Dispatcher, Rx: Collector>(
        &mut self,
        tx: &mut Tx,
        rx: &mut Rx,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Answer<Payload>, RunError<Tx::Error, Rx::Error>>> {
        loop {
            match &self.stage {
                Stage::Dispatch(_) => {
                    ready!(Pin::new(&mut *tx).poll_ready(cx)).map_err(RunError::Dispatch)?;
                    if let Stage::Dispatch(submission) = mem::replace(&mut self.stage, Stage::Flush)
                    {
                        Pin::new(&mut *tx)
                            .start_dispatch(submission)
                            .map_err(RunError::Dispatch)?;
                    }
                }
                Stage::Flush => {
                    ready!(Pin::new(&mut *tx).poll_flush(cx)).map_err(RunError::Dispatch)?;
                    self.stage = Stage::Await;
                }
                Stage::Await => {
                    let reply = ready!(Pin::new(&mut *rx).poll_reply(cx)).map_err(RunError::Collect)?;
                    if reply.ticket != self.ticket {
                        return Poll::Ready(Err(RunError::Desynchronized {
                            expected: self.ticket,
                            received: reply.ticket,
                        }));
                    }
                    return Poll::Ready(Ok(reply.answer));
                }
            }
        }
    }
}

struct Interpreter<Tx, Rx> {
    tx: Tx,
    rx: Rx,
    tasks: Vec<Task>,
    in_flight: Option<InFlight>,
    next_ticket: u64,
    finished: bool,
}

impl<Tx: Dispatcher, Rx: Collector> Interpreter<Tx, Rx> {
    fn new(program: RequestDsl<Payload>, tx: Tx, rx: Rx) -> Self {
        Interpreter {
            tx,
            rx,
            tasks: vec![Task {
                node: program,
                chain: None,
            }],
            in_flight: None,
            next_ticket: 0,
            finished: false,
        }
    }

    /// Hand a value to the next continuation on its chain, or yield it if there is none.
    fn deliver(&mut self, value: Payload, chain: Option<Arc<Link>>) -> Option<Payload> {
        match chain {
            None => Some(value),
            Some(link) => {
                self.tasks.push(Task {
                    node: (link.then)(value),
                    chain: link.next.clone(),
                });
                None
            }
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.tasks.clear();
        self.in_flight = None;
    }

    fn poll_next(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Payload, RunError<Tx::Error, Rx::Error>>>> {
        loop {
            if self.finished {
                return Poll::Ready(None);
            }

            if let Some(mut flight) = self.in_flight.take() {
                let answer = match flight.poll(&mut self.tx, &mut self.rx, cx) {
                    Poll::Pending => {
                        self.in_flight = Some(flight);
                        return Poll::Pending;
                    }
                    Poll::Ready(Ok(answer)) => answer,
                    Poll::Ready(Err(err)) => {
                        self.finish();
                        return Poll::Ready(Some(Err(err)));
                    }
                };
                match answer {
                    Answer::Success(value) => {
                        if let Some(value) = self.deliver(value, flight.chain) {
                            return Poll::Ready(Some(Ok(value)));
                        }
                    }
                    Answer::Filtered => {}
                    Answer::Failure(failure) => {
                        return Poll::Ready(Some(Err(RunError::Rejected {
                            ticket: flight.ticket,
                            failure,
                        })));
                    }
                }
                continue;
            }

            let Task { node, chain } = match self.tasks.pop() {
                Some(task) => task,
                None => {
                    // Nothing left to submit: close our half of the flow.
                    let closed = ready!(Pin::new(&mut self.tx).poll_close(cx));
                    self.finish();
                    return Poll::Ready(closed.err().map(|err| Err(RunError::Dispatch(err))));
                }
            };

            match node {
                RequestDsl::Done(value) => {
                    if let Some(value) = self.deliver(value, chain) {
                        return Poll::Ready(Some(Ok(value)));
                    }
                }
                RequestDsl::Empty => {}
                RequestDsl::Submit(request) => {
                    let ticket = Ticket(self.next_ticket);
                    self.next_ticket += 1;
                    self.in_flight = Some(InFlight {
                        ticket,
                        stage: Stage::Dispatch(Submission::new(ticket, request)),
                        chain,
                    });
                }
                RequestDsl::Sequence(sequence) => {
                    let (first, steps) = sequence.into_parts();
                    self.tasks.push(Task {
                        node: first,
                        chain: link(steps, chain),
                    });
                }
                RequestDsl::Concat(parts) => {
                    self.tasks.extend(parts.into_iter().rev().map(|node| Task {
                        node,
                        chain: chain.clone(),
                    }));
                }
            }
        }
    }
}

/// The stream returned by [`RequestDsl::try_run`]: every value of the program in order, with each
/// request that was not answered successfully appearing as an error in its place.
///
/// A [`RunError::Rejected`] error is followed by the rest of the program. Any other error is the
/// last item of the stream. Dropping this stream stops all further submissions.
#[must_use = "streams do nothing unless polled"]
pub struct TryRun<A, Tx, Rx> {
    interpreter: Interpreter<Tx, Rx>,
    value: PhantomData<fn() -> A>,
}

impl<A: Value, Tx: Dispatcher, Rx: Collector> TryRun<A, Tx, Rx> {
    pub(crate) fn new(program: RequestDsl<A>, tx: Tx, rx: Rx) -> Self {
        TryRun {
            interpreter: Interpreter::new(program.erase(), tx, rx),
            value: PhantomData,
        }
    }

    /// How many requests have been submitted so far.
    pub fn submitted(&self) -> u64 {
        self.interpreter.next_ticket
    }
}

impl<A: Value, Tx: Dispatcher, Rx: Collector> Stream for TryRun<A, Tx, Rx> {
    type Item = Result<A, RunError<Tx::Error, Rx::Error>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut()
            .interpreter
            .poll_next(cx)
            .map(|item| item.map(|result| result.map(Payload::unerase::<A>)))
    }
}

impl<A: Value, Tx: Dispatcher, Rx: Collector> FusedStream for TryRun<A, Tx, Rx> {
    fn is_terminated(&self) -> bool {
        self.interpreter.finished
    }
}

impl<A, Tx, Rx> fmt::Debug for TryRun<A, Tx, Rx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TryRun")
            .field("submitted", &self.interpreter.next_ticket)
            .field("pending", &self.interpreter.tasks.len())
            .field("in_flight", &self.interpreter.in_flight.as_ref().map(|f| f.ticket))
            .field("finished", &self.interpreter.finished)
            .finish()
    }
}

/// The stream returned by [`RequestDsl::run`]: every value of the program in order.
///
/// Requests which were not answered successfully contribute nothing, exactly like values removed
/// by a [`filter`](RequestDsl::filter). If the executor flow itself breaks down, the stream ends.
/// Dropping this stream stops all further submissions; a reply to a request already in flight is
/// discarded.
#[pin_project]
#[derive(Debug)]
#[must_use = "streams do nothing unless polled"]
pub struct Run<A, Tx, Rx> {
    #[pin]
    inner: TryRun<A, Tx, Rx>,
}

impl<A: Value, Tx: Dispatcher, Rx: Collector> Run<A, Tx, Rx> {
    pub(crate) fn new(program: RequestDsl<A>, tx: Tx, rx: Rx) -> Self {
        Run {
            inner: TryRun::new(program, tx, rx),
        }
    }

    /// How many requests have been submitted so far.
    pub fn submitted(&self) -> u64 {
        self.inner.submitted()
    }
}

impl<A: Value, Tx: Dispatcher, Rx: Collector> Stream for Run<A, Tx, Rx> {
    type Item = A;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<A>> {
        let mut inner = self.project().inner;
        loop {
            match ready!(inner.as_mut().poll_next(cx)) {
                Some(Ok(value)) => return Poll::Ready(Some(value)),
                Some(Err(_)) => continue,
                None => return Poll::Ready(None),
            }
        }
    }
}

impl<A: Value, Tx: Dispatcher, Rx: Collector> FusedStream for Run<A, Tx, Rx> {
    fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }
}
