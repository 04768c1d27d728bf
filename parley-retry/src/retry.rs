//! The [`Retry`] executor, which transparently retries requests its inner executor reports as
//! failed, for as long as its recovery strategy says to.

use parley::{
    executor::{CollectorExt, DispatcherExt},
    Answer, Collector, Dispatcher, Executor, Failure, Reply, Submission,
};
use parley_tokio_mpsc::{spawn_worker, Receiver, Sender, Worker};
use std::{fmt::Display, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::time::Instant;

use crate::{backoff::Backoff, util::sleep_until_or_deadline};

/// A description of what to do when a request fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Pause for at least this amount of time, then submit the request again.
    RetryAfter(Duration),
    /// Give up, passing the failure on to the program.
    Fail,
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::Fail
    }
}

type Recovery = Arc<dyn Fn(usize, &Failure) -> RetryStrategy + Sync + Send>;

/// An [`Executor`] which serves each flow from a Tokio task, forwarding every submission to a
/// fresh flow of an inner executor and resubmitting it whenever its recovery strategy says to.
///
/// The program running against a `Retry` sees only the final reply to each request. A
/// [`Failure::RateLimited`] failure carrying a `retry_after` is never retried sooner than the
/// service asked, whatever the strategy says.
///
/// Flows must be opened (i.e. programs must be run) from within a Tokio runtime.
///
/// # Examples
///
/// ```
/// use parley_retry::{Backoff, Retry};
/// use parley_loopback::Loopback;
/// use std::time::Duration;
///
/// let executor = Retry::rate_limited(
///     Loopback::echo(),
///     &Backoff::with_delay(Duration::from_millis(100))
///         .exponential(2.0)
///         .max_retries(5),
/// )
/// .timeout(Duration::from_secs(30));
/// ```
#[derive(Derivative)]
#[derivative(Debug(bound = "E: std::fmt::Debug"), Clone(bound = "E: Clone"))]
pub struct Retry<E> {
    inner: E,
    #[derivative(Debug = "ignore")]
    recover: Recovery,
    timeout: Option<Duration>,
    buffer: usize,
}

impl<E: Executor> Retry<E> {
    /// Wrap an executor without retrying anything. Use [`recover`](Retry::recover) to set a
    /// recovery strategy.
    pub fn new(inner: E) -> Self {
        Retry {
            inner,
            recover: Arc::new(|_, _| RetryStrategy::Fail),
            timeout: None,
            buffer: 1,
        }
    }

    /// Wrap an executor, retrying only rate-limited requests, according to `backoff`.
    pub fn rate_limited(inner: E, backoff: &Backoff) -> Self {
        let backoff = backoff.clone();
        Retry::new(inner).recover(move |retries, failure| match failure {
            Failure::RateLimited { .. } => backoff.delay(retries),
            _ => RetryStrategy::Fail,
        })
    }

    /// Set the recovery strategy, which is given the number of retries already made for a
    /// request and the reason it failed this time.
    pub fn recover(
        mut self,
        recovery: impl Fn(usize, &Failure) -> RetryStrategy + Sync + Send + 'static,
    ) -> Self {
        self.recover = Arc::new(recovery);
        self
    }

    /// Set a limit on the total time spent retrying any one request. A retry which would begin
    /// after this limit is never attempted, and the last failure is passed on instead.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Clear the retry time limit, so that requests are retried for as long as the recovery
    /// strategy says to.
    pub fn clear_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Set how many replies may be waiting to be collected before the retrying task waits. The
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

    /// The wrapped executor.
    pub fn inner(&self) -> &E {
        &self.inner
    }
}

impl<E> Executor for Retry<E>
where
    E: Executor,
    <E::Tx as Dispatcher>::Error: Display + Send,
    <E::Rx as Collector>::Error: Display + Send,
{
    type Tx = Sender;
    type Rx = Receiver;

    fn flow(&self) -> (Sender, Receiver) {
        let (tx, rx) = self.inner.flow();
        let policy = Policy {
            recover: self.recover.clone(),
            timeout: self.timeout,
        };
        spawn_worker(self.buffer, move |worker| serve(worker, tx, rx, policy))
    }
}

struct Policy {
    recover: Recovery,
    timeout: Option<Duration>,
}

#[derive(Debug, Error)]
enum FlowError<TxErr, RxErr> {
    #[error("inner flow refused a submission: {0}")]
    Dispatch(TxErr),
    #[error("inner flow failed to reply: {0}")]
    Collect(RxErr),
}

async fn serve<Tx, Rx>(mut worker: Worker, mut tx: Tx, mut rx: Rx, policy: Policy)
where
    Tx: Dispatcher,
    Rx: Collector,
    Tx::Error: Display + Send,
    Rx::Error: Display + Send,
{
    while let Some(submission) = worker.next().await {
        let ticket = submission.ticket();
        let reply = match attempt(&mut tx, &mut rx, &submission, &policy).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!(%ticket, error = %err, "inner executor flow broke down");
                break;
            }
        };
        if worker.reply(reply).await.is_err() {
            tracing::debug!(%ticket, "flow collector is gone, dropping reply");
            break;
        }
    }
    if let Err(err) = tx.close().await {
        tracing::debug!(error = %err, "failed to close inner executor flow");
    }
}

/// Submit `submission` to the inner flow until it succeeds or the policy gives up on it.
async fn attempt<Tx, Rx>(
    tx: &mut Tx,
    rx: &mut Rx,
    submission: &Submission,
    policy: &Policy,
) -> Result<Reply, FlowError<Tx::Error, Rx::Error>>
where
    Tx: Dispatcher,
    Rx: Collector,
{
    let deadline = policy.timeout.map(|timeout| Instant::now() + timeout);
    let mut retries = 0;
    loop {
        tx.dispatch(submission.clone())
            .await
            .map_err(FlowError::Dispatch)?;
        tx.flush().await.map_err(FlowError::Dispatch)?;
        let reply = rx.reply().await.map_err(FlowError::Collect)?;

        let failure = match reply.answer {
            Answer::Failure(failure) => failure,
            answer => return Ok(Reply::new(reply.ticket, answer)),
        };
        let delay = match (policy.recover)(retries, &failure) {
            RetryStrategy::RetryAfter(delay) => match &failure {
                Failure::RateLimited {
                    retry_after: Some(retry_after),
                    ..
                } => delay.max(*retry_after),
                _ => delay,
            },
            RetryStrategy::Fail => return Ok(Reply::new(reply.ticket, Answer::Failure(failure))),
        };

        retries += 1;
        tracing::warn!(
            ticket = %submission.ticket(),
            route = %submission.route(),
            %failure,
            retries,
            ?delay,
            "retrying failed request"
        );
        if !sleep_until_or_deadline(delay, deadline).await {
            tracing::warn!(ticket = %submission.ticket(), "retry time limit exceeded, giving up");
            return Ok(Reply::new(reply.ticket, Answer::Failure(failure)));
        }
    }
}
