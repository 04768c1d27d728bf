use std::time::Duration;

use crate::RetryStrategy;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// A description of a backoff strategy with optional exponential delay, random jitter, maximum
/// delay, and maximum retries, which [`Retry::rate_limited`](crate::Retry::rate_limited) follows when a
/// request is rate limited.
///
/// With the `serde` feature enabled, a `Backoff` can be loaded from configuration, with its
/// durations written in human-readable form:
///
/// ```json
/// { "initial_delay": "250ms", "factor": 2.0, "jitter": "50ms", "max_delay": "10s", "max_retries": 5 }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(crate = "serde_crate"))]
pub struct Backoff {
    #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
    initial_delay: Duration,
    #[cfg_attr(feature = "serde", serde(default = "no_factor"))]
    factor: f64,
    #[cfg_attr(feature = "serde", serde(default, with = "humantime_serde"))]
    jitter: Duration,
    #[cfg_attr(feature = "serde", serde(default, with = "humantime_serde"))]
    max_delay: Option<Duration>,
    #[cfg_attr(feature = "serde", serde(default = "unlimited"))]
    max_retries: usize,
}

#[cfg(feature = "serde")]
fn no_factor() -> f64 {
    1.0
}

#[cfg(feature = "serde")]
fn unlimited() -> usize {
    usize::MAX
}

impl Backoff {
    /// Create a simple [`Backoff`] which delays by `initial_delay` each time it is invoked,
    /// forever.
    pub fn with_delay(initial_delay: Duration) -> Self {
        Backoff {
            initial_delay,
            factor: 1.0,
            jitter: Duration::from_millis(0),
            max_delay: None,
            max_retries: usize::MAX,
        }
    }

    /// Add an exponential factor to a [`Backoff`], so that every time it is invoked, it delays for
    /// that multiple of its previous delay time.
    pub fn exponential(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    /// Add random jitter to a [`Backoff`], so that every time it is invoked, it adds or subtracts a
    /// random duration from its delay within the range specified.
    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Cap the maximum delay of a [`Backoff`] so that every time it is invoked, it will delay by at
    /// most `max_delay`, if otherwise it would delay more.
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Clear the maximum delay of [`Backoff`] so that it will delay as long as its other parameters
    /// specify.
    pub fn clear_max_delay(mut self) -> Self {
        self.max_delay = None;
        self
    }

    /// Set the maximum number of retries for a [`Backoff`], so that it will give up on a request
    /// after retrying it that many times.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// How long to wait before the next attempt at a request which has already been retried
    /// `retries` times, or [`Fail`](RetryStrategy::Fail) once it has used up its retries.
    ///
    /// The delay is `initial_delay * factor^retries`, capped at the maximum delay, then moved up
    /// or down by a random amount no larger than the jitter. It never goes below zero.
    pub fn delay(&self, retries: usize) -> RetryStrategy {
        if retries >= self.max_retries {
            return RetryStrategy::Fail;
        }
        let exponent = i32::try_from(retries).unwrap_or(i32::MAX);
        let scaled = self.initial_delay.as_secs_f64() * self.factor.abs().powi(exponent);
        let mut delay = match self.max_delay {
            Some(max) if scaled >= max.as_secs_f64() => max,
            _ => Duration::try_from_secs_f64(scaled).unwrap_or(Duration::MAX),
        };
        let offset = self.jitter.mul_f64(rand::random::<f64>());
        if rand::random() {
            delay = delay.saturating_add(offset);
        } else {
            delay = delay.saturating_sub(offset);
        }
        RetryStrategy::RetryAfter(delay)
    }
}
