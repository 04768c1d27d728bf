//! `parley-retry` lets you wrap any [`parley`] executor with automatic retries. When the inner
//! executor reports that a request failed, the [`Retry`] executor waits and submits it again,
//! according to a recovery strategy (usually built from a [`Backoff`]), passing the failure on to
//! the running program only once the strategy gives up.
//!
//! The most common use is to absorb rate limiting:
//!
//! ```
//! use futures::StreamExt;
//! use parley::{DecodeError, Failure, RawResponse, Request, RequestExt, Route};
//! use parley_loopback::Loopback;
//! use parley_retry::{Backoff, Retry};
//! use std::{
//!     sync::atomic::{AtomicUsize, Ordering},
//!     time::Duration,
//! };
//!
//! #[derive(Debug)]
//! struct Ping;
//!
//! impl Request for Ping {
//!     type Response = String;
//!
//!     fn route(&self) -> Route {
//!         Route::get("https://example.com/ping")
//!     }
//!
//!     fn decode(&self, response: &RawResponse) -> Result<Option<String>, DecodeError> {
//!         Ok(Some(response.text()))
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! // A service which rate limits the first request it sees
//! let seen = AtomicUsize::new(0);
//! let service = Loopback::new(move |_| {
//!     if seen.fetch_add(1, Ordering::SeqCst) == 0 {
//!         Err(Failure::RateLimited { global: false, retry_after: None })
//!     } else {
//!         Ok(RawResponse::ok("pong"))
//!     }
//! });
//!
//! let executor = Retry::rate_limited(
//!     service.clone(),
//!     &Backoff::with_delay(Duration::from_millis(10)).max_retries(3),
//! );
//! let pongs: Vec<String> = Ping.wrap().run(&executor).collect().await;
//! assert_eq!(pongs, vec!["pong"]);
//! assert_eq!(service.submitted(), 2);
//! # }
//! ```

#![allow(clippy::type_complexity)]
#![warn(missing_docs)]
#![warn(missing_copy_implementations, missing_debug_implementations)]
#![warn(unused_qualifications, unused_results)]
#![warn(future_incompatible)]
#![warn(unused)]
// Documentation configuration
#![forbid(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
extern crate derivative;

mod backoff;
mod retry;
mod util;

pub use backoff::Backoff;
pub use retry::{Retry, RetryStrategy};
