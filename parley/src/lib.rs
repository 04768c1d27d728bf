/*!
![license: MIT](https://img.shields.io/github/license/boltlabs-inc/parley)
[![crates.io](https://img.shields.io/crates/v/parley)](https://crates.io/crates/parley)
[![docs.rs documentation](https://docs.rs/parley/badge.svg)](https://docs.rs/parley)

> **parley (noun):** A discussion held to settle the terms of an exchange.
>
> **parley (crate):** Declarative composition of dependent asynchronous API requests.

Talking to a remote API is rarely one request. More often, the answer to one request decides what
the next one should be: fetch a message, then its channel, then that channel's guild. Wiring this
up by hand means threading futures together, matching responses to the requests that caused them,
and deciding at every step what happens when something goes wrong.

This crate lets you *describe* such a conversation as a value, a [`RequestDsl`], built from
individual [`Request`]s and plain values with [`map`](RequestDsl::map),
[`filter`](RequestDsl::filter), and [`flat_map`](RequestDsl::flat_map). Describing does nothing at
all. Only [`run`](RequestDsl::run)ning the description against an [`Executor`] submits requests,
and only as fast as you consume the resulting [`Stream`](futures::Stream) of values:

- **One request is in flight at a time.** The next request is not submitted until the previous one
  has been answered and its consequences have been run to completion, so a program's outputs come
  out in exactly the order the program describes them.
- **Nothing happens that you don't ask for.** Stop polling the stream and no further requests are
  submitted. Drop it and any reply still in flight is discarded.
- **Programs are values.** The same [`RequestDsl`] can be run any number of times, against any
  number of executors, with nothing shared between the runs.
- **Long chains are fine.** The interpreter keeps its pending work on the heap, so even very long
  chains of dependent requests run in constant stack space.

The executor does the actual I/O, along with anything else a real transport needs, like rate
limiting and retries. A few are available out of the box:

- The [`parley-loopback`] crate answers requests synchronously from a function, which is useful
  for tests and for stubbing out a service.
- The [`parley-tokio-mpsc`] crate serves requests from a separate Tokio task, connected to the
  interpreter by [`mpsc`] queues.
- The [`parley-retry`] crate wraps any executor built on [`parley-tokio-mpsc`] with automatic
  retry of rate-limited requests, with configurable backoff.

The [`parley-requests`] crate provides ready-made descriptors for a chat-service REST API: data
lookups, CDN image URLs with validated sizes and formats, and the OAuth2 authorization flow.

[`parley-loopback`]: https://docs.rs/parley-loopback
[`parley-tokio-mpsc`]: https://docs.rs/parley-tokio-mpsc
[`parley-retry`]: https://docs.rs/parley-retry
[`parley-requests`]: https://docs.rs/parley-requests
[`mpsc`]: https://docs.rs/tokio/latest/tokio/sync/mpsc/index.html

# Quick reference

| Construction | Yields when run |
| :----------- | :-------------- |
| [`RequestDsl::pure(a)`](RequestDsl::pure) | `a`, without any I/O |
| [`RequestDsl::empty()`](RequestDsl::empty) | nothing |
| [`RequestDsl::from_option(o)`](RequestDsl::from_option) | the value in `o`, if there is one |
| [`RequestDsl::wrap(r)`](RequestDsl::wrap) or [`r.wrap()`](RequestExt::wrap) | the decoded response to `r`, if it succeeds |
| [`RequestDsl::concat(parts)`](RequestDsl::concat) | the values of each part, in order |
| [`dsl.map(f)`](RequestDsl::map) | `f(a)` for each `a` of `dsl` |
| [`dsl.filter(p)`](RequestDsl::filter) | each `a` of `dsl` for which `p(&a)` holds |
| [`dsl.flat_map(f)`](RequestDsl::flat_map) | for each `a` of `dsl`, all the values of `f(a)` |

# Failures

A request which is not answered successfully yields nothing under [`run`](RequestDsl::run), just
like a value removed by [`filter`](RequestDsl::filter). When the difference matters, use
[`try_run`](RequestDsl::try_run) instead: each failed request then appears in the stream as a
[`RunError::Rejected`] carrying the executor's [`Failure`], and the run carries on with the rest of
the program. Values removed by a filter are never errors.

# Writing an executor

An executor hands out flows: a [`Dispatcher`] which accepts [`Submission`]s, and a [`Collector`]
which produces one [`Reply`] for each, in order. Any closure returning such a pair is already an
[`Executor`]. A [`Submission`] describes everything needed to perform the request, and
[`Submission::reply`] turns whatever the service said into the [`Reply`] the interpreter expects.
*/

#![allow(clippy::type_complexity)]
#![warn(missing_docs)]
#![warn(missing_copy_implementations, missing_debug_implementations)]
#![warn(unused_qualifications, unused_results)]
#![warn(future_incompatible)]
#![warn(unused)]
#![forbid(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
extern crate derivative;

pub mod executor;

mod answer;
mod dsl;
mod error;
mod request;
mod route;
mod run;
mod value;

pub use answer::{Answer, Failure, Reply, Submission, Ticket};
pub use dsl::{RequestDsl, Sequence};
pub use error::{DecodeError, RunError};
pub use executor::{Collector, Dispatcher, Executor};
pub use request::{FilterResponse, MapResponse, Request, RequestExt};
#[cfg(feature = "json")]
pub use route::decode_json;
pub use route::{Body, Header, Method, RawResponse, Route};
pub use run::{run, try_run, Run, TryRun};
pub use value::{Payload, Value};

/// The prelude module for quickly getting started with parley.
///
/// This module is designed to be imported as `use parley::prelude::*;`, which brings into scope
/// the traits and types needed to build and run programs.
pub mod prelude {
    #[doc(no_inline)]
    pub use crate::executor::{
        Collector, CollectorExt, Dispatcher, DispatcherExt, Executor,
    };
    #[doc(no_inline)]
    pub use crate::{Request, RequestDsl, RequestExt};
    #[doc(no_inline)]
    pub use futures::StreamExt;
}
