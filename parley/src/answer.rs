//! What crosses an executor flow: [`Submission`]s going in, [`Reply`]s coming out.

use std::{fmt, sync::Arc, time::Duration};
use thiserror::Error;

use crate::{Body, DecodeError, Header, Payload, RawResponse, Request, Route};

/// The correlation token attached to each submission, and echoed back on its reply.
///
/// Tickets are numbered from zero in submission order, independently for each run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(pub u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a submission did not produce a usable payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    /// The service answered with a non-success status.
    #[error("service responded with status {status}: {message}")]
    Http {
        /// The HTTP status code.
        status: u16,
        /// The body of the response, as text.
        message: String,
    },
    /// The request was rate limited and dropped.
    #[error("rate limited (global: {global})")]
    RateLimited {
        /// Whether the limit applies to every route, not just this one.
        global: bool,
        /// How long the service asked us to wait, if it said.
        retry_after: Option<Duration>,
    },
    /// The response was successful but could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The executor gave up on the request without contacting the service, or lost it.
    #[error("request dropped: {0}")]
    Dropped(String),
}

/// The outcome of submitting one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer<T> {
    /// The request succeeded and decoded to a value.
    Success(T),
    /// The request succeeded, but its response was rejected by a
    /// [`filter_response`](crate::RequestExt::filter_response).
    Filtered,
    /// The request did not succeed.
    Failure(Failure),
}

impl<T> Answer<T> {
    /// Whether this answer carries a usable value.
    pub fn is_success(&self) -> bool {
        matches!(self, Answer::Success(_))
    }

    /// The value of this answer, if there is one.
    pub fn success(self) -> Option<T> {
        match self {
            Answer::Success(t) => Some(t),
            Answer::Filtered | Answer::Failure(_) => None,
        }
    }

    /// Transform the value of a successful answer.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Answer<U> {
        match self {
            Answer::Success(t) => Answer::Success(f(t)),
            Answer::Filtered => Answer::Filtered,
            Answer::Failure(failure) => Answer::Failure(failure),
        }
    }
}

impl<T> From<Failure> for Answer<T> {
    fn from(failure: Failure) -> Self {
        Answer::Failure(failure)
    }
}

/// One request handed to an executor flow, together with the [`Ticket`] its reply must carry.
///
/// The request is type-erased: it decodes to a [`Payload`]. Executors route it using
/// [`route`](Submission::route), [`body`](Submission::body), and [`headers`](Submission::headers),
/// and turn what the service sent back into an [`Answer`] with [`answer`](Submission::answer).
#[derive(Debug, Clone)]
pub struct Submission {
    ticket: Ticket,
    request: Arc<dyn Request<Response = Payload>>,
}

impl Submission {
    /// Construct a submission. The interpreter does this for every request it submits; executors
    /// only need to do it when they originate requests of their own.
    pub fn new(ticket: Ticket, request: Arc<dyn Request<Response = Payload>>) -> Self {
        Submission { ticket, request }
    }

    /// The ticket the reply to this submission must carry.
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// See [`Request::route`].
    pub fn route(&self) -> Route {
        self.request.route()
    }

    /// See [`Request::body`].
    pub fn body(&self) -> Body {
        self.request.body()
    }

    /// See [`Request::headers`].
    pub fn headers(&self) -> Vec<Header> {
        self.request.headers()
    }

    /// See [`Request::requires_auth`].
    pub fn requires_auth(&self) -> bool {
        self.request.requires_auth()
    }

    /// The underlying request.
    pub fn request(&self) -> &Arc<dyn Request<Response = Payload>> {
        &self.request
    }

    /// Interpret a raw response to this submission.
    ///
    /// - `2xx`: decoded by the request; a value is a [`Success`](Answer::Success), a filtered
    ///   response is [`Filtered`](Answer::Filtered), and a decoding error is a
    ///   [`Failure::Decode`].
    /// - `429`: a [`Failure::RateLimited`], honoring `retry-after` and `x-ratelimit-global`.
    /// - anything else: a [`Failure::Http`].
    pub fn answer(&self, response: RawResponse) -> Answer<Payload> {
        if response.is_success() {
            match self.request.decode(&response) {
                Ok(Some(payload)) => Answer::Success(payload),
                Ok(None) => Answer::Filtered,
                Err(err) => Answer::Failure(Failure::Decode(err)),
            }
        } else if response.status() == 429 {
            Answer::Failure(Failure::RateLimited {
                global: response.is_global_rate_limit(),
                retry_after: response.retry_after(),
            })
        } else {
            Answer::Failure(Failure::Http {
                status: response.status(),
                message: response.text(),
            })
        }
    }

    /// Build the [`Reply`] to this submission from a raw response.
    pub fn reply(&self, response: RawResponse) -> Reply {
        Reply::new(self.ticket, self.answer(response))
    }

    /// Build the [`Reply`] to this submission for a request that never reached the service.
    pub fn fail(&self, failure: Failure) -> Reply {
        Reply::new(self.ticket, Answer::Failure(failure))
    }
}

/// The answer to one [`Submission`], carrying that submission's [`Ticket`].
#[derive(Debug, Clone)]
pub struct Reply {
    /// The ticket of the submission this answers.
    pub ticket: Ticket,
    /// The answer itself.
    pub answer: Answer<Payload>,
}

impl Reply {
    /// Construct a reply.
    pub fn new(ticket: Ticket, answer: Answer<Payload>) -> Self {
        Reply { ticket, answer }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RequestExt, Route};

    #[derive(Debug)]
    struct Text;

    impl Request for Text {
        type Response = String;

        fn route(&self) -> Route {
            Route::get("https://example.com/text")
        }

        fn decode(&self, response: &RawResponse) -> Result<Option<String>, DecodeError> {
            if response.body().is_empty() {
                Err(DecodeError::new("empty body"))
            } else {
                Ok(Some(response.text()))
            }
        }
    }

    fn submission() -> Submission {
        Submission::new(
            Ticket(3),
            Arc::new(
                Text.filter_response(|s| s != "skip")
                    .map_response(Payload::new),
            ),
        )
    }

    #[test]
    fn success_decodes_through_the_request() {
        let answer = submission().answer(RawResponse::ok("hi"));
        let payload = answer.success().unwrap();
        assert_eq!(payload.downcast::<String>().unwrap(), "hi");
    }

    #[test]
    fn filtered_and_undecodable_responses_are_distinguished() {
        assert!(matches!(
            submission().answer(RawResponse::ok("skip")),
            Answer::Filtered
        ));
        assert!(matches!(
            submission().answer(RawResponse::ok("")),
            Answer::Failure(Failure::Decode(_))
        ));
    }

    #[test]
    fn rate_limits_read_their_headers() {
        let response = RawResponse::new(429, "")
            .with_header("Retry-After", "1.5")
            .with_header("X-RateLimit-Global", "true");
        match submission().answer(response) {
            Answer::Failure(Failure::RateLimited {
                global,
                retry_after,
            }) => {
                assert!(global);
                assert_eq!(retry_after, Some(Duration::from_millis(1500)));
            }
            other => panic!("unexpected answer: {:?}", other),
        }
    }

    #[test]
    fn unrepresentable_retry_delays_are_ignored() {
        for delay in ["1e30", "-1", "NaN", "inf", "soon"] {
            let response = RawResponse::new(429, "").with_header("Retry-After", delay);
            match submission().answer(response) {
                Answer::Failure(Failure::RateLimited {
                    global,
                    retry_after,
                }) => {
                    assert!(!global);
                    assert_eq!(retry_after, None, "retry-after: {}", delay);
                }
                other => panic!("unexpected answer: {:?}", other),
            }
        }
    }

    #[test]
    fn other_statuses_are_http_failures() {
        let reply = submission().reply(RawResponse::new(404, "Unknown Channel"));
        assert_eq!(reply.ticket, Ticket(3));
        assert!(matches!(
            reply.answer,
            Answer::Failure(Failure::Http { status: 404, .. })
        ));
    }
}
