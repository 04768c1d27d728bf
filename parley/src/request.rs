//! The contract implemented by every request descriptor.
//!
//! A descriptor is an immutable value describing one call to the remote service: where it goes
//! ([`route`](Request::route)), what it carries ([`body`](Request::body)), and how to turn a
//! successful response into its [`Response`](Request::Response) type
//! ([`decode`](Request::decode)). Descriptors validate themselves when they are constructed, so
//! that by the time one exists it can always be submitted.
//!
//! Descriptors compose with [`RequestExt::map_response`] and [`RequestExt::filter_response`],
//! and lift into a [`RequestDsl`] with [`RequestExt::wrap`] or [`From`].

use std::{fmt::Debug, sync::Arc};

use crate::{Body, DecodeError, Header, RawResponse, RequestDsl, Route};

/// A description of one outbound call whose successful outcome is a [`Response`](Request::Response).
///
/// # Examples
///
/// ```
/// use parley::{DecodeError, RawResponse, Request, Route};
///
/// #[derive(Debug)]
/// struct Ping;
///
/// impl Request for Ping {
///     type Response = String;
///
///     fn route(&self) -> Route {
///         Route::get("https://example.com/ping")
///     }
///
///     fn decode(&self, response: &RawResponse) -> Result<Option<String>, DecodeError> {
///         Ok(Some(response.text()))
///     }
/// }
/// ```
pub trait Request: Debug + Send + Sync + 'static {
    /// The type of a successfully decoded response.
    type Response: Send + 'static;

    /// The method and URI this request is sent to.
    fn route(&self) -> Route;

    /// The body sent with this request.
    fn body(&self) -> Body {
        Body::Empty
    }

    /// Extra headers sent with this request.
    fn headers(&self) -> Vec<Header> {
        Vec::new()
    }

    /// Whether the executor should attach its own credentials to this request.
    fn requires_auth(&self) -> bool {
        true
    }

    /// Decode a successful (`2xx`) response.
    ///
    /// Returning `Ok(None)` means the response was valid but carries no value for the caller,
    /// which is how [`filter_response`](RequestExt::filter_response) rejects a payload.
    fn decode(&self, response: &RawResponse) -> Result<Option<Self::Response>, DecodeError>;
}

impl<R: Request + ?Sized> Request for Arc<R> {
    type Response = R::Response;

    fn route(&self) -> Route {
        (**self).route()
    }

    fn body(&self) -> Body {
        (**self).body()
    }

    fn headers(&self) -> Vec<Header> {
        (**self).headers()
    }

    fn requires_auth(&self) -> bool {
        (**self).requires_auth()
    }

    fn decode(&self, response: &RawResponse) -> Result<Option<Self::Response>, DecodeError> {
        (**self).decode(response)
    }
}

/// Combinators available on every [`Request`].
pub trait RequestExt: Request + Sized {
    /// Transform the successful response of this request.
    fn map_response<B, F>(self, f: F) -> MapResponse<Self, F>
    where
        F: Fn(Self::Response) -> B + Send + Sync + 'static,
        B: Send + 'static,
    {
        MapResponse { request: self, f }
    }

    /// Discard successful responses which do not satisfy `predicate`. A discarded response is
    /// not an error: it simply produces no value.
    fn filter_response<P>(self, predicate: P) -> FilterResponse<Self, P>
    where
        P: Fn(&Self::Response) -> bool + Send + Sync + 'static,
    {
        FilterResponse {
            request: self,
            predicate,
        }
    }

    /// Lift this request into a one-step [`RequestDsl`].
    fn wrap(self) -> RequestDsl<Self::Response> {
        RequestDsl::wrap(self)
    }
}

impl<R: Request> RequestExt for R {}

/// A request whose response is transformed by a function; see [`RequestExt::map_response`].
#[derive(Derivative, Clone)]
#[derivative(Debug(bound = "R: Debug"))]
pub struct MapResponse<R, F> {
    request: R,
    #[derivative(Debug = "ignore")]
    f: F,
}

impl<R, F, B> Request for MapResponse<R, F>
where
    R: Request,
    F: Fn(R::Response) -> B + Send + Sync + 'static,
    B: Send + 'static,
{
    type Response = B;

    fn route(&self) -> Route {
        self.request.route()
    }

    fn body(&self) -> Body {
        self.request.body()
    }

    fn headers(&self) -> Vec<Header> {
        self.request.headers()
    }

    fn requires_auth(&self) -> bool {
        self.request.requires_auth()
    }

    fn decode(&self, response: &RawResponse) -> Result<Option<B>, DecodeError> {
        Ok(self.request.decode(response)?.map(&self.f))
    }
}

/// A request whose response is discarded unless it satisfies a predicate; see
/// [`RequestExt::filter_response`].
#[derive(Derivative, Clone)]
#[derivative(Debug(bound = "R: Debug"))]
pub struct FilterResponse<R, P> {
    request: R,
    #[derivative(Debug = "ignore")]
    predicate: P,
}

impl<R, P> Request for FilterResponse<R, P>
where
    R: Request,
    P: Fn(&R::Response) -> bool + Send + Sync + 'static,
{
    type Response = R::Response;

    fn route(&self) -> Route {
        self.request.route()
    }

    fn body(&self) -> Body {
        self.request.body()
    }

    fn headers(&self) -> Vec<Header> {
        self.request.headers()
    }

    fn requires_auth(&self) -> bool {
        self.request.requires_auth()
    }

    fn decode(&self, response: &RawResponse) -> Result<Option<R::Response>, DecodeError> {
        Ok(self
            .request
            .decode(response)?
            .filter(|value| (self.predicate)(value)))
    }
}

impl<R: Request> From<R> for RequestDsl<R::Response> {
    fn from(request: R) -> Self {
        RequestDsl::wrap(request)
    }
}
