//! The information an executor needs to route a [`Request`](crate::Request), and the raw shape
//! of what comes back.

use bytes::Bytes;
use std::{fmt, time::Duration};

#[cfg(feature = "json")]
use crate::DecodeError;

/// An HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl Method {
    /// The canonical upper-case name of this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a request goes: a method and an absolute URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    method: Method,
    uri: String,
}

impl Route {
    /// Construct a new route.
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Route {
            method,
            uri: uri.into(),
        }
    }

    /// Shorthand for a `GET` route.
    pub fn get(uri: impl Into<String>) -> Self {
        Route::new(Method::Get, uri)
    }

    /// Shorthand for a `POST` route.
    pub fn post(uri: impl Into<String>) -> Self {
        Route::new(Method::Post, uri)
    }

    /// Shorthand for a `DELETE` route.
    pub fn delete(uri: impl Into<String>) -> Self {
        Route::new(Method::Delete, uri)
    }

    /// The method of this route.
    pub fn method(&self) -> Method {
        self.method
    }

    /// The absolute URI of this route.
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.uri)
    }
}

/// The body of an outgoing request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Body {
    /// No body at all.
    Empty,
    /// A JSON document.
    Json(String),
    /// An `application/x-www-form-urlencoded` string.
    Form(String),
}

impl Body {
    /// The `Content-Type` this body should be sent with, if any.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Body::Empty => None,
            Body::Json(_) => Some("application/json"),
            Body::Form(_) => Some("application/x-www-form-urlencoded"),
        }
    }

    /// The encoded bytes of this body.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Body::Empty => Bytes::new(),
            Body::Json(s) | Body::Form(s) => Bytes::copy_from_slice(s.as_bytes()),
        }
    }

    /// Serialize any value as a JSON body.
    #[cfg(feature = "json")]
    #[cfg_attr(docsrs, doc(cfg(feature = "json")))]
    pub fn json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Body, serde_json::Error> {
        serde_json::to_string(value).map(Body::Json)
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::Empty
    }
}

/// An extra header attached to a request, such as an `Authorization` override.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Header {
    /// The header name.
    pub name: &'static str,
    /// The header value.
    pub value: String,
}

impl Header {
    /// Construct a new header.
    pub fn new(name: &'static str, value: impl Into<String>) -> Self {
        Header {
            name,
            value: value.into(),
        }
    }
}

/// The status, headers, and body received from the remote service for one request, before it is
/// decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl RawResponse {
    /// Construct a response with the given status and body, and no headers.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        RawResponse {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Shorthand for a `200 OK` response.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        RawResponse::new(200, body)
    }

    /// Add a header to this response.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// The HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Whether the status code is in the `2xx` range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The raw body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The body as UTF-8 text, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The delay requested by a `retry-after` header, in (possibly fractional) seconds.
    pub fn retry_after(&self) -> Option<Duration> {
        let seconds: f64 = self.header("retry-after")?.trim().parse().ok()?;
        // Negative, non-finite, and out-of-range delays are all ignored.
        Duration::try_from_secs_f64(seconds).ok()
    }

    /// Whether an `x-ratelimit-global` header marks this as a global rate limit.
    pub fn is_global_rate_limit(&self) -> bool {
        self.header("x-ratelimit-global")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

/// Decode a JSON response body.
#[cfg(feature = "json")]
#[cfg_attr(docsrs, doc(cfg(feature = "json")))]
pub fn decode_json<T: serde::de::DeserializeOwned>(
    response: &RawResponse,
) -> Result<T, DecodeError> {
    Ok(serde_json::from_slice(response.body())?)
}
