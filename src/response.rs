//! Response wrapper that keeps the decoded data together with the HTTP details.
//!
//! The [`Response`] type wraps the decoded response data along with metadata about the
//! HTTP exchange. [`ResponseHead`] is the part of a response that a
//! [`RetryDecision`](crate::RetryDecision) gets to inspect.

use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// A successfully executed JSON/REST call.
///
/// # Type Parameters
///
/// * `T` - The type of the decoded response data
///
/// # Examples
///
/// ```no_run
/// use jsonrest::Client;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, Default)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), jsonrest::Error> {
/// let client = Client::builder()
///     .base_uri("https://api.example.com")
///     .build()?;
///
/// let response = client.get::<User>("/users/123").await?;
///
/// println!("User: {}", response.data.name);
/// println!("Status: {} {}", response.status.as_u16(), response.status_text);
/// println!("Took {:?} over {} attempts", response.latency, response.attempts);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The decoded response data.
    ///
    /// This is `T::default()` if the status was `204 No Content`, or if the request
    /// ignores the response body.
    pub data: T,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The canonical reason phrase of the status, or an empty string for unknown codes.
    pub status_text: String,

    /// The response headers.
    pub headers: HeaderMap,

    /// Time from the start of the call until this response was interpreted,
    /// including failed attempts and backoff delays.
    pub latency: Duration,

    /// The attempt that produced this response (1-based).
    pub attempts: u32,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(
        data: T,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        attempts: u32,
    ) -> Self {
        Self {
            data,
            status,
            status_text: status_text(status),
            headers,
            latency,
            attempts,
        }
    }

    /// Maps the response data to a different type, keeping the metadata.
    ///
    /// # Examples
    ///
    /// ```
    /// # use jsonrest::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response::new(42, StatusCode::OK, HeaderMap::new(), Duration::ZERO, 1);
    ///
    /// let string_response = response.map(|n| n.to_string());
    /// assert_eq!(string_response.data, "42");
    /// assert_eq!(string_response.status_text, "OK");
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            status: self.status,
            status_text: self.status_text,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Returns `true` if the call needed more than one attempt.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

/// Status line and headers of a received response, before its body is interpreted.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
}

impl ResponseHead {
    /// Creates a new `ResponseHead`.
    pub fn new(status: StatusCode, headers: HeaderMap) -> Self {
        Self { status, headers }
    }

    /// The canonical reason phrase of the status.
    pub fn status_text(&self) -> String {
        status_text(self.status)
    }
}

fn status_text(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_was_retried() {
        let first = Response::new((), StatusCode::OK, HeaderMap::new(), Duration::ZERO, 1);
        let third = Response::new((), StatusCode::OK, HeaderMap::new(), Duration::ZERO, 3);
        assert!(!first.was_retried());
        assert!(third.was_retried());
    }

    #[test]
    fn test_header_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let response = Response::new((), StatusCode::OK, headers, Duration::ZERO, 1);
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.header("x-missing"), None);
    }

    #[test]
    fn test_status_text() {
        let response = Response::new(
            (),
            StatusCode::NO_CONTENT,
            HeaderMap::new(),
            Duration::ZERO,
            1,
        );
        assert_eq!(response.status_text, "No Content");

        let unknown = ResponseHead::new(StatusCode::from_u16(599).unwrap(), HeaderMap::new());
        assert_eq!(unknown.status_text(), "");
    }

    #[test]
    fn test_deref_to_data() {
        let response = Response::new(
            vec![1, 2, 3],
            StatusCode::OK,
            HeaderMap::new(),
            Duration::ZERO,
            1,
        );
        assert_eq!(response.len(), 3);
        assert_eq!(response.as_ref(), &vec![1, 2, 3]);
    }
}
