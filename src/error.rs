//! Error types for JSON/REST calls.
//!
//! Every failure a call can end with is a variant of [`Error`]. Callers that only care
//! about the broad category (for example "was this an abort, or did we run out of
//! attempts?") can use [`Error::kind`] instead of matching every variant.

use http::StatusCode;
use std::time::Duration;

/// A boxed, thread-safe error, used wherever a user-supplied strategy reports a failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The main error type for JSON/REST calls.
///
/// # Examples
///
/// ```no_run
/// use jsonrest::{Client, Error, ErrorKind};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .base_uri("https://api.example.com")
///     .build()?;
///
/// match client.get::<serde_json::Value>("/endpoint").await {
///     Ok(response) => println!("Success: {:?}", response.data),
///     Err(e) if e.kind() == ErrorKind::Aborted => eprintln!("Gave up for good: {}", e),
///     Err(Error::AttemptsExhausted { attempts, last_error }) => {
///         eprintln!("Still failing after {} attempts: {}", attempts, last_error);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request payload could not be encoded.
    #[error("Failed to encode request body: {0}")]
    Encode(#[source] BoxError),

    /// A request middleware rejected the request.
    #[error("Request middleware failed: {0}")]
    Middleware(#[source] BoxError),

    /// The base URI joined with the request path is not a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A network-level error reported by `reqwest` (connection refused, DNS, broken body...).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A failure reported by a custom [`Transport`](crate::transport::Transport).
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    /// The attempt did not complete within the client's per-attempt timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The response body could not be decoded into the response type.
    ///
    /// The status is kept so that callers and retry decisions can still see it.
    #[error("Failed to decode response (status {status}): {source}")]
    Decode {
        /// The HTTP status code of the response
        status: StatusCode,
        /// The decoder's error
        source: BoxError,
    },

    /// The retry decision rejected an attempt's outcome.
    ///
    /// This is terminal: retrying at a higher layer will most likely fail the same way.
    #[error("Request aborted: {source}")]
    Aborted {
        /// The HTTP status of the rejected attempt, if a response was received
        status: Option<StatusCode>,
        /// The error returned by the retry decision
        source: BoxError,
    },

    /// Every attempt failed while the retry decision kept asking for another one.
    #[error("Gave up after {attempts} attempts: {last_error}")]
    AttemptsExhausted {
        /// The number of attempts made
        attempts: u32,
        /// The error of the final attempt
        last_error: Box<Error>,
    },

    /// The caller's cancellation token fired.
    #[error("Request cancelled")]
    Cancelled,

    /// Invalid configuration was provided.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// The broad category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request could not be built (encoding, middleware, URL).
    RequestBuild,
    /// The request could not be sent or the response could not be received.
    Transport,
    /// The response body was present but could not be decoded.
    Decode,
    /// The retry decision aborted the call.
    Aborted,
    /// The attempt budget was consumed.
    Exhausted,
    /// The caller cancelled the call.
    Cancelled,
    /// The client was misconfigured.
    Configuration,
}

impl Error {
    /// Returns the broad category of this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use jsonrest::{Error, ErrorKind};
    ///
    /// assert_eq!(Error::Cancelled.kind(), ErrorKind::Cancelled);
    /// assert_eq!(
    ///     Error::Timeout(std::time::Duration::from_secs(1)).kind(),
    ///     ErrorKind::Transport
    /// );
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Encode(_) | Error::Middleware(_) | Error::InvalidUrl(_) => {
                ErrorKind::RequestBuild
            }
            Error::Network(_) | Error::Transport(_) | Error::Timeout(_) => ErrorKind::Transport,
            Error::Decode { .. } => ErrorKind::Decode,
            Error::Aborted { .. } => ErrorKind::Aborted,
            Error::AttemptsExhausted { .. } => ErrorKind::Exhausted,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::ConfigurationError(_) => ErrorKind::Configuration,
        }
    }

    /// Returns `true` if the retry decision aborted the call.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted { .. })
    }

    /// Returns `true` if the call ran out of attempts.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Error::AttemptsExhausted { .. })
    }

    /// Returns `true` if the caller cancelled the call.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Returns the HTTP status code associated with this error, if any.
    ///
    /// For [`Error::AttemptsExhausted`] this is the status of the final attempt.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Decode { status, .. } => Some(*status),
            Error::Aborted { status, .. } => *status,
            Error::Network(e) => e.status(),
            Error::AttemptsExhausted { last_error, .. } => last_error.status(),
            _ => None,
        }
    }
}

/// A specialized `Result` type for JSON/REST calls.
///
/// This is a convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(Error::Encode("bad".into()).kind(), ErrorKind::RequestBuild);
        assert_eq!(Error::Middleware("bad".into()).kind(), ErrorKind::RequestBuild);
        assert_eq!(Error::Transport("down".into()).kind(), ErrorKind::Transport);
        assert_eq!(
            Error::Decode {
                status: StatusCode::OK,
                source: "eof".into(),
            }
            .kind(),
            ErrorKind::Decode
        );
        assert_eq!(
            Error::ConfigurationError("nope".to_string()).kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn test_abort_and_exhausted_are_distinct() {
        let aborted = Error::Aborted {
            status: Some(StatusCode::BAD_REQUEST),
            source: "400 Bad Request".into(),
        };
        let exhausted = Error::AttemptsExhausted {
            attempts: 3,
            last_error: Box::new(Error::Timeout(Duration::from_millis(10))),
        };

        assert!(aborted.is_aborted());
        assert!(!aborted.is_exhausted());
        assert!(exhausted.is_exhausted());
        assert!(!exhausted.is_aborted());
        assert_eq!(aborted.kind(), ErrorKind::Aborted);
        assert_eq!(exhausted.kind(), ErrorKind::Exhausted);
    }

    #[test]
    fn test_status_is_carried() {
        let decode = Error::Decode {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            source: "expected value".into(),
        };
        assert_eq!(decode.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));

        let exhausted = Error::AttemptsExhausted {
            attempts: 2,
            last_error: Box::new(decode),
        };
        assert_eq!(exhausted.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));

        assert_eq!(Error::Cancelled.status(), None);
    }

    #[test]
    fn test_display() {
        let err = Error::AttemptsExhausted {
            attempts: 5,
            last_error: Box::new(Error::Cancelled),
        };
        assert_eq!(err.to_string(), "Gave up after 5 attempts: Request cancelled");
    }
}
