//! Retry decisions.
//!
//! After every attempt, the client hands the attempt's outcome to a [`RetryDecision`]:
//! the response head (if a response was received) and the error (if the attempt failed).
//! Returning `None` asks for another attempt; returning `Some(error)` aborts the call with
//! [`Error::Aborted`](crate::Error::Aborted) carrying that error.
//!
//! A successful attempt is passed through the decision too, so a decision can reject a
//! response whose status is unacceptable even though it decoded fine. Cancellation never
//! reaches the decision.

use crate::{BoxError, Error, ResponseHead};
use http::StatusCode;

/// Decides whether a call continues after an attempt.
///
/// Implemented for any `Fn(Option<&ResponseHead>, Option<&Error>) -> Option<BoxError>`.
///
/// # Examples
///
/// ```
/// use jsonrest::{BoxError, Error, ResponseHead, RetryDecision};
///
/// /// Give up on authentication failures, keep retrying everything else.
/// struct AbortOnUnauthorized;
///
/// impl RetryDecision for AbortOnUnauthorized {
///     fn decide(&self, head: Option<&ResponseHead>, _error: Option<&Error>) -> Option<BoxError> {
///         match head {
///             Some(head) if head.status.as_u16() == 401 => Some("not authorized".into()),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait RetryDecision: Send + Sync {
    /// Returns `None` to continue, or the error to abort with.
    ///
    /// # Arguments
    ///
    /// * `head` - The status and headers of the attempt's response, if one was received
    /// * `error` - The attempt's error, or `None` if it produced a response
    fn decide(&self, head: Option<&ResponseHead>, error: Option<&Error>) -> Option<BoxError>;
}

impl<F> RetryDecision for F
where
    F: Fn(Option<&ResponseHead>, Option<&Error>) -> Option<BoxError> + Send + Sync,
{
    fn decide(&self, head: Option<&ResponseHead>, error: Option<&Error>) -> Option<BoxError> {
        self(head, error)
    }
}

/// The error a stock decision aborts with: the rejected HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{status}")]
pub struct StatusError {
    /// The rejected status.
    pub status: StatusCode,
}

impl StatusError {
    fn boxed(status: StatusCode) -> BoxError {
        Box::new(StatusError { status })
    }
}

/// The default decision: abort on `400 Bad Request`, retry everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortOnBadRequest;

impl RetryDecision for AbortOnBadRequest {
    fn decide(&self, head: Option<&ResponseHead>, _error: Option<&Error>) -> Option<BoxError> {
        match head {
            Some(head) if head.status == StatusCode::BAD_REQUEST => {
                Some(StatusError::boxed(head.status))
            }
            _ => None,
        }
    }
}

/// Never abort; retry until the attempt budget is consumed.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetry;

impl RetryDecision for AlwaysRetry {
    fn decide(&self, _head: Option<&ResponseHead>, _error: Option<&Error>) -> Option<BoxError> {
        None
    }
}

/// Abort on any of the listed statuses.
#[derive(Debug, Clone)]
pub struct AbortOnStatus {
    statuses: Vec<StatusCode>,
}

impl AbortOnStatus {
    /// Creates a decision that aborts on any of `statuses`.
    pub fn new(statuses: impl IntoIterator<Item = StatusCode>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
        }
    }
}

impl RetryDecision for AbortOnStatus {
    fn decide(&self, head: Option<&ResponseHead>, _error: Option<&Error>) -> Option<BoxError> {
        let head = head?;
        self.statuses
            .contains(&head.status)
            .then(|| StatusError::boxed(head.status))
    }
}

/// Abort on any 4xx status.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortOnClientError;

impl RetryDecision for AbortOnClientError {
    fn decide(&self, head: Option<&ResponseHead>, _error: Option<&Error>) -> Option<BoxError> {
        let head = head?;
        head.status
            .is_client_error()
            .then(|| StatusError::boxed(head.status))
    }
}

/// Combine decisions: the first one that aborts wins.
///
/// # Examples
///
/// ```
/// use jsonrest::retry::{AbortOnBadRequest, AbortOnStatus, FirstAbort};
/// use http::StatusCode;
///
/// let decision = FirstAbort::new(vec![
///     Box::new(AbortOnBadRequest),
///     Box::new(AbortOnStatus::new([StatusCode::NOT_FOUND, StatusCode::CONFLICT])),
/// ]);
/// ```
pub struct FirstAbort {
    decisions: Vec<Box<dyn RetryDecision>>,
}

impl FirstAbort {
    /// Creates a new `FirstAbort` from a list of decisions.
    pub fn new(decisions: Vec<Box<dyn RetryDecision>>) -> Self {
        Self { decisions }
    }
}

impl RetryDecision for FirstAbort {
    fn decide(&self, head: Option<&ResponseHead>, error: Option<&Error>) -> Option<BoxError> {
        self.decisions
            .iter()
            .find_map(|decision| decision.decide(head, error))
    }
}
