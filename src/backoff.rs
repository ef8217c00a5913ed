//! The backoff collaborator that schedules attempts.
//!
//! A client never loops or sleeps on its own. It hands an attempt function to a
//! [`Backoff`], which calls it once per attempt, waits between attempts, and reports how
//! the sequence ended. [`BackoffStrategy`] is the stock implementation.

use crate::Error;
use futures::future::{BoxFuture, FutureExt};
use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Why an attempt did not succeed.
#[derive(Debug)]
pub enum AttemptError {
    /// The attempt failed and may be retried.
    Retry(Error),
    /// The attempt failed and the sequence must stop with this error.
    Abort(Error),
}

/// How an attempt sequence ended without success.
#[derive(thiserror::Error, Debug)]
pub enum BackoffError {
    /// An attempt returned [`AttemptError::Abort`].
    #[error("aborted: {0}")]
    Aborted(Error),

    /// The attempt budget was consumed by retryable failures.
    #[error("exhausted after {attempts} attempts: {last_error}")]
    Exhausted {
        /// The number of attempts made
        attempts: u32,
        /// The error of the final attempt
        last_error: Error,
    },

    /// The cancellation token fired while waiting between attempts.
    #[error("cancelled")]
    Cancelled,
}

/// The future of a single attempt.
pub type AttemptFuture<'a> = BoxFuture<'a, Result<(), AttemptError>>;

/// The function a [`Backoff`] calls once per attempt, with the 1-based attempt number.
pub type AttemptFn<'a> = dyn FnMut(u32) -> AttemptFuture<'a> + Send + 'a;

/// Runs an attempt function until it succeeds, aborts, or runs out of attempts.
///
/// Implementations must call `attempt` strictly sequentially, at most `max_attempts`
/// times, and must stop waiting as soon as `cancel` fires.
pub trait Backoff: Send + Sync {
    /// Runs the attempt sequence.
    fn run<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        attempt: &'a mut AttemptFn<'a>,
        max_attempts: u32,
    ) -> BoxFuture<'a, Result<(), BackoffError>>;
}

/// Defines how long to wait between attempts.
///
/// # Examples
///
/// ```
/// use jsonrest::BackoffStrategy;
/// use std::time::Duration;
///
/// // No waiting at all
/// let immediate = BackoffStrategy::Immediate;
///
/// // Exponential backoff: 100ms, 200ms, 400ms, 800ms...
/// let exponential = BackoffStrategy::Exponential {
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(30),
///     jitter: true,
/// };
///
/// // Fixed delay: 1s, 1s, 1s...
/// let fixed = BackoffStrategy::Fixed {
///     delay: Duration::from_secs(1),
/// };
/// ```
#[derive(Debug, Clone)]
pub enum BackoffStrategy {
    /// Retry without waiting.
    Immediate,

    /// Wait the same delay after every failed attempt.
    Fixed {
        /// The delay between attempts.
        delay: Duration,
    },

    /// Wait exponentially increasing delays.
    ///
    /// The wait after attempt `n` is `initial_delay * 2^(n - 1)`, capped at `max_delay`.
    /// Jitter scales each delay by a random factor between 50% and 100%.
    Exponential {
        /// The delay after the first failed attempt.
        initial_delay: Duration,
        /// The maximum delay between attempts.
        max_delay: Duration,
        /// Whether to add random jitter to delays (recommended).
        jitter: bool,
    },

    /// Custom delays.
    Custom {
        /// Takes the number of the attempt that just failed (1-indexed) and returns the
        /// delay before the next one.
        delay_fn: fn(attempt: u32) -> Duration,
    },
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        BackoffStrategy::Exponential {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl BackoffStrategy {
    /// Returns the delay to wait after the given failed attempt.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt that just failed (1-indexed)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self {
            BackoffStrategy::Immediate => Duration::ZERO,
            BackoffStrategy::Fixed { delay } => *delay,
            BackoffStrategy::Exponential {
                initial_delay,
                max_delay,
                jitter,
            } => {
                let multiplier = 2u32.saturating_pow(attempt.saturating_sub(1));
                let delay = initial_delay.saturating_mul(multiplier).min(*max_delay);

                if *jitter {
                    let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
                    delay.mul_f64(jitter_factor)
                } else {
                    delay
                }
            }
            BackoffStrategy::Custom { delay_fn } => delay_fn(attempt),
        }
    }
}

impl Backoff for BackoffStrategy {
    fn run<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        attempt: &'a mut AttemptFn<'a>,
        max_attempts: u32,
    ) -> BoxFuture<'a, Result<(), BackoffError>> {
        async move {
            let mut current = 1;

            loop {
                let error = match attempt(current).await {
                    Ok(()) => return Ok(()),
                    Err(AttemptError::Abort(error)) => return Err(BackoffError::Aborted(error)),
                    Err(AttemptError::Retry(error)) => error,
                };

                if current >= max_attempts {
                    return Err(BackoffError::Exhausted {
                        attempts: current,
                        last_error: error,
                    });
                }

                let delay = self.delay_after(current);
                if !delay.is_zero() {
                    tracing::info!(
                        delay_ms = delay.as_millis(),
                        attempt = current,
                        "Retrying request after delay"
                    );
                }

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(BackoffError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }

                current += 1;
            }
        }
        .boxed()
    }
}
