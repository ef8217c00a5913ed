//! Example demonstrating custom retry decisions and backoff.
//!
//! This example shows how to:
//! - Write a retry decision as a type and as a closure
//! - Combine decisions with `FirstAbort`
//! - Pick a backoff strategy
//! - Tell aborted calls apart from exhausted ones
//!
//! Run with: `cargo run --example custom_retry_decision`

use http::StatusCode;
use jsonrest::retry::{AbortOnClientError, AbortOnStatus, FirstAbort};
use jsonrest::{BackoffStrategy, BoxError, Client, Error, ErrorKind, ResponseHead, RetryDecision};
use std::time::Duration;

/// Custom decision: give up as soon as the server says we are rate limited
/// for longer than we are willing to wait.
struct AbortOnLongRetryAfter {
    max_wait_secs: u64,
}

impl RetryDecision for AbortOnLongRetryAfter {
    fn decide(&self, head: Option<&ResponseHead>, _error: Option<&Error>) -> Option<BoxError> {
        let head = head?;
        if head.status != StatusCode::TOO_MANY_REQUESTS {
            return None;
        }

        let wait = head
            .headers
            .get("retry-after")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok())?;

        (wait > self.max_wait_secs)
            .then(|| format!("server asked us to wait {}s", wait).into())
    }
}

fn report(result: Result<jsonrest::Response<serde_json::Value>, Error>) {
    match result {
        Ok(response) => println!("Success! Attempts: {}", response.attempts),
        Err(e) if e.kind() == ErrorKind::Aborted => println!("Aborted: {}", e),
        Err(Error::AttemptsExhausted {
            attempts,
            last_error,
        }) => println!("Gave up after {} attempts: {}", attempts, last_error),
        Err(e) => println!("Failed: {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("jsonrest=info,custom_retry_decision=info")
        .init();

    println!("=== Example 1: Abort on any 4xx ===");
    let client = Client::builder()
        .base_uri("https://jsonplaceholder.typicode.com")
        .retry_decision(AbortOnClientError)
        .backoff(BackoffStrategy::Fixed {
            delay: Duration::from_millis(500),
        })
        .max_attempts(3)
        .build()?;

    report(client.get("/posts/999999").await);
    println!();

    println!("=== Example 2: Combining decisions ===");
    let decision = FirstAbort::new(vec![
        Box::new(AbortOnStatus::new([StatusCode::NOT_FOUND, StatusCode::GONE])),
        Box::new(AbortOnLongRetryAfter { max_wait_secs: 30 }),
    ]);

    let client = Client::builder()
        .base_uri("https://jsonplaceholder.typicode.com")
        .retry_decision(decision)
        .backoff(BackoffStrategy::Exponential {
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            jitter: true,
        })
        .build()?;

    report(client.get("/posts/1").await);
    println!();

    println!("=== Example 3: A closure as decision ===");
    // Only accept 200 OK; anything else, even another 2xx, aborts.
    let client = Client::builder()
        .base_uri("https://jsonplaceholder.typicode.com")
        .retry_decision(
            |head: Option<&ResponseHead>, _error: Option<&Error>| -> Option<BoxError> {
                match head {
                    Some(head) if head.status != StatusCode::OK => {
                        Some(format!("unexpected status {}", head.status).into())
                    }
                    _ => None,
                }
            },
        )
        .backoff(BackoffStrategy::Immediate)
        .build()?;

    report(client.get("/posts/1").await);

    Ok(())
}
