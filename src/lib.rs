//! # jsonrest - typed JSON/REST calls with a bounded retry protocol
//!
//! `jsonrest` turns a typed request value into an HTTP call, runs it under a bounded
//! retry policy, and decodes a typed response. It is built on top of `reqwest`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use http::Method;
//! use jsonrest::{Client, Request};
//! use serde::{Deserialize, Serialize};
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Serialize)]
//! struct Echo {
//!     message: String,
//! }
//!
//! #[derive(Deserialize, Default)]
//! struct Reply {
//!     reply: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), jsonrest::Error> {
//!     let client = Client::builder()
//!         .base_uri("https://api.example.com")
//!         .build()?;
//!
//!     // Requests are immutable and can be executed any number of times.
//!     let echo: Request<Echo, Reply> = Request::new(
//!         "/echo",
//!         Method::POST,
//!         Echo { message: "Hello, server!".to_string() },
//!     );
//!
//!     let cancel = CancellationToken::new();
//!     let response = client.execute(&cancel, &echo).await?;
//!     println!("{} ({})", response.data.reply, response.status);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## How a call runs
//!
//! Each attempt encodes the payload, builds the request (base URI + path, JSON
//! `Content-Type`/`Accept` headers, then every [`Middleware`] in order), and sends it under
//! the client's per-attempt timeout. The response is decoded unless the status is
//! `204 No Content` or the request ignores its response body.
//!
//! The outcome, a response, an error, or both when decoding failed, is handed to the
//! client's [`RetryDecision`]. Returning `None` asks for another attempt, scheduled by the
//! client's [`Backoff`]. Returning an error aborts the call.
//!
//! A call ends in exactly one of:
//!
//! - `Ok(Response)`: an attempt succeeded and the retry decision accepted it
//! - [`Error::Aborted`]: the retry decision rejected an attempt
//! - [`Error::AttemptsExhausted`]: every allowed attempt failed
//! - [`Error::Cancelled`]: the caller's cancellation token fired
//!
//! ## Errors that abort
//!
//! ```no_run
//! use jsonrest::{Client, Error, ErrorKind};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::builder().base_uri("https://api.example.com").build()?;
//! match client.get::<serde_json::Value>("/endpoint").await {
//!     Ok(response) => println!("Success: {:?}", response.data),
//!     // The default retry decision aborts on 400 Bad Request.
//!     Err(e) if e.kind() == ErrorKind::Aborted => eprintln!("Rejected: {}", e),
//!     Err(e) if e.kind() == ErrorKind::Exhausted => eprintln!("Still failing: {}", e),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

pub mod backoff;
mod client;
pub mod codec;
mod error;
pub mod middleware;
mod request;
mod response;
pub mod retry;
pub mod transport;

pub use backoff::{Backoff, BackoffStrategy};
pub use client::{Client, ClientBuilder};
pub use error::{BoxError, Error, ErrorKind, Result};
pub use middleware::{BasicAuth, BearerAuth, Middleware};
pub use request::{NoBody, Request};
pub use response::{Response, ResponseHead};
pub use retry::RetryDecision;
