//! JSON/REST client with a bounded retry protocol.
//!
//! The [`Client`] type is the main entry point for executing [`Request`]s.
//! Use [`ClientBuilder`] to configure and create clients.

use crate::{
    backoff::{AttemptError, Backoff, BackoffError, BackoffStrategy},
    middleware::Middleware,
    request::NoBody,
    retry::{AbortOnBadRequest, RetryDecision},
    transport::Transport,
    Error, Request, Response, ResponseHead, Result,
};
use futures::future::FutureExt;
use http::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use http::{Method, StatusCode};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use url::Url;

const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";
const JSON_ACCEPT: &str = "application/json";

/// A client for JSON/REST HTTP services.
///
/// The client is designed to be built once and shared. Cloning is cheap, and executing
/// requests only reads the configuration, so any number of calls can run concurrently on
/// clones of the same client, with the same [`Request`] or different ones.
///
/// # Examples
///
/// ```no_run
/// use http::Method;
/// use jsonrest::{BackoffStrategy, BearerAuth, Client, Request};
/// use serde::{Deserialize, Serialize};
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Serialize)]
/// struct CreateUser {
///     name: String,
/// }
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
///     .timeout(Duration::from_secs(10))
///     .max_attempts(3)
///     .backoff(BackoffStrategy::Fixed { delay: Duration::from_millis(250) })
///     .middleware(BearerAuth::new("my-token"))
///     .build()?;
///
/// let create: Request<CreateUser, User> = Request::new(
///     "/users",
///     Method::POST,
///     CreateUser { name: "Alice".to_string() },
/// );
///
/// let cancel = CancellationToken::new();
/// let created = client.execute(&cancel, &create).await?;
/// println!("Created user with ID: {}", created.data.id);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

#[derive(Clone)]
struct ClientInner {
    transport: Arc<dyn Transport>,
    base_uri: String,
    middlewares: Vec<Arc<dyn Middleware>>,
    timeout: Duration,
    max_attempts: u32,
    retry_decision: Arc<dyn RetryDecision>,
    backoff: Arc<dyn Backoff>,
    span: Option<tracing::Span>,
}

/// What one attempt produced: the response head if a response arrived, and either the
/// interpreted response or the failure.
struct AttemptOutcome<Res> {
    head: Option<ResponseHead>,
    result: Result<Response<Res>>,
}

impl<Res> AttemptOutcome<Res> {
    fn failed(error: Error) -> Self {
        Self {
            head: None,
            result: Err(error),
        }
    }
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the default HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        ClientBuilder::new().build()
    }

    /// Appends a middleware to this client.
    ///
    /// Calls already borrowing this client cannot be running, and clones made earlier
    /// keep the middleware list they were created with.
    pub fn add_middleware(&mut self, middleware: impl Middleware + 'static) {
        Arc::make_mut(&mut self.inner)
            .middlewares
            .push(Arc::new(middleware));
    }

    /// The base URI prepended to every request path.
    pub fn base_uri(&self) -> &str {
        &self.inner.base_uri
    }

    /// The per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// The maximum number of attempts per call.
    pub fn max_attempts(&self) -> u32 {
        self.inner.max_attempts
    }

    /// Executes `request`, retrying according to the client's retry decision and backoff.
    ///
    /// Every attempt builds the request afresh (encode, default headers, middlewares),
    /// sends it under the per-attempt timeout and interprets the response:
    ///
    /// * `204 No Content`, or a request that ignores its response body, yields
    ///   `Res::default()` without decoding.
    /// * Anything else is decoded with the request's decoder, whatever the status.
    ///
    /// The outcome then goes to the retry decision, which either aborts the call
    /// ([`Error::Aborted`]) or lets it continue. A successful outcome the decision accepts
    /// ends the call; a failed one is retried until the attempt budget is consumed
    /// ([`Error::AttemptsExhausted`]).
    ///
    /// If `cancel` fires during an attempt or a backoff delay, the call stops with
    /// [`Error::Cancelled`] without consulting the retry decision.
    pub async fn execute<Req, Res>(
        &self,
        cancel: &CancellationToken,
        request: &Request<Req, Res>,
    ) -> Result<Response<Res>>
    where
        Req: Sync,
        Res: Default + Send,
    {
        match &self.inner.span {
            Some(span) => self.run(cancel, request).instrument(span.clone()).await,
            None => self.run(cancel, request).await,
        }
    }

    /// Executes `request` without a way to cancel it.
    pub async fn send<Req, Res>(&self, request: &Request<Req, Res>) -> Result<Response<Res>>
    where
        Req: Sync,
        Res: Default + Send,
    {
        self.execute(&CancellationToken::new(), request).await
    }

    /// Makes a GET request to the specified path and decodes the JSON response.
    pub async fn get<Res>(&self, path: impl Into<String>) -> Result<Response<Res>>
    where
        Res: DeserializeOwned + Default + Send + 'static,
    {
        self.send(&Request::<NoBody, Res>::without_body(path, Method::GET))
            .await
    }

    /// Makes a POST request to the specified path with a JSON body.
    pub async fn post<Req, Res>(&self, path: impl Into<String>, body: Req) -> Result<Response<Res>>
    where
        Req: Serialize + Sync + 'static,
        Res: DeserializeOwned + Default + Send + 'static,
    {
        self.send(&Request::new(path, Method::POST, body)).await
    }

    /// Makes a PUT request to the specified path with a JSON body.
    pub async fn put<Req, Res>(&self, path: impl Into<String>, body: Req) -> Result<Response<Res>>
    where
        Req: Serialize + Sync + 'static,
        Res: DeserializeOwned + Default + Send + 'static,
    {
        self.send(&Request::new(path, Method::PUT, body)).await
    }

    /// Makes a PATCH request to the specified path with a JSON body.
    pub async fn patch<Req, Res>(
        &self,
        path: impl Into<String>,
        body: Req,
    ) -> Result<Response<Res>>
    where
        Req: Serialize + Sync + 'static,
        Res: DeserializeOwned + Default + Send + 'static,
    {
        self.send(&Request::new(path, Method::PATCH, body)).await
    }

    /// Makes a DELETE request to the specified path.
    pub async fn delete<Res>(&self, path: impl Into<String>) -> Result<Response<Res>>
    where
        Res: DeserializeOwned + Default + Send + 'static,
    {
        self.send(&Request::<NoBody, Res>::without_body(path, Method::DELETE))
            .await
    }

    async fn run<Req, Res>(
        &self,
        cancel: &CancellationToken,
        request: &Request<Req, Res>,
    ) -> Result<Response<Res>>
    where
        Req: Sync,
        Res: Default + Send,
    {
        let started = Instant::now();
        let success = Mutex::new(None);
        let slot = &success;

        let mut attempt_fn = move |attempt: u32| {
            async move {
                let outcome = self.attempt(cancel, request, attempt, started).await;
                self.settle(outcome, slot, attempt)
            }
            .boxed()
        };

        let result = self
            .inner
            .backoff
            .run(cancel, &mut attempt_fn, self.inner.max_attempts)
            .await;

        match result {
            Ok(()) => success.lock().take().ok_or_else(|| {
                Error::ConfigurationError(
                    "backoff finished without a successful attempt".to_string(),
                )
            }),
            Err(BackoffError::Aborted(error)) => Err(error),
            Err(BackoffError::Exhausted {
                attempts,
                last_error,
            }) => {
                tracing::warn!(
                    attempts = attempts,
                    error = %last_error,
                    method = %request.method(),
                    path = %request.path(),
                    "Giving up, attempts exhausted"
                );
                Err(Error::AttemptsExhausted {
                    attempts,
                    last_error: Box::new(last_error),
                })
            }
            Err(BackoffError::Cancelled) => Err(Error::Cancelled),
        }
    }

    /// Applies the retry protocol to one attempt's outcome.
    fn settle<Res>(
        &self,
        outcome: AttemptOutcome<Res>,
        slot: &Mutex<Option<Response<Res>>>,
        attempt: u32,
    ) -> std::result::Result<(), AttemptError> {
        if let Err(Error::Cancelled) = outcome.result {
            tracing::info!(attempt = attempt, "Request cancelled");
            return Err(AttemptError::Abort(Error::Cancelled));
        }

        let verdict = self
            .inner
            .retry_decision
            .decide(outcome.head.as_ref(), outcome.result.as_ref().err());

        if let Some(reason) = verdict {
            tracing::warn!(
                attempt = attempt,
                reason = %reason,
                "Retry decision aborted request"
            );
            return Err(AttemptError::Abort(Error::Aborted {
                status: outcome.head.map(|head| head.status),
                source: reason,
            }));
        }

        match outcome.result {
            Ok(response) => {
                *slot.lock() = Some(response);
                Ok(())
            }
            Err(error) => {
                tracing::warn!(error = %error, attempt = attempt, "Request attempt failed");
                Err(AttemptError::Retry(error))
            }
        }
    }

    /// Performs exactly one round trip.
    async fn attempt<Req, Res>(
        &self,
        cancel: &CancellationToken,
        request: &Request<Req, Res>,
        attempt: u32,
        started: Instant,
    ) -> AttemptOutcome<Res>
    where
        Res: Default,
    {
        let http_request = match self.build_request(request) {
            Ok(http_request) => http_request,
            Err(error) => return AttemptOutcome::failed(error),
        };

        let timeout = self.inner.timeout;
        let exchange = async {
            tracing::info!(
                method = %http_request.method(),
                uri = %http_request.url(),
                attempt = attempt,
                "Executing HTTP request"
            );

            match self.inner.transport.send(http_request).await {
                Ok(response) => self.interpret(request, response, attempt, started).await,
                Err(error) => AttemptOutcome::failed(error),
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => AttemptOutcome::failed(Error::Cancelled),
            outcome = tokio::time::timeout(timeout, exchange) => {
                outcome.unwrap_or_else(|_| AttemptOutcome::failed(Error::Timeout(timeout)))
            }
        }
    }

    /// Builds the HTTP request for one attempt.
    fn build_request<Req, Res>(&self, request: &Request<Req, Res>) -> Result<reqwest::Request> {
        let body = request.encode_body()?;

        let url = Url::parse(&format!("{}{}", self.inner.base_uri, request.path()))?;
        let mut http_request = reqwest::Request::new(request.method().clone(), url);

        if let Some(body) = body {
            *http_request.body_mut() = Some(body.into());
        }

        let headers = http_request.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_ACCEPT));

        for middleware in &self.inner.middlewares {
            middleware
                .apply(&mut http_request)
                .map_err(Error::Middleware)?;
        }

        tracing::debug!(
            method = %http_request.method(),
            uri = %http_request.url(),
            has_body = http_request.body().is_some(),
            "Built HTTP request"
        );

        Ok(http_request)
    }

    /// Reads the response body and turns it into a typed response.
    async fn interpret<Req, Res>(
        &self,
        request: &Request<Req, Res>,
        response: reqwest::Response,
        attempt: u32,
        started: Instant,
    ) -> AttemptOutcome<Res>
    where
        Res: Default,
    {
        let head = ResponseHead::new(response.status(), response.headers().clone());

        tracing::info!(
            status = head.status.as_u16(),
            latency_ms = started.elapsed().as_millis(),
            attempt = attempt,
            "Received HTTP response"
        );

        let result = match response.bytes().await {
            Ok(body) => decode_body(request, head.status, &body),
            Err(error) => Err(Error::Network(error)),
        }
        .map(|data| {
            Response::new(
                data,
                head.status,
                head.headers.clone(),
                started.elapsed(),
                attempt,
            )
        });

        AttemptOutcome {
            head: Some(head),
            result,
        }
    }
}

/// Decodes an already drained body according to the request's response strategy.
fn decode_body<Req, Res>(request: &Request<Req, Res>, status: StatusCode, body: &[u8]) -> Result<Res>
where
    Res: Default,
{
    if status == StatusCode::NO_CONTENT {
        return Ok(Res::default());
    }

    let Some(decoder) = request.decoder() else {
        return Ok(Res::default());
    };

    decoder.decode(body).map_err(|source| {
        tracing::error!(
            error = %source,
            status = status.as_u16(),
            raw_response = %String::from_utf8_lossy(body),
            "Failed to decode response"
        );
        Error::Decode { status, source }
    })
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_uri", &self.inner.base_uri)
            .field("timeout", &self.inner.timeout)
            .field("max_attempts", &self.inner.max_attempts)
            .field("middlewares", &self.inner.middlewares.len())
            .finish()
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// Every setting has a default:
///
/// | Setting | Default |
/// |---|---|
/// | transport | a new `reqwest::Client` |
/// | base URI | empty |
/// | middlewares | none |
/// | per-attempt timeout | 30 seconds |
/// | max attempts | 5 |
/// | retry decision | [`AbortOnBadRequest`] |
/// | backoff | [`BackoffStrategy::default()`] |
///
/// # Examples
///
/// ```no_run
/// use jsonrest::{BasicAuth, ClientBuilder};
/// use jsonrest::retry::AbortOnClientError;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), jsonrest::Error> {
/// let client = ClientBuilder::new()
///     .base_uri("https://api.example.com/v1")
///     .timeout(Duration::from_secs(5))
///     .max_attempts(4)
///     .retry_decision(AbortOnClientError)
///     .middleware(BasicAuth::new("login", "password"))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    base_uri: String,
    middlewares: Vec<Arc<dyn Middleware>>,
    timeout: Duration,
    max_attempts: u32,
    retry_decision: Arc<dyn RetryDecision>,
    backoff: Arc<dyn Backoff>,
    span: Option<tracing::Span>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            transport: None,
            base_uri: String::new(),
            middlewares: Vec::new(),
            timeout: Duration::from_secs(30),
            max_attempts: 5,
            retry_decision: Arc::new(AbortOnBadRequest),
            backoff: Arc::new(BackoffStrategy::default()),
            span: None,
        }
    }

    /// Sets a span that every call made by the client is recorded in.
    pub fn span(mut self, span: tracing::Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Sends requests with `http_client`.
    pub fn http_client(self, http_client: reqwest::Client) -> Self {
        self.transport(http_client)
    }

    /// Sends requests through a custom transport.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Sets the prefix for all request paths.
    ///
    /// The prefix and the path are concatenated as-is; slashes are not normalized.
    pub fn base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = base_uri.into();
        self
    }

    /// Appends a request middleware. Middlewares run in the order they were added.
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Sets the timeout of each attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum number of attempts per call.
    ///
    /// # Panics
    ///
    /// Panics if `max_attempts` is 0.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        assert!(max_attempts >= 1, "max_attempts must be >= 1");
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the retry decision.
    pub fn retry_decision(mut self, decision: impl RetryDecision + 'static) -> Self {
        self.retry_decision = Arc::new(decision);
        self
    }

    /// Sets the backoff that schedules attempts.
    pub fn backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        self.backoff = Arc::new(backoff);
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if no transport was given and the default HTTP client cannot be
    /// built.
    pub fn build(self) -> Result<Client> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let http_client = reqwest::Client::builder().build().map_err(|e| {
                    Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
                })?;
                Arc::new(http_client) as Arc<dyn Transport>
            }
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                transport,
                base_uri: self.base_uri,
                middlewares: self.middlewares,
                timeout: self.timeout,
                max_attempts: self.max_attempts,
                retry_decision: self.retry_decision,
                backoff: self.backoff,
                span: self.span,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoxError;
    use futures::future::BoxFuture;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Serialize)]
    struct Echo {
        message: String,
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Reply {
        reply: String,
    }

    /// Replies with a fixed status and body and records what it was sent.
    struct Canned {
        status: StatusCode,
        body: &'static str,
        seen: Mutex<Vec<reqwest::Request>>,
    }

    impl Canned {
        fn new(status: u16, body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                status: StatusCode::from_u16(status).unwrap(),
                body,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl Transport for Arc<Canned> {
        fn send(&self, request: reqwest::Request) -> BoxFuture<'_, Result<reqwest::Response>> {
            self.seen.lock().push(request);
            let response = http::Response::builder()
                .status(self.status)
                .body(self.body)
                .unwrap();
            async move { Ok::<_, Error>(reqwest::Response::from(response)) }.boxed()
        }
    }

    fn client(transport: Arc<Canned>) -> Client {
        Client::builder()
            .base_uri("http://api.test")
            .transport(transport)
            .backoff(BackoffStrategy::Immediate)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let client = Client::new().unwrap();
        assert_eq!(client.base_uri(), "");
        assert_eq!(client.timeout(), Duration::from_secs(30));
        assert_eq!(client.max_attempts(), 5);
    }

    #[test]
    #[should_panic(expected = "max_attempts must be >= 1")]
    fn test_zero_max_attempts_panics() {
        let _ = Client::builder().max_attempts(0);
    }

    #[test]
    fn test_build_request_headers_and_body() {
        let client = client(Canned::new(200, "{}"));
        let request: Request<Echo, Reply> = Request::new(
            "/foo",
            Method::POST,
            Echo {
                message: "hi".to_string(),
            },
        );

        let built = client.build_request(&request).unwrap();
        assert_eq!(built.url().as_str(), "http://api.test/foo");
        assert_eq!(built.method(), &Method::POST);
        assert_eq!(
            built.headers().get(CONTENT_TYPE).unwrap(),
            "application/json; charset=UTF-8"
        );
        assert_eq!(built.headers().get(ACCEPT).unwrap(), "application/json");
        assert_eq!(
            built.body().and_then(|b| b.as_bytes()).unwrap(),
            br#"{"message":"hi"}"#
        );
    }

    #[test]
    fn test_build_request_without_body() {
        let client = client(Canned::new(200, "{}"));
        let request: Request<NoBody, Reply> = Request::without_body("/foo", Method::GET);

        let built = client.build_request(&request).unwrap();
        assert!(built.body().is_none());
    }

    #[test]
    fn test_base_uri_is_concatenated_verbatim() {
        let client = Client::builder()
            .base_uri("http://api.test/v1/")
            .build()
            .unwrap();
        let request: Request<NoBody, Reply> = Request::without_body("/users", Method::GET);

        let built = client.build_request(&request).unwrap();
        assert_eq!(built.url().as_str(), "http://api.test/v1//users");
    }

    #[test]
    fn test_invalid_url_is_request_build_error() {
        let client = Client::new().unwrap();
        let request: Request<NoBody, Reply> = Request::without_body("not a url", Method::GET);

        let err = client.build_request(&request).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
        assert_eq!(err.kind(), crate::ErrorKind::RequestBuild);
    }

    #[test]
    fn test_middlewares_run_in_order() {
        let mut client = Client::builder()
            .base_uri("http://api.test")
            .middleware(|req: &mut reqwest::Request| -> std::result::Result<(), BoxError> {
                req.headers_mut()
                    .insert("x-order", HeaderValue::from_static("first"));
                Ok(())
            })
            .build()
            .unwrap();
        client.add_middleware(|req: &mut reqwest::Request| -> std::result::Result<(), BoxError> {
            req.headers_mut()
                .insert("x-order", HeaderValue::from_static("second"));
            Ok(())
        });

        let request: Request<NoBody, Reply> = Request::without_body("/", Method::GET);
        let built = client.build_request(&request).unwrap();
        assert_eq!(built.headers().get("x-order").unwrap(), "second");
    }

    #[test]
    fn test_add_middleware_leaves_earlier_clones_alone() {
        let mut client = Client::new().unwrap();
        let earlier = client.clone();
        client.add_middleware(crate::BearerAuth::new("t"));

        assert!(format!("{:?}", client).contains("middlewares: 1"));
        assert!(format!("{:?}", earlier).contains("middlewares: 0"));
    }

    #[test]
    fn test_middleware_failure() {
        let client = Client::builder()
            .base_uri("http://api.test")
            .middleware(|_req: &mut reqwest::Request| -> std::result::Result<(), BoxError> {
                Err("token store unavailable".into())
            })
            .build()
            .unwrap();

        let request: Request<NoBody, Reply> = Request::without_body("/", Method::GET);
        let err = client.build_request(&request).unwrap_err();
        assert!(matches!(err, Error::Middleware(_)));
    }

    #[tokio::test]
    async fn test_execute_with_custom_transport() {
        let transport = Canned::new(200, r#"{"reply":"Hello, client!"}"#);
        let client = client(transport.clone());
        let request: Request<Echo, Reply> = Request::new(
            "/foo",
            Method::POST,
            Echo {
                message: "Hello, server!".to_string(),
            },
        );

        let response = client.send(&request).await.unwrap();
        assert_eq!(response.data.reply, "Hello, client!");
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.status_text, "OK");
        assert_eq!(response.attempts, 1);
        assert_eq!(transport.seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_no_content_skips_decoder() {
        let decodes = Arc::new(AtomicUsize::new(0));
        let counter = decodes.clone();
        let client = client(Canned::new(204, ""));
        let request: Request<NoBody, Option<Reply>> = Request::without_body("/", Method::GET)
            .with_decoder(move |_body: &[u8]| -> std::result::Result<Option<Reply>, BoxError> {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("should not be called".into())
            });

        let response = client.send(&request).await.unwrap();
        assert_eq!(response.data, None);
        assert_eq!(response.status, StatusCode::NO_CONTENT);
        assert_eq!(decodes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_decode_failure_keeps_status_for_decision() {
        let seen_status = Arc::new(Mutex::new(None));
        let recorder = seen_status.clone();
        let client = Client::builder()
            .base_uri("http://api.test")
            .transport(Canned::new(502, "Bad Gateway"))
            .backoff(BackoffStrategy::Immediate)
            .retry_decision(
                move |head: Option<&ResponseHead>, error: Option<&Error>| -> Option<BoxError> {
                    *recorder.lock() = head.map(|h| h.status);
                    match error {
                        Some(Error::Decode { .. }) => Some("undecodable".into()),
                        _ => None,
                    }
                },
            )
            .build()
            .unwrap();

        let request: Request<NoBody, Reply> = Request::without_body("/", Method::GET);
        let err = client.send(&request).await.unwrap_err();

        assert!(err.is_aborted());
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
        assert_eq!(*seen_status.lock(), Some(StatusCode::BAD_GATEWAY));
    }

    #[tokio::test]
    async fn test_decision_can_reject_success() {
        let client = Client::builder()
            .base_uri("http://api.test")
            .transport(Canned::new(202, r#"{"reply":"queued"}"#))
            .retry_decision(
                |head: Option<&ResponseHead>, _error: Option<&Error>| -> Option<BoxError> {
                    match head {
                        Some(h) if h.status != StatusCode::OK => Some("expected 200".into()),
                        _ => None,
                    }
                },
            )
            .build()
            .unwrap();

        let request: Request<NoBody, Reply> = Request::without_body("/", Method::GET);
        let err = client.send(&request).await.unwrap_err();

        match err {
            Error::Aborted { status, source } => {
                assert_eq!(status, Some(StatusCode::ACCEPTED));
                assert_eq!(source.to_string(), "expected 200");
            }
            other => panic!("Expected Aborted, got {:?}", other),
        }
    }

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    #[tokio::test]
    async fn test_cancelled_attempt_logs_no_send() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let transport = Canned::new(200, r#"{"reply":"unused"}"#);
        let client = client(transport.clone());
        let request: Request<NoBody, Reply> = Request::without_body("/", Method::GET);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = client.execute(&cancel, &request).await.unwrap_err();

        assert!(err.is_cancelled());
        assert!(transport.seen.lock().is_empty());
        assert!(!logs.contents().contains("Executing HTTP request"));

        client.send(&request).await.unwrap();
        assert!(logs.contents().contains("Executing HTTP request"));
    }

    #[tokio::test]
    async fn test_backoff_without_success_is_reported() {
        struct Lazy;

        impl Backoff for Lazy {
            fn run<'a>(
                &'a self,
                _cancel: &'a CancellationToken,
                _attempt: &'a mut crate::backoff::AttemptFn<'a>,
                _max_attempts: u32,
            ) -> BoxFuture<'a, std::result::Result<(), BackoffError>> {
                async { Ok(()) }.boxed()
            }
        }

        let client = Client::builder()
            .base_uri("http://api.test")
            .transport(Canned::new(200, "{}"))
            .backoff(Lazy)
            .build()
            .unwrap();

        let request: Request<NoBody, Reply> = Request::without_body("/", Method::GET);
        let err = client.send(&request).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }
}
