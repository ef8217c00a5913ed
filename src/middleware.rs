//! Request middlewares.
//!
//! Middlewares run in registration order on every attempt, after the base request (URL,
//! body, default JSON headers) has been built and before it is sent. A middleware that
//! returns an error fails the attempt with [`Error::Middleware`](crate::Error::Middleware).

use crate::BoxError;
use base64::Engine;
use http::header::{HeaderValue, InvalidHeaderValue, AUTHORIZATION};

/// A request-mutation step.
///
/// Implemented for any `Fn(&mut reqwest::Request) -> Result<(), BoxError>`.
///
/// # Examples
///
/// ```
/// use jsonrest::{BoxError, Client};
///
/// # fn example() -> Result<(), jsonrest::Error> {
/// let client = Client::builder()
///     .middleware(|request: &mut reqwest::Request| -> Result<(), BoxError> {
///         request
///             .headers_mut()
///             .insert("x-api-version", "2".parse()?);
///         Ok(())
///     })
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub trait Middleware: Send + Sync {
    /// Mutates `request` in place.
    fn apply(&self, request: &mut reqwest::Request) -> Result<(), BoxError>;
}

impl<F> Middleware for F
where
    F: Fn(&mut reqwest::Request) -> Result<(), BoxError> + Send + Sync,
{
    fn apply(&self, request: &mut reqwest::Request) -> Result<(), BoxError> {
        self(request)
    }
}

/// Sets HTTP Basic credentials on every request.
///
/// Applying it never fails: the credentials are base64-encoded, which always yields a
/// valid header value.
#[derive(Clone)]
pub struct BasicAuth {
    value: HeaderValue,
}

impl BasicAuth {
    /// Creates a middleware that authenticates as `login` with `password`.
    pub fn new(login: impl AsRef<str>, password: impl AsRef<str>) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", login.as_ref(), password.as_ref()));
        match authorization(format!("Basic {}", encoded)) {
            Ok(value) => Self { value },
            Err(_) => unreachable!("base64 output is always a valid header value"),
        }
    }
}

impl Middleware for BasicAuth {
    fn apply(&self, request: &mut reqwest::Request) -> Result<(), BoxError> {
        request
            .headers_mut()
            .insert(AUTHORIZATION, self.value.clone());
        Ok(())
    }
}

/// Sets a Bearer token on every request.
///
/// The token is inserted verbatim and may need to be encoded first. It is checked once,
/// when the middleware is created, so applying it never fails.
#[derive(Clone)]
pub struct BearerAuth {
    value: HeaderValue,
}

impl BearerAuth {
    /// Creates a middleware that sends `Authorization: Bearer <token>`.
    ///
    /// # Panics
    ///
    /// Panics if the token contains bytes that are not allowed in a header value, such as
    /// control characters. Use [`BearerAuth::try_new`] for tokens from untrusted sources.
    pub fn new(token: impl AsRef<str>) -> Self {
        Self::try_new(token).unwrap_or_else(|e| panic!("invalid bearer token: {}", e))
    }

    /// Creates a middleware that sends `Authorization: Bearer <token>`, or returns an error
    /// if the token is not a valid header value.
    pub fn try_new(token: impl AsRef<str>) -> Result<Self, InvalidHeaderValue> {
        let value = authorization(format!("Bearer {}", token.as_ref()))?;
        Ok(Self { value })
    }
}

impl Middleware for BearerAuth {
    fn apply(&self, request: &mut reqwest::Request) -> Result<(), BoxError> {
        request
            .headers_mut()
            .insert(AUTHORIZATION, self.value.clone());
        Ok(())
    }
}

fn authorization(credentials: String) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut value = HeaderValue::try_from(credentials)?;
    value.set_sensitive(true);
    Ok(value)
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth").field("credentials", &"<redacted>").finish()
    }
}

impl std::fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth").field("credentials", &"<redacted>").finish()
    }
}
