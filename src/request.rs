//! Typed request descriptions.
//!
//! A [`Request`] is built once and can be executed any number of times, including
//! concurrently, because nothing in it changes during a call.

use crate::codec::{Decoder, Encoder, Json};
use crate::{Error, Result};
use http::Method;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::Arc;

/// Marker type for "no body".
///
/// As a request type ([`Request::without_body`], [`Request::receiving`], [`Request::bare`])
/// it means the request is sent without a body. As a response type
/// ([`Request::sending`], [`Request::bare`], [`Request::discard_response`]) it means the
/// response body is drained and ignored whatever the status. `NoBody` implements neither
/// `Serialize` nor `Deserialize`, so it never reaches an encoder or decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NoBody;

/// The payload side of a request.
pub(crate) enum Payload<Req> {
    Empty,
    Value {
        value: Req,
        encoder: Arc<dyn Encoder<Req>>,
    },
}

/// How the response body is turned into the response type.
pub(crate) enum ResponseBody<Res> {
    Discard,
    Decode(Arc<dyn Decoder<Res>>),
}

/// A JSON/REST request with payload type `Req` and response type `Res`.
///
/// # Examples
///
/// ```
/// use http::Method;
/// use jsonrest::Request;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize)]
/// struct Echo {
///     message: String,
/// }
///
/// #[derive(Deserialize, Default)]
/// struct Reply {
///     reply: String,
/// }
///
/// let echo: Request<Echo, Reply> = Request::new(
///     "/echo",
///     Method::POST,
///     Echo { message: "hello".to_string() },
/// );
/// assert_eq!(echo.path(), "/echo");
///
/// // No request body, and the response body is ignored.
/// let ping = Request::bare("/ping", Method::GET);
/// assert!(ping.payload().is_none());
/// ```
pub struct Request<Req, Res> {
    path: String,
    method: Method,
    payload: Payload<Req>,
    response: ResponseBody<Res>,
    ignore_response_body: bool,
}

impl<Req, Res> Request<Req, Res>
where
    Req: Serialize + 'static,
    Res: DeserializeOwned + 'static,
{
    /// Creates a request that sends `payload` as JSON and decodes the response as JSON.
    ///
    /// `path` is appended verbatim to the client's base URI when the request is executed.
    /// Neither `path` nor `method` is validated here.
    pub fn new(path: impl Into<String>, method: Method, payload: Req) -> Self {
        Self::with_codec(path, method, payload, Json, Json)
    }
}

impl<Res> Request<NoBody, Res>
where
    Res: DeserializeOwned + 'static,
{
    /// Creates a request that is sent without a body and decodes the response as JSON.
    pub fn without_body(path: impl Into<String>, method: Method) -> Self {
        Self::receiving(path, method, Json)
    }
}

impl<Req, Res> Request<Req, Res> {
    /// Creates a request with an explicit encoder and decoder.
    ///
    /// Neither `Req` nor `Res` needs to implement serde traits, so any byte-level format
    /// can be used.
    ///
    /// # Examples
    ///
    /// ```
    /// use http::Method;
    /// use jsonrest::{BoxError, Request};
    ///
    /// struct Line(String);
    ///
    /// let request: Request<Line, Line> = Request::with_codec(
    ///     "/lines",
    ///     Method::POST,
    ///     Line("hello".to_string()),
    ///     |sink: &mut Vec<u8>, line: &Line| -> Result<(), BoxError> {
    ///         sink.extend_from_slice(line.0.as_bytes());
    ///         Ok(())
    ///     },
    ///     |body: &[u8]| -> Result<Line, BoxError> {
    ///         Ok(Line(String::from_utf8(body.to_vec())?))
    ///     },
    /// );
    /// assert_eq!(request.payload().unwrap().0, "hello");
    /// ```
    pub fn with_codec(
        path: impl Into<String>,
        method: Method,
        payload: Req,
        encoder: impl Encoder<Req> + 'static,
        decoder: impl Decoder<Res> + 'static,
    ) -> Self {
        Self {
            path: path.into(),
            method,
            payload: Payload::Value {
                value: payload,
                encoder: Arc::new(encoder),
            },
            response: ResponseBody::Decode(Arc::new(decoder)),
            ignore_response_body: false,
        }
    }
}

impl<Res> Request<NoBody, Res> {
    /// Creates a request that is sent without a body and decodes the response with
    /// `decoder`.
    pub fn receiving(
        path: impl Into<String>,
        method: Method,
        decoder: impl Decoder<Res> + 'static,
    ) -> Self {
        Self {
            path: path.into(),
            method,
            payload: Payload::Empty,
            response: ResponseBody::Decode(Arc::new(decoder)),
            ignore_response_body: false,
        }
    }
}

impl<Req> Request<Req, NoBody> {
    /// Creates a request that sends `payload` with `encoder` and discards the response
    /// body.
    pub fn sending(
        path: impl Into<String>,
        method: Method,
        payload: Req,
        encoder: impl Encoder<Req> + 'static,
    ) -> Self {
        Self {
            path: path.into(),
            method,
            payload: Payload::Value {
                value: payload,
                encoder: Arc::new(encoder),
            },
            response: ResponseBody::Discard,
            ignore_response_body: false,
        }
    }
}

impl Request<NoBody, NoBody> {
    /// Creates a request with no body whose response body is discarded.
    pub fn bare(path: impl Into<String>, method: Method) -> Self {
        Self {
            path: path.into(),
            method,
            payload: Payload::Empty,
            response: ResponseBody::Discard,
            ignore_response_body: false,
        }
    }
}

impl<Req, Res> Request<Req, Res> {
    /// Replaces the payload encoder.
    ///
    /// Has no effect on requests without a payload ([`Request::without_body`],
    /// [`Request::receiving`] and [`Request::bare`]).
    pub fn with_encoder(mut self, encoder: impl Encoder<Req> + 'static) -> Self {
        if let Payload::Value { encoder: current, .. } = &mut self.payload {
            *current = Arc::new(encoder);
        }
        self
    }

    /// Replaces the response decoder.
    pub fn with_decoder(mut self, decoder: impl Decoder<Res> + 'static) -> Self {
        self.response = ResponseBody::Decode(Arc::new(decoder));
        self
    }

    /// Never decode the response body; [`Response::data`](crate::Response::data) will be
    /// `Res::default()` whatever the status.
    pub fn ignore_response_body(mut self) -> Self {
        self.ignore_response_body = true;
        self
    }

    /// Turns this request into one whose response body is always drained and ignored.
    pub fn discard_response(self) -> Request<Req, NoBody> {
        Request {
            path: self.path,
            method: self.method,
            payload: self.payload,
            response: ResponseBody::Discard,
            ignore_response_body: self.ignore_response_body,
        }
    }

    /// The path that is appended to the client's base URI.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The payload, or `None` if the request has no body.
    pub fn payload(&self) -> Option<&Req> {
        match &self.payload {
            Payload::Empty => None,
            Payload::Value { value, .. } => Some(value),
        }
    }

    /// Whether the response body is skipped regardless of status.
    pub fn ignores_response_body(&self) -> bool {
        self.ignore_response_body || matches!(self.response, ResponseBody::Discard)
    }

    /// Encodes the payload, returning `None` for requests without a body.
    pub(crate) fn encode_body(&self) -> Result<Option<Vec<u8>>> {
        match &self.payload {
            Payload::Empty => Ok(None),
            Payload::Value { value, encoder } => {
                let mut buf = Vec::new();
                encoder.encode(&mut buf, value).map_err(Error::Encode)?;
                Ok(Some(buf))
            }
        }
    }

    /// The decoder for the response body, or `None` if the body must not be decoded.
    pub(crate) fn decoder(&self) -> Option<&dyn Decoder<Res>> {
        match &self.response {
            ResponseBody::Decode(decoder) if !self.ignore_response_body => Some(decoder.as_ref()),
            _ => None,
        }
    }
}

impl<Req: Clone, Res> Clone for Request<Req, Res> {
    fn clone(&self) -> Self {
        let payload = match &self.payload {
            Payload::Empty => Payload::Empty,
            Payload::Value { value, encoder } => Payload::Value {
                value: value.clone(),
                encoder: Arc::clone(encoder),
            },
        };
        let response = match &self.response {
            ResponseBody::Discard => ResponseBody::Discard,
            ResponseBody::Decode(decoder) => ResponseBody::Decode(Arc::clone(decoder)),
        };

        Self {
            path: self.path.clone(),
            method: self.method.clone(),
            payload,
            response,
            ignore_response_body: self.ignore_response_body,
        }
    }
}

impl<Req, Res> fmt::Debug for Request<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("has_body", &matches!(self.payload, Payload::Value { .. }))
            .field("ignores_response_body", &self.ignores_response_body())
            .finish()
    }
}
