//! Encode and decode strategies for request and response bodies.
//!
//! A [`Request`](crate::Request) carries one [`Encoder`] for its payload and one
//! [`Decoder`] for its response. Both default to [`Json`], and both are implemented for
//! plain closures so that any byte-level format can be swapped in per request.

use crate::BoxError;
use serde::{de::DeserializeOwned, Serialize};

/// Encodes a value into a byte sink.
///
/// # Examples
///
/// ```
/// use jsonrest::codec::Encoder;
/// use jsonrest::BoxError;
///
/// let plain_text = |sink: &mut Vec<u8>, value: &String| -> Result<(), BoxError> {
///     sink.extend_from_slice(value.as_bytes());
///     Ok(())
/// };
///
/// let mut buf = Vec::new();
/// plain_text.encode(&mut buf, &"hello".to_string()).unwrap();
/// assert_eq!(buf, b"hello");
/// ```
pub trait Encoder<T>: Send + Sync {
    /// Writes the encoded form of `value` into `sink`.
    fn encode(&self, sink: &mut Vec<u8>, value: &T) -> Result<(), BoxError>;
}

/// Decodes a value from a complete response body.
pub trait Decoder<T>: Send + Sync {
    /// Decodes `source` into a value.
    fn decode(&self, source: &[u8]) -> Result<T, BoxError>;
}

impl<T, F> Encoder<T> for F
where
    F: Fn(&mut Vec<u8>, &T) -> Result<(), BoxError> + Send + Sync,
{
    fn encode(&self, sink: &mut Vec<u8>, value: &T) -> Result<(), BoxError> {
        self(sink, value)
    }
}

impl<T, F> Decoder<T> for F
where
    F: Fn(&[u8]) -> Result<T, BoxError> + Send + Sync,
{
    fn decode(&self, source: &[u8]) -> Result<T, BoxError> {
        self(source)
    }
}

/// The default codec, backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl<T: Serialize> Encoder<T> for Json {
    fn encode(&self, sink: &mut Vec<u8>, value: &T) -> Result<(), BoxError> {
        serde_json::to_writer(sink, value)?;
        Ok(())
    }
}

impl<T: DeserializeOwned> Decoder<T> for Json {
    fn decode(&self, source: &[u8]) -> Result<T, BoxError> {
        Ok(serde_json::from_slice(source)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Message {
        message: String,
    }

    #[test]
    fn test_json_encode() {
        let mut buf = Vec::new();
        Json.encode(
            &mut buf,
            &Message {
                message: "Hello, server!".to_string(),
            },
        )
        .unwrap();

        assert_eq!(buf, br#"{"message":"Hello, server!"}"#);
    }

    #[test]
    fn test_json_decode() {
        let decoded: Message = Json.decode(br#"{"message":"hi"}"#).unwrap();
        assert_eq!(decoded.message, "hi");
    }

    #[test]
    fn test_json_decode_failure() {
        let result: Result<Message, BoxError> = Json.decode(b"not json");
        assert!(result.is_err());
    }

    #[test]
    fn test_closure_decoder() {
        let upper = |source: &[u8]| -> Result<String, BoxError> {
            Ok(String::from_utf8(source.to_vec())?.to_uppercase())
        };
        assert_eq!(upper.decode(b"shout").unwrap(), "SHOUT");
    }
}
