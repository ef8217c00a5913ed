//! The transport a client sends its requests through.

use crate::{Error, Result};
use futures::future::{BoxFuture, FutureExt};

/// Sends one built request and returns the response head with a readable body.
///
/// Implemented for [`reqwest::Client`], which is the default. Custom transports can
/// build responses with `reqwest::Response::from(http::Response<_>)` and report their
/// own failures as [`Error::Transport`](crate::Error::Transport).
pub trait Transport: Send + Sync {
    /// Sends `request`.
    fn send(&self, request: reqwest::Request) -> BoxFuture<'_, Result<reqwest::Response>>;
}

impl Transport for reqwest::Client {
    fn send(&self, request: reqwest::Request) -> BoxFuture<'_, Result<reqwest::Response>> {
        let pending = self.execute(request);
        async move { pending.await.map_err(Error::Network) }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};

    struct Canned;

    impl Transport for Canned {
        fn send(&self, request: reqwest::Request) -> BoxFuture<'_, Result<reqwest::Response>> {
            let result = if request.url().path() == "/down" {
                Err(Error::Transport("connection refused".into()))
            } else {
                http::Response::builder()
                    .status(StatusCode::ACCEPTED)
                    .body("{}")
                    .map(reqwest::Response::from)
                    .map_err(|e| Error::Transport(e.into()))
            };
            async move { result }.boxed()
        }
    }

    #[tokio::test]
    async fn test_custom_transport() {
        let request = reqwest::Request::new(Method::GET, "http://test/up".parse().unwrap());
        let response = Canned.send(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.text().await.unwrap(), "{}");

        let request = reqwest::Request::new(Method::GET, "http://test/down".parse().unwrap());
        let err = Canned.send(request).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
