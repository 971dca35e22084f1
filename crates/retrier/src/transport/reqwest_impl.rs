//! Default transport backed by `reqwest`

use std::time::Duration;

use futures_util::TryStreamExt;
use thiserror::Error;
use tracing::debug;

use super::Transport;
use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::http::{Body, Request, RequestHead, Response};
use crate::retry::TransientError;

/// Errors produced by [`ReqwestTransport`]
#[derive(Debug, Error)]
pub enum HttpError {
    /// The method could not be expressed as an HTTP method token
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// The request failed inside `reqwest`
    #[error("HTTP request failed: {0}")]
    Request(#[from] ::reqwest::Error),

    /// The request's cancellation token fired before a response arrived
    #[error("request cancelled")]
    Cancelled,
}

impl TransientError for HttpError {
    fn is_temporary(&self) -> bool {
        match self {
            HttpError::Request(err) => err.is_timeout() || err.is_connect(),
            HttpError::InvalidMethod(_) | HttpError::Cancelled => false,
        }
    }
}

/// Production transport using a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ::reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a default-configured client
    pub fn new() -> Result<Self> {
        let client = ::reqwest::Client::builder()
            .build()
            .map_err(Error::HttpClient)?;
        Ok(Self { client })
    }

    /// Create a transport honoring the timeout and user agent of `config`
    pub fn from_config(config: &RetryConfig) -> Result<Self> {
        let user_agent = config.user_agent.as_str();
        let mut builder = ::reqwest::Client::builder().user_agent(user_agent);
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let client = builder.build().map_err(Error::HttpClient)?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: ::reqwest::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &::reqwest::Client {
        &self.client
    }
}

impl Transport for ReqwestTransport {
    type Error = HttpError;

    async fn send(&self, request: Request) -> std::result::Result<Response, HttpError> {
        let (head, body) = request.into_parts();
        let method = ::reqwest::Method::from_bytes(head.method().as_str().as_bytes())
            .map_err(|_| HttpError::InvalidMethod(head.method().to_string()))?;

        let mut builder = self.client.request(method, head.url());
        for (name, value) in head.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.body(into_reqwest_body(body));
        }

        let token = head.cancellation_token().clone();
        let response = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(method = %head.method(), url = head.url(), "request cancelled in flight");
                return Err(HttpError::Cancelled);
            }
            response = builder.send() => response?,
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let stream = response.bytes_stream().map_err(std::io::Error::other);

        Ok(Response::new(status)
            .with_headers(headers)
            .with_body(Body::from_stream(stream)))
    }

    fn cancel(&self, request: &RequestHead) {
        request.cancellation_token().cancel();
    }
}

fn into_reqwest_body(body: Body) -> ::reqwest::Body {
    match body.try_into_bytes() {
        Ok(bytes) => ::reqwest::Body::from(bytes),
        Err(body) => ::reqwest::Body::wrap_stream(body.into_stream()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_is_not_temporary() {
        assert!(!HttpError::Cancelled.is_temporary());
        let invalid = HttpError::InvalidMethod("BAD METHOD".to_string());
        assert!(!invalid.is_temporary());
    }

    #[test]
    fn test_from_config() {
        let config = RetryConfig::default();
        assert!(ReqwestTransport::from_config(&config).is_ok());
    }

    #[tokio::test]
    async fn test_invalid_method_rejected_before_sending() {
        let transport = ReqwestTransport::new().unwrap();
        let request = Request::new("BAD METHOD".into(), "http://127.0.0.1:9");

        let err = transport.send(request).await.unwrap_err();
        assert!(matches!(err, HttpError::InvalidMethod(ref m) if m == "BAD METHOD"));
    }

    #[tokio::test]
    async fn test_pre_cancelled_request_fails_fast() {
        let transport = ReqwestTransport::new().unwrap();
        let request = Request::new(crate::http::Method::GET, "http://127.0.0.1:9");
        transport.cancel(request.head());

        let err = transport.send(request).await.unwrap_err();
        assert!(matches!(err, HttpError::Cancelled));
    }
}
