//! The transport capability a retry sequence delegates to
//!
//! A [`Transport`] performs exactly one attempt: it turns a [`Request`] into
//! a [`Response`] or an error. Redirects, TLS, pooling and timeouts are the
//! implementation's business.

use std::future::Future;
use std::sync::Arc;

use crate::http::{Request, RequestHead, Response};

#[cfg(feature = "reqwest")]
mod reqwest_impl;

#[cfg(feature = "reqwest")]
pub use reqwest_impl::{HttpError, ReqwestTransport};

/// Asynchronous single-attempt HTTP transport
///
/// # Implementations
///
/// - [`ReqwestTransport`]: production implementation using `reqwest`
/// - [`RetryTransport`](crate::RetryTransport): retrying decorator over any
///   other transport
/// - Mock implementations for testing
pub trait Transport: Send + Sync {
    /// Error type for a failed attempt
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send one request and wait for the response head
    ///
    /// The body of the returned response may still be streaming.
    fn send(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, Self::Error>> + Send;

    /// Best-effort abort of an outstanding [`send`](Transport::send) for
    /// `request`
    ///
    /// The aborted `send` is expected to return promptly with an error.
    /// The default does nothing.
    fn cancel(&self, request: &RequestHead) {
        let _ = request;
    }
}

impl<T: Transport> Transport for Arc<T> {
    type Error = T::Error;

    fn send(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, Self::Error>> + Send {
        (**self).send(request)
    }

    fn cancel(&self, request: &RequestHead) {
        (**self).cancel(request)
    }
}
