//! Scriptable in-memory transport

use std::sync::Mutex;

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::Notify;

use retrier::http::{Request, RequestHead, Response};
use retrier::retry::TransientError;
use retrier::Transport;

/// Errors returned by [`MockTransport`]
#[derive(Debug, Error)]
pub enum MockError {
    #[error("temporary failure: {0}")]
    Temporary(String),

    #[error("permanent failure: {0}")]
    Permanent(String),

    #[error("attempt cancelled")]
    Cancelled,

    #[error("failed to read request body: {0}")]
    Body(#[source] std::io::Error),
}

impl TransientError for MockError {
    fn is_temporary(&self) -> bool {
        matches!(self, MockError::Temporary(_))
    }
}

/// Computes the outcome of attempt `n` (zero-based)
pub type RetFn = Box<dyn Fn(u32, &RequestHead) -> Result<Response, MockError> + Send + Sync>;

/// What the transport has seen so far
#[derive(Debug, Default, Clone)]
pub struct Recorded {
    pub calls: u32,
    pub cancels: u32,
    pub bodies: Vec<Option<Bytes>>,
}

/// Transport whose attempts are answered by a closure
///
/// In hanging mode every attempt waits until [`Transport::cancel`] is called
/// and then fails with [`MockError::Cancelled`].
pub struct MockTransport {
    ret_fn: RetFn,
    hang: bool,
    recorded: Mutex<Recorded>,
    cancelled: Notify,
}

impl MockTransport {
    pub fn new<F>(ret_fn: F) -> Self
    where
        F: Fn(u32, &RequestHead) -> Result<Response, MockError> + Send + Sync + 'static,
    {
        Self {
            ret_fn: Box::new(ret_fn),
            hang: false,
            recorded: Mutex::new(Recorded::default()),
            cancelled: Notify::new(),
        }
    }

    /// Every attempt fails with a temporary error
    pub fn always_temporary() -> Self {
        Self::new(|attempt, _| Err(MockError::Temporary(format!("attempt {}", attempt))))
    }

    /// Every attempt succeeds with `status`
    pub fn always_status(status: u16) -> Self {
        Self::new(move |_, _| Ok(Response::new(status)))
    }

    /// Attempts block until cancelled
    pub fn hanging() -> Self {
        let mut transport = Self::always_status(200);
        transport.hang = true;
        transport
    }

    pub fn recorded(&self) -> Recorded {
        self.recorded.lock().unwrap().clone()
    }

    pub fn calls(&self) -> u32 {
        self.recorded().calls
    }

    pub fn cancels(&self) -> u32 {
        self.recorded().cancels
    }

    pub fn bodies(&self) -> Vec<Option<Bytes>> {
        self.recorded().bodies
    }
}

impl Transport for MockTransport {
    type Error = MockError;

    async fn send(&self, mut request: Request) -> Result<Response, MockError> {
        let body = match request.take_body() {
            Some(body) => Some(body.collect().await.map_err(MockError::Body)?),
            None => None,
        };

        let attempt = {
            let mut recorded = self.recorded.lock().unwrap();
            recorded.bodies.push(body);
            recorded.calls += 1;
            recorded.calls - 1
        };

        if self.hang {
            self.cancelled.notified().await;
            return Err(MockError::Cancelled);
        }

        (self.ret_fn)(attempt, request.head())
    }

    fn cancel(&self, _request: &RequestHead) {
        self.recorded.lock().unwrap().cancels += 1;
        self.cancelled.notify_one();
    }
}
