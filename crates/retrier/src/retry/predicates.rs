//! Retry predicates
//!
//! A predicate looks at one finished attempt (the request, the response or
//! error it produced, and its zero-based index) and says whether another
//! attempt should be made. Predicates never keep state between calls; every
//! attempt ceiling is expressed through the `max_retries` they are built with.

use std::io;
use std::sync::Arc;

use crate::http::{Method, RequestHead, Response};

/// One finished attempt, as seen by predicates and decision functions
///
/// Any of the request, response and error may be absent; a missing signal
/// never justifies a retry on its own.
pub struct Attempt<'a, E: ?Sized> {
    /// The request that was sent
    pub request: Option<&'a RequestHead>,
    /// The response, if the attempt produced one
    pub response: Option<&'a Response>,
    /// Zero-based index of the attempt that just completed
    pub index: u32,
    /// The error, if the attempt failed
    pub error: Option<&'a E>,
}

impl<'a, E: ?Sized> Attempt<'a, E> {
    /// An attempt with the given index and no request, response or error
    pub fn new(index: u32) -> Self {
        Self {
            request: None,
            response: None,
            index,
            error: None,
        }
    }

    pub fn with_request(mut self, request: &'a RequestHead) -> Self {
        self.request = Some(request);
        self
    }

    pub fn with_response(mut self, response: &'a Response) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_error(mut self, error: &'a E) -> Self {
        self.error = Some(error);
        self
    }
}

impl<E: ?Sized> Clone for Attempt<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: ?Sized> Copy for Attempt<'_, E> {}

/// Errors that can say whether they are temporary
///
/// The default implementation reports `false`, so an error type that does
/// not override [`is_temporary`](TransientError::is_temporary) is treated as
/// permanent.
///
/// # Example
///
/// ```rust
/// use retrier::retry::TransientError;
///
/// #[derive(Debug)]
/// enum UpstreamError {
///     Overloaded,
///     BadCredentials,
/// }
///
/// impl TransientError for UpstreamError {
///     fn is_temporary(&self) -> bool {
///         matches!(self, UpstreamError::Overloaded)
///     }
/// }
/// ```
pub trait TransientError {
    fn is_temporary(&self) -> bool {
        false
    }
}

impl TransientError for io::Error {
    fn is_temporary(&self) -> bool {
        matches!(
            self.kind(),
            io::ErrorKind::TimedOut
                | io::ErrorKind::Interrupted
                | io::ErrorKind::WouldBlock
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
        )
    }
}

impl<T: TransientError + ?Sized> TransientError for Box<T> {
    fn is_temporary(&self) -> bool {
        (**self).is_temporary()
    }
}

impl<T: TransientError + ?Sized> TransientError for Arc<T> {
    fn is_temporary(&self) -> bool {
        (**self).is_temporary()
    }
}

/// A predicate that determines whether an attempt should be retried
///
/// # Example
///
/// ```rust
/// use retrier::retry::{Attempt, RetryPredicate};
///
/// struct FirstAttemptOnly;
///
/// impl<E: ?Sized> RetryPredicate<E> for FirstAttemptOnly {
///     fn should_retry(&self, attempt: &Attempt<'_, E>) -> bool {
///         attempt.index == 0
///     }
/// }
/// ```
pub trait RetryPredicate<E: ?Sized>: Send + Sync {
    /// Determine whether another attempt should follow `attempt`
    fn should_retry(&self, attempt: &Attempt<'_, E>) -> bool;
}

impl<E: ?Sized, P: RetryPredicate<E> + ?Sized> RetryPredicate<E> for Box<P> {
    fn should_retry(&self, attempt: &Attempt<'_, E>) -> bool {
        (**self).should_retry(attempt)
    }
}

impl<E: ?Sized, P: RetryPredicate<E> + ?Sized> RetryPredicate<E> for Arc<P> {
    fn should_retry(&self, attempt: &Attempt<'_, E>) -> bool {
        (**self).should_retry(attempt)
    }
}

impl<E: ?Sized, P: RetryPredicate<E> + ?Sized> RetryPredicate<E> for &P {
    fn should_retry(&self, attempt: &Attempt<'_, E>) -> bool {
        (**self).should_retry(attempt)
    }
}

/// A predicate that always returns true
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetry;

impl<E: ?Sized> RetryPredicate<E> for AlwaysRetry {
    fn should_retry(&self, _attempt: &Attempt<'_, E>) -> bool {
        true
    }
}

/// A predicate that never retries
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetry;

impl<E: ?Sized> RetryPredicate<E> for NeverRetry {
    fn should_retry(&self, _attempt: &Attempt<'_, E>) -> bool {
        false
    }
}

/// A predicate that uses a closure over the whole attempt
pub struct ClosurePredicate<F> {
    predicate: F,
}

impl<F> ClosurePredicate<F> {
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<E: ?Sized, F> RetryPredicate<E> for ClosurePredicate<F>
where
    F: Fn(&Attempt<'_, E>) -> bool + Send + Sync,
{
    fn should_retry(&self, attempt: &Attempt<'_, E>) -> bool {
        (self.predicate)(attempt)
    }
}

/// Retries when an error is present and the closure accepts it
pub struct ErrorMatches<F> {
    predicate: F,
}

impl<F> ErrorMatches<F> {
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<E: ?Sized, F> RetryPredicate<E> for ErrorMatches<F>
where
    F: Fn(&E) -> bool + Send + Sync,
{
    fn should_retry(&self, attempt: &Attempt<'_, E>) -> bool {
        attempt.error.is_some_and(|err| (self.predicate)(err))
    }
}

/// Retries while fewer than `max_retries` retries have been made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxRetries(pub u32);

impl<E: ?Sized> RetryPredicate<E> for MaxRetries {
    fn should_retry(&self, attempt: &Attempt<'_, E>) -> bool {
        attempt.index < self.0
    }
}

/// Retries errors that report themselves as temporary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporaryErrors {
    max_retries: u32,
}

impl TemporaryErrors {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }
}

impl<E: TransientError + ?Sized> RetryPredicate<E> for TemporaryErrors {
    fn should_retry(&self, attempt: &Attempt<'_, E>) -> bool {
        attempt.index < self.max_retries && attempt.error.is_some_and(|err| err.is_temporary())
    }
}

/// Retries responses whose status code is in a configured set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statuses {
    max_retries: u32,
    codes: Vec<u16>,
}

impl Statuses {
    /// Create a predicate with custom retryable status codes
    pub fn new(max_retries: u32, codes: impl IntoIterator<Item = u16>) -> Self {
        Self {
            max_retries,
            codes: codes.into_iter().collect(),
        }
    }

    /// Retry only `500 Internal Server Error`
    pub fn status_500(max_retries: u32) -> Self {
        Self::new(max_retries, [500])
    }

    /// Retry the usual transient status codes
    ///
    /// Codes: 408, 425, 429, 500, 502, 503, 504
    pub fn default_http(max_retries: u32) -> Self {
        Self::new(max_retries, [408, 425, 429, 500, 502, 503, 504])
    }

    /// Check if a status code is retryable
    pub fn is_retryable_code(&self, code: u16) -> bool {
        self.codes.contains(&code)
    }
}

impl<E: ?Sized> RetryPredicate<E> for Statuses {
    fn should_retry(&self, attempt: &Attempt<'_, E>) -> bool {
        attempt.index < self.max_retries
            && attempt
                .response
                .is_some_and(|response| self.is_retryable_code(response.status()))
    }
}

/// Retries responses whose status falls in `[from, to)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRange {
    max_retries: u32,
    from: u16,
    to: u16,
}

impl StatusRange {
    pub fn new(max_retries: u32, from: u16, to: u16) -> Self {
        Self {
            max_retries,
            from,
            to,
        }
    }

    /// Any `5xx` response
    pub fn server_errors(max_retries: u32) -> Self {
        Self::new(max_retries, 500, 600)
    }
}

impl<E: ?Sized> RetryPredicate<E> for StatusRange {
    fn should_retry(&self, attempt: &Attempt<'_, E>) -> bool {
        attempt.index < self.max_retries
            && attempt
                .response
                .is_some_and(|response| (self.from..self.to).contains(&response.status()))
    }
}

/// Retries requests made with one of the configured methods
///
/// Methods are compared case-insensitively. With no methods configured the
/// predicate never matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Methods {
    max_retries: u32,
    methods: Vec<Method>,
}

impl Methods {
    pub fn new<I, M>(max_retries: u32, methods: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<Method>,
    {
        Self {
            max_retries,
            methods: methods.into_iter().map(Into::into).collect(),
        }
    }

    /// GET, HEAD, OPTIONS, PUT and DELETE
    pub fn idempotent(max_retries: u32) -> Self {
        Self::new(
            max_retries,
            [
                Method::GET,
                Method::HEAD,
                Method::OPTIONS,
                Method::PUT,
                Method::DELETE,
            ],
        )
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }
}

impl<E: ?Sized> RetryPredicate<E> for Methods {
    fn should_retry(&self, attempt: &Attempt<'_, E>) -> bool {
        attempt.index < self.max_retries
            && attempt
                .request
                .is_some_and(|request| self.methods.contains(request.method()))
    }
}
