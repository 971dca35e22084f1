//! Retry observation and logging
//!
//! This module provides the `RetryObserver` trait for monitoring the attempts
//! a retry transport makes, and a `TracingObserver` implementation that logs
//! using the `tracing` crate.

use std::error::Error;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::http::RequestHead;

/// What an attempt produced: a response status or a transport error
#[derive(Clone, Copy)]
pub enum AttemptOutcome<'a> {
    Status(u16),
    Error(&'a dyn Error),
}

impl AttemptOutcome<'_> {
    pub fn is_error(&self) -> bool {
        matches!(self, AttemptOutcome::Error(_))
    }
}

impl fmt::Debug for AttemptOutcome<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Status(status) => f.debug_tuple("Status").field(status).finish(),
            AttemptOutcome::Error(err) => f.debug_tuple("Error").field(&err.to_string()).finish(),
        }
    }
}

impl fmt::Display for AttemptOutcome<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Status(status) => write!(f, "status {}", status),
            AttemptOutcome::Error(err) => write!(f, "error: {}", err),
        }
    }
}

/// Observer trait for retry transport events
///
/// Implement this trait to receive callbacks while a request is retried.
/// Attempt numbers passed to the callbacks are zero-based, matching the index
/// the decision function sees.
///
/// # Example
///
/// ```rust
/// use retrier::http::RequestHead;
/// use retrier::retry::{AttemptOutcome, RetryObserver};
/// use std::time::Duration;
///
/// struct MetricsObserver;
///
/// impl RetryObserver for MetricsObserver {
///     fn on_attempt_start(&self, request: &RequestHead, attempt: u32) {}
///
///     fn on_retry(
///         &self,
///         request: &RequestHead,
///         attempt: u32,
///         outcome: AttemptOutcome<'_>,
///         delay: Duration,
///     ) {
///     }
///
///     fn on_complete(
///         &self,
///         request: &RequestHead,
///         attempts: u32,
///         outcome: AttemptOutcome<'_>,
///         total: Duration,
///     ) {
///     }
/// }
/// ```
pub trait RetryObserver: Send + Sync {
    /// Called before each attempt is sent
    fn on_attempt_start(&self, request: &RequestHead, attempt: u32);

    /// Called when the decision function asks for another attempt
    fn on_retry(
        &self,
        request: &RequestHead,
        attempt: u32,
        outcome: AttemptOutcome<'_>,
        delay: Duration,
    );

    /// Called when the sequence ends with the outcome handed to the caller
    fn on_complete(
        &self,
        request: &RequestHead,
        attempts: u32,
        outcome: AttemptOutcome<'_>,
        total_duration: Duration,
    );

    /// Called when the request body could not be buffered
    fn on_buffer_failed(&self, request: &RequestHead, error: &io::Error) {
        let _ = (request, error);
    }

    /// Called when the request is cancelled between attempts
    fn on_cancelled(&self, request: &RequestHead, attempts: u32) {
        let _ = (request, attempts);
    }
}

/// A no-op observer that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl RetryObserver for NoOpObserver {
    fn on_attempt_start(&self, _request: &RequestHead, _attempt: u32) {}

    fn on_retry(
        &self,
        _request: &RequestHead,
        _attempt: u32,
        _outcome: AttemptOutcome<'_>,
        _delay: Duration,
    ) {
    }

    fn on_complete(
        &self,
        _request: &RequestHead,
        _attempts: u32,
        _outcome: AttemptOutcome<'_>,
        _total_duration: Duration,
    ) {
    }
}

/// An observer that logs retry events using the `tracing` crate
///
/// # Log Levels
///
/// - `on_attempt_start`: DEBUG
/// - `on_retry`: WARN
/// - `on_complete`: INFO after retries, DEBUG on the first attempt
/// - `on_buffer_failed`: ERROR
/// - `on_cancelled`: WARN
#[derive(Debug, Clone)]
pub struct TracingObserver {
    operation: String,
}

impl TracingObserver {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("http")
    }
}

impl RetryObserver for TracingObserver {
    fn on_attempt_start(&self, request: &RequestHead, attempt: u32) {
        tracing::debug!(
            operation = %self.operation,
            method = %request.method(),
            url = request.url(),
            attempt = attempt,
            "starting attempt"
        );
    }

    fn on_retry(
        &self,
        request: &RequestHead,
        attempt: u32,
        outcome: AttemptOutcome<'_>,
        delay: Duration,
    ) {
        tracing::warn!(
            operation = %self.operation,
            method = %request.method(),
            url = request.url(),
            attempt = attempt,
            outcome = %outcome,
            delay_ms = delay.as_millis() as u64,
            "attempt will be retried"
        );
    }

    fn on_complete(
        &self,
        request: &RequestHead,
        attempts: u32,
        outcome: AttemptOutcome<'_>,
        total_duration: Duration,
    ) {
        if attempts > 1 {
            tracing::info!(
                operation = %self.operation,
                method = %request.method(),
                url = request.url(),
                attempts = attempts,
                outcome = %outcome,
                total_duration_ms = total_duration.as_millis() as u64,
                "request finished after retry"
            );
        } else {
            tracing::debug!(
                operation = %self.operation,
                method = %request.method(),
                url = request.url(),
                outcome = %outcome,
                duration_ms = total_duration.as_millis() as u64,
                "request finished on first attempt"
            );
        }
    }

    fn on_buffer_failed(&self, request: &RequestHead, error: &io::Error) {
        tracing::error!(
            operation = %self.operation,
            method = %request.method(),
            url = request.url(),
            error = %error,
            "failed to buffer request body"
        );
    }

    fn on_cancelled(&self, request: &RequestHead, attempts: u32) {
        tracing::warn!(
            operation = %self.operation,
            method = %request.method(),
            url = request.url(),
            attempts = attempts,
            "request cancelled while waiting to retry"
        );
    }
}

/// An observer that counts retry events
///
/// Useful for testing and metrics collection.
#[derive(Debug, Default)]
pub struct StatsObserver {
    pub attempt_starts: AtomicU32,
    pub retries: AtomicU32,
    pub completions: AtomicU32,
    /// Completions whose final outcome was a transport error
    pub failures: AtomicU32,
    pub buffer_failures: AtomicU32,
    pub cancellations: AtomicU32,
}

impl StatsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempt_starts(&self) -> u32 {
        self.attempt_starts.load(Ordering::SeqCst)
    }

    pub fn retries(&self) -> u32 {
        self.retries.load(Ordering::SeqCst)
    }

    pub fn completions(&self) -> u32 {
        self.completions.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn buffer_failures(&self) -> u32 {
        self.buffer_failures.load(Ordering::SeqCst)
    }

    pub fn cancellations(&self) -> u32 {
        self.cancellations.load(Ordering::SeqCst)
    }
}

impl RetryObserver for StatsObserver {
    fn on_attempt_start(&self, _request: &RequestHead, _attempt: u32) {
        self.attempt_starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_retry(
        &self,
        _request: &RequestHead,
        _attempt: u32,
        _outcome: AttemptOutcome<'_>,
        _delay: Duration,
    ) {
        self.retries.fetch_add(1, Ordering::SeqCst);
    }

    fn on_complete(
        &self,
        _request: &RequestHead,
        _attempts: u32,
        outcome: AttemptOutcome<'_>,
        _total_duration: Duration,
    ) {
        self.completions.fetch_add(1, Ordering::SeqCst);
        if outcome.is_error() {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn on_buffer_failed(&self, _request: &RequestHead, _error: &io::Error) {
        self.buffer_failures.fetch_add(1, Ordering::SeqCst);
    }

    fn on_cancelled(&self, _request: &RequestHead, _attempts: u32) {
        self.cancellations.fetch_add(1, Ordering::SeqCst);
    }
}

impl<T: RetryObserver + ?Sized> RetryObserver for Arc<T> {
    fn on_attempt_start(&self, request: &RequestHead, attempt: u32) {
        (**self).on_attempt_start(request, attempt)
    }

    fn on_retry(
        &self,
        request: &RequestHead,
        attempt: u32,
        outcome: AttemptOutcome<'_>,
        delay: Duration,
    ) {
        (**self).on_retry(request, attempt, outcome, delay)
    }

    fn on_complete(
        &self,
        request: &RequestHead,
        attempts: u32,
        outcome: AttemptOutcome<'_>,
        total_duration: Duration,
    ) {
        (**self).on_complete(request, attempts, outcome, total_duration)
    }

    fn on_buffer_failed(&self, request: &RequestHead, error: &io::Error) {
        (**self).on_buffer_failed(request, error)
    }

    fn on_cancelled(&self, request: &RequestHead, attempts: u32) {
        (**self).on_cancelled(request, attempts)
    }
}

impl<T: RetryObserver + ?Sized> RetryObserver for Box<T> {
    fn on_attempt_start(&self, request: &RequestHead, attempt: u32) {
        (**self).on_attempt_start(request, attempt)
    }

    fn on_retry(
        &self,
        request: &RequestHead,
        attempt: u32,
        outcome: AttemptOutcome<'_>,
        delay: Duration,
    ) {
        (**self).on_retry(request, attempt, outcome, delay)
    }

    fn on_complete(
        &self,
        request: &RequestHead,
        attempts: u32,
        outcome: AttemptOutcome<'_>,
        total_duration: Duration,
    ) {
        (**self).on_complete(request, attempts, outcome, total_duration)
    }

    fn on_buffer_failed(&self, request: &RequestHead, error: &io::Error) {
        (**self).on_buffer_failed(request, error)
    }

    fn on_cancelled(&self, request: &RequestHead, attempts: u32) {
        (**self).on_cancelled(request, attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;

    fn head() -> RequestHead {
        RequestHead::new(Method::GET, "http://example.com/data")
    }

    #[test]
    fn test_noop_observer() {
        let observer = NoOpObserver;
        let head = head();
        let error = io::Error::other("test");
        let delay = Duration::from_millis(100);

        observer.on_attempt_start(&head, 0);
        observer.on_retry(&head, 0, AttemptOutcome::Error(&error), delay);
        observer.on_complete(&head, 2, AttemptOutcome::Status(200), delay * 5);
        observer.on_buffer_failed(&head, &error);
        observer.on_cancelled(&head, 2);
    }

    #[test]
    fn test_stats_observer() {
        let observer = StatsObserver::new();
        let head = head();
        let delay = Duration::from_millis(100);

        observer.on_attempt_start(&head, 0);
        observer.on_retry(&head, 0, AttemptOutcome::Status(503), delay);
        observer.on_attempt_start(&head, 1);
        observer.on_complete(&head, 2, AttemptOutcome::Status(200), delay * 5);

        assert_eq!(observer.attempt_starts(), 2);
        assert_eq!(observer.retries(), 1);
        assert_eq!(observer.completions(), 1);
        assert_eq!(observer.failures(), 0);
    }

    #[test]
    fn test_stats_observer_counts_failed_completion() {
        let observer = StatsObserver::new();
        let head = head();
        let error = io::Error::new(io::ErrorKind::TimedOut, "timeout");

        observer.on_attempt_start(&head, 0);
        observer.on_complete(&head, 1, AttemptOutcome::Error(&error), Duration::ZERO);
        observer.on_buffer_failed(&head, &error);
        observer.on_cancelled(&head, 1);

        assert_eq!(observer.completions(), 1);
        assert_eq!(observer.failures(), 1);
        assert_eq!(observer.buffer_failures(), 1);
        assert_eq!(observer.cancellations(), 1);
    }

    #[test]
    fn test_outcome_display() {
        let error = io::Error::other("connection refused");

        assert_eq!(AttemptOutcome::Status(503).to_string(), "status 503");
        assert_eq!(
            AttemptOutcome::Error(&error).to_string(),
            "error: connection refused"
        );
        assert!(AttemptOutcome::Error(&error).is_error());
    }

    #[test]
    fn test_tracing_observer_creation() {
        assert_eq!(TracingObserver::new("upload").operation(), "upload");
        assert_eq!(TracingObserver::default().operation(), "http");
    }

    #[test]
    fn test_arc_observer() {
        let observer = Arc::new(StatsObserver::new());
        let shared: Box<dyn RetryObserver> = Box::new(Arc::clone(&observer));

        shared.on_attempt_start(&head(), 0);
        shared.on_retry(&head(), 0, AttemptOutcome::Status(500), Duration::ZERO);

        assert_eq!(observer.attempt_starts(), 1);
        assert_eq!(observer.retries(), 1);
    }
}
