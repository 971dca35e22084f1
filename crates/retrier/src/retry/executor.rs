//! Retry transport
//!
//! [`RetryTransport`] decorates another [`Transport`] and owns the attempt
//! loop: it buffers the request body once, replays it for every attempt,
//! consults the decision function after each attempt, sleeps between
//! attempts and forwards cancellation to the attempt in flight.

use std::io;
use std::time::Instant;

use bytes::Bytes;
use tracing::debug;

use super::combinators::{Decision, RetryDecision};
use super::error::RetryError;
use super::observer::{AttemptOutcome, NoOpObserver, RetryObserver};
use super::predicates::Attempt;
use crate::error::Result;
use crate::http::{Body, Request, RequestHead, Response};
use crate::transport::Transport;

#[cfg(feature = "reqwest")]
use crate::transport::ReqwestTransport;

/// Placeholder for the transport a builder resolves on `build()`
///
/// With the `reqwest` feature this becomes a [`ReqwestTransport`] with
/// default settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTransport;

/// Placeholder for a builder that has no decision function yet
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDecision;

/// Something a builder can turn into the underlying transport
pub trait TransportSource {
    type Transport: Transport;

    fn resolve(self) -> Result<Self::Transport>;
}

impl<T: Transport> TransportSource for T {
    type Transport = T;

    fn resolve(self) -> Result<T> {
        Ok(self)
    }
}

#[cfg(feature = "reqwest")]
impl TransportSource for DefaultTransport {
    type Transport = ReqwestTransport;

    fn resolve(self) -> Result<ReqwestTransport> {
        ReqwestTransport::new()
    }
}

/// Builder for configuring a [`RetryTransport`]
///
/// `build()` is only available once a decision function is set.
///
/// # Example
///
/// ```rust,no_run
/// use retrier::retry::{policy, ConstantDelay, Statuses, TracingObserver};
/// use retrier::RetryTransport;
/// use std::time::Duration;
///
/// # fn example() -> retrier::Result<()> {
/// let transport = RetryTransport::builder()
///     .with_decision(policy(
///         Statuses::status_500(2),
///         ConstantDelay::new(Duration::from_millis(250)),
///     ))
///     .with_observer(TracingObserver::new("upload"))
///     .prevent_retry_with_body(true)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct RetryTransportBuilder<T = DefaultTransport, D = NoDecision, O = NoOpObserver> {
    transport: T,
    decision: D,
    observer: O,
    prevent_retry_with_body: bool,
}

impl Default for RetryTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryTransportBuilder {
    pub fn new() -> Self {
        Self {
            transport: DefaultTransport,
            decision: NoDecision,
            observer: NoOpObserver,
            prevent_retry_with_body: false,
        }
    }
}

impl<T, D, O> RetryTransportBuilder<T, D, O> {
    /// Set the underlying transport
    pub fn with_transport<T2: Transport>(self, transport: T2) -> RetryTransportBuilder<T2, D, O> {
        RetryTransportBuilder {
            transport,
            decision: self.decision,
            observer: self.observer,
            prevent_retry_with_body: self.prevent_retry_with_body,
        }
    }

    /// Set the decision function consulted after every attempt
    pub fn with_decision<D2>(self, decision: D2) -> RetryTransportBuilder<T, D2, O> {
        RetryTransportBuilder {
            transport: self.transport,
            decision,
            observer: self.observer,
            prevent_retry_with_body: self.prevent_retry_with_body,
        }
    }

    /// Set the observer
    pub fn with_observer<O2>(self, observer: O2) -> RetryTransportBuilder<T, D, O2> {
        RetryTransportBuilder {
            transport: self.transport,
            decision: self.decision,
            observer,
            prevent_retry_with_body: self.prevent_retry_with_body,
        }
    }

    /// Send requests that carry a body exactly once, unbuffered
    pub fn prevent_retry_with_body(mut self, prevent: bool) -> Self {
        self.prevent_retry_with_body = prevent;
        self
    }
}

impl<S, D, O> RetryTransportBuilder<S, D, O>
where
    S: TransportSource,
    D: RetryDecision<<S::Transport as Transport>::Error>,
    O: RetryObserver,
{
    /// Build the retry transport, resolving the default transport if none
    /// was set
    pub fn build(self) -> Result<RetryTransport<S::Transport, D, O>> {
        Ok(RetryTransport {
            inner: self.transport.resolve()?,
            decision: self.decision,
            observer: self.observer,
            prevent_retry_with_body: self.prevent_retry_with_body,
        })
    }
}

/// A transport that retries attempts on another transport
///
/// The retry transport has no attempt ceiling of its own: the sequence ends
/// when the decision function says stop, when the request is cancelled
/// between attempts, or when the caller drops the future.
#[derive(Debug, Clone)]
pub struct RetryTransport<T, D, O = NoOpObserver> {
    inner: T,
    decision: D,
    observer: O,
    prevent_retry_with_body: bool,
}

impl RetryTransport<DefaultTransport, NoDecision> {
    pub fn builder() -> RetryTransportBuilder {
        RetryTransportBuilder::new()
    }
}

impl<T, D> RetryTransport<T, D> {
    pub fn new(inner: T, decision: D) -> Self {
        Self {
            inner,
            decision,
            observer: NoOpObserver,
            prevent_retry_with_body: false,
        }
    }
}

#[cfg(feature = "reqwest")]
impl<D> RetryTransport<ReqwestTransport, D> {
    /// Retry over a default-configured [`ReqwestTransport`]
    pub fn with_default_transport(decision: D) -> Result<Self> {
        Ok(Self::new(ReqwestTransport::new()?, decision))
    }
}

impl<T, D, O> RetryTransport<T, D, O> {
    pub fn with_observer<O2>(self, observer: O2) -> RetryTransport<T, D, O2> {
        RetryTransport {
            inner: self.inner,
            decision: self.decision,
            observer,
            prevent_retry_with_body: self.prevent_retry_with_body,
        }
    }

    pub fn prevent_retry_with_body(mut self, prevent: bool) -> Self {
        self.prevent_retry_with_body = prevent;
        self
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn decision(&self) -> &D {
        &self.decision
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn prevents_retry_with_body(&self) -> bool {
        self.prevent_retry_with_body
    }
}

/// Request body as held for the lifetime of one retry sequence
enum Payload {
    Empty,
    /// Replayed as a fresh view for every attempt
    Buffered(Bytes),
    /// Passed through once; the sequence is a single attempt
    Unbuffered(Option<Body>),
}

impl Payload {
    fn next_body(&mut self) -> Option<Body> {
        match self {
            Payload::Empty => None,
            Payload::Buffered(bytes) => Some(Body::from(bytes.clone())),
            Payload::Unbuffered(body) => body.take(),
        }
    }

    fn allows_retry(&self) -> bool {
        !matches!(self, Payload::Unbuffered(_))
    }
}

fn outcome_of<E: std::error::Error + 'static>(
    result: &std::result::Result<Response, E>,
) -> AttemptOutcome<'_> {
    match result {
        Ok(response) => AttemptOutcome::Status(response.status()),
        Err(err) => AttemptOutcome::Error(err),
    }
}

impl<T, D, O> RetryTransport<T, D, O>
where
    T: Transport,
    D: RetryDecision<T::Error>,
    O: RetryObserver,
{
    async fn capture_body(
        &self,
        head: &RequestHead,
        body: Option<Body>,
    ) -> std::result::Result<Payload, io::Error> {
        match body {
            None => Ok(Payload::Empty),
            Some(body) if self.prevent_retry_with_body => Ok(Payload::Unbuffered(Some(body))),
            Some(body) => {
                let bytes = body.collect().await?;
                debug!(
                    method = %head.method(),
                    url = head.url(),
                    bytes = bytes.len(),
                    "buffered request body for replay"
                );
                Ok(Payload::Buffered(bytes))
            }
        }
    }

    /// One attempt, forwarding the request's cancellation to the inner
    /// transport while it is outstanding
    async fn attempt(
        &self,
        head: &RequestHead,
        body: Option<Body>,
    ) -> std::result::Result<Response, T::Error> {
        let send = self.inner.send(Request::from_parts(head.clone(), body));
        tokio::pin!(send);

        tokio::select! {
            biased;
            result = &mut send => return result,
            _ = head.cancellation_token().cancelled() => {}
        }

        debug!(
            method = %head.method(),
            url = head.url(),
            "forwarding cancellation to in-flight attempt"
        );
        self.inner.cancel(head);
        send.await
    }

    async fn execute(
        &self,
        request: Request,
    ) -> std::result::Result<Response, RetryError<T::Error>> {
        let (head, body) = request.into_parts();

        let mut payload = match self.capture_body(&head, body).await {
            Ok(payload) => payload,
            Err(err) => {
                self.observer.on_buffer_failed(&head, &err);
                return Err(RetryError::BufferBody(err));
            }
        };

        let token = head.cancellation_token();
        let start = Instant::now();
        let mut index: u32 = 0;

        loop {
            self.observer.on_attempt_start(&head, index);
            let outcome = self.attempt(&head, payload.next_body()).await;
            let attempts = index.saturating_add(1);

            let decision = if payload.allows_retry() {
                let attempt = Attempt::new(index).with_request(&head);
                let attempt = match &outcome {
                    Ok(response) => attempt.with_response(response),
                    Err(err) => attempt.with_error(err),
                };
                self.decision.decide(&attempt)
            } else {
                Decision::Stop
            };

            let delay = match decision {
                Decision::Stop => {
                    self.observer
                        .on_complete(&head, attempts, outcome_of(&outcome), start.elapsed());
                    return outcome.map_err(RetryError::Transport);
                }
                Decision::Retry { delay } => delay,
            };

            self.observer
                .on_retry(&head, index, outcome_of(&outcome), delay);

            let last_error = match outcome {
                Ok(response) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => {}
                        drained = response.into_body().drain() => {
                            debug!(
                                attempt = index,
                                bytes = drained,
                                "drained discarded response body"
                            );
                        }
                    }
                    None
                }
                Err(err) => Some(err),
            };

            if delay.is_zero() {
                // Back-to-back attempts still give timers and cancellers a turn
                tokio::task::yield_now().await;
            } else {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            if token.is_cancelled() {
                self.observer.on_cancelled(&head, attempts);
                return Err(RetryError::cancelled(attempts, last_error));
            }

            index = attempts;
        }
    }
}

impl<T, D, O> Transport for RetryTransport<T, D, O>
where
    T: Transport,
    D: RetryDecision<T::Error>,
    O: RetryObserver,
{
    type Error = RetryError<T::Error>;

    async fn send(&self, request: Request) -> std::result::Result<Response, Self::Error> {
        self.execute(request).await
    }

    /// Cancel the request's token; the running sequence forwards it to the
    /// inner transport or stops waiting between attempts
    fn cancel(&self, request: &RequestHead) {
        request.cancellation_token().cancel();
    }
}
