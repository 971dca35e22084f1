//! Retry policies and the retrying transport
//!
//! Retry decisions are built from small immutable values:
//!
//! - Delay strategies: none, constant, linear, exponential and capped
//! - Predicates over one finished attempt (temporary errors, status codes,
//!   methods, attempt caps, closures)
//! - `All`/`Any` combinators and `Policy`, which pairs a predicate with a
//!   delay strategy into a decision function
//! - `RetryTransport`, which runs the attempt loop over another transport
//! - Observable attempts via the `RetryObserver` trait, with a built-in
//!   `TracingObserver` for logging
//!
//! # Example
//!
//! ```rust,no_run
//! use retrier::http::{Method, Request};
//! use retrier::retry::{policy, All, LinearDelay, Methods, RetryTransport, Statuses};
//! use retrier::Transport;
//! use std::time::Duration;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let decision = policy(
//!         All::new().with(Statuses::default_http(3)).with(Methods::idempotent(3)),
//!         LinearDelay::new(Duration::from_millis(500)),
//!     );
//!     let transport = RetryTransport::with_default_transport(decision)?;
//!
//!     let response = transport.send(Request::new(Method::GET, "https://example.com")).await?;
//!     assert!(response.is_success());
//!     Ok(())
//! }
//! ```

mod combinators;
mod error;
mod executor;
mod observer;
mod predicates;
mod strategies;

pub use combinators::{all, any, policy, All, Any, Decision, Policy, RetryDecision};
pub use error::RetryError;
pub use executor::{
    DefaultTransport, NoDecision, RetryTransport, RetryTransportBuilder, TransportSource,
};
pub use observer::{AttemptOutcome, NoOpObserver, RetryObserver, StatsObserver, TracingObserver};
pub use predicates::{
    AlwaysRetry, Attempt, ClosurePredicate, ErrorMatches, MaxRetries, Methods, NeverRetry,
    RetryPredicate, StatusRange, Statuses, TemporaryErrors, TransientError,
};
pub use strategies::{
    CappedDelay, ConstantDelay, DelayStrategy, ExponentialDelay, LinearDelay, NoDelay,
};
