//! Predicate combinators and decision functions
//!
//! [`All`] and [`Any`] combine predicates with AND/OR semantics. [`Policy`]
//! pairs a predicate with a delay strategy into the decision function the
//! retry transport consults after every attempt.

use std::sync::Arc;
use std::time::Duration;

use super::predicates::{Attempt, RetryPredicate};
use super::strategies::DelayStrategy;

/// True only when every predicate is true for the same attempt
///
/// With no predicates, `All` is true: nothing forbids the retry.
pub struct All<E: ?Sized> {
    predicates: Vec<Box<dyn RetryPredicate<E>>>,
}

impl<E: ?Sized> All<E> {
    pub fn new() -> Self {
        Self {
            predicates: Vec::new(),
        }
    }

    /// Append a predicate
    pub fn with<P: RetryPredicate<E> + 'static>(mut self, predicate: P) -> Self {
        self.predicates.push(Box::new(predicate));
        self
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl<E: ?Sized> Default for All<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ?Sized> From<Vec<Box<dyn RetryPredicate<E>>>> for All<E> {
    fn from(predicates: Vec<Box<dyn RetryPredicate<E>>>) -> Self {
        Self { predicates }
    }
}

impl<E: ?Sized> RetryPredicate<E> for All<E> {
    fn should_retry(&self, attempt: &Attempt<'_, E>) -> bool {
        self.predicates.iter().all(|p| p.should_retry(attempt))
    }
}

/// True when at least one predicate is true for the attempt
///
/// With no predicates, `Any` is false: nothing justifies the retry.
pub struct Any<E: ?Sized> {
    predicates: Vec<Box<dyn RetryPredicate<E>>>,
}

impl<E: ?Sized> Any<E> {
    pub fn new() -> Self {
        Self {
            predicates: Vec::new(),
        }
    }

    /// Append a predicate
    pub fn with<P: RetryPredicate<E> + 'static>(mut self, predicate: P) -> Self {
        self.predicates.push(Box::new(predicate));
        self
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl<E: ?Sized> Default for Any<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ?Sized> From<Vec<Box<dyn RetryPredicate<E>>>> for Any<E> {
    fn from(predicates: Vec<Box<dyn RetryPredicate<E>>>) -> Self {
        Self { predicates }
    }
}

impl<E: ?Sized> RetryPredicate<E> for Any<E> {
    fn should_retry(&self, attempt: &Attempt<'_, E>) -> bool {
        self.predicates.iter().any(|p| p.should_retry(attempt))
    }
}

/// Outcome of a decision function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Make another attempt after waiting `delay`
    Retry { delay: Duration },
    /// Hand the current outcome to the caller
    Stop,
}

impl Decision {
    pub fn should_retry(&self) -> bool {
        matches!(self, Decision::Retry { .. })
    }

    /// The wait before the next attempt; zero when not retrying
    pub fn delay(&self) -> Duration {
        match self {
            Decision::Retry { delay } => *delay,
            Decision::Stop => Duration::ZERO,
        }
    }

    /// `(should_retry, delay)`
    pub fn into_parts(self) -> (bool, Duration) {
        (self.should_retry(), self.delay())
    }
}

/// Decides after each attempt whether to retry and how long to wait
pub trait RetryDecision<E: ?Sized>: Send + Sync {
    fn decide(&self, attempt: &Attempt<'_, E>) -> Decision;
}

impl<E: ?Sized, D: RetryDecision<E> + ?Sized> RetryDecision<E> for Box<D> {
    fn decide(&self, attempt: &Attempt<'_, E>) -> Decision {
        (**self).decide(attempt)
    }
}

impl<E: ?Sized, D: RetryDecision<E> + ?Sized> RetryDecision<E> for Arc<D> {
    fn decide(&self, attempt: &Attempt<'_, E>) -> Decision {
        (**self).decide(attempt)
    }
}

/// A predicate paired with a delay strategy
///
/// The delay strategy is consulted only when the predicate asks for a
/// retry, at the same attempt index.
///
/// # Example
///
/// ```rust
/// use retrier::retry::{Attempt, Decision, LinearDelay, Policy, RetryDecision, TemporaryErrors};
/// use std::io;
/// use std::time::Duration;
///
/// let policy = Policy::new(TemporaryErrors::new(2), LinearDelay::new(Duration::from_secs(1)));
/// let timeout = io::Error::from(io::ErrorKind::TimedOut);
///
/// let decision = policy.decide(&Attempt::new(1).with_error(&timeout));
/// assert_eq!(decision, Decision::Retry { delay: Duration::from_secs(2) });
/// ```
#[derive(Debug, Clone)]
pub struct Policy<P, D> {
    predicate: P,
    delay: D,
}

impl<P, D> Policy<P, D> {
    pub fn new(predicate: P, delay: D) -> Self {
        Self { predicate, delay }
    }

    pub fn predicate(&self) -> &P {
        &self.predicate
    }

    pub fn delay_strategy(&self) -> &D {
        &self.delay
    }
}

impl<E, P, D> RetryDecision<E> for Policy<P, D>
where
    E: ?Sized,
    P: RetryPredicate<E>,
    D: DelayStrategy,
{
    fn decide(&self, attempt: &Attempt<'_, E>) -> Decision {
        if self.predicate.should_retry(attempt) {
            Decision::Retry {
                delay: self.delay.delay(attempt.index),
            }
        } else {
            Decision::Stop
        }
    }
}

/// Combine predicates with AND semantics
pub fn all<E: ?Sized>(predicates: Vec<Box<dyn RetryPredicate<E>>>) -> All<E> {
    All::from(predicates)
}

/// Combine predicates with OR semantics
pub fn any<E: ?Sized>(predicates: Vec<Box<dyn RetryPredicate<E>>>) -> Any<E> {
    Any::from(predicates)
}

/// Shorthand for [`Policy::new`]
pub fn policy<P, D>(predicate: P, delay: D) -> Policy<P, D> {
    Policy::new(predicate, delay)
}
