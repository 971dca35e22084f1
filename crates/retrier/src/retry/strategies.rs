//! Retry delay strategies
//!
//! A delay strategy maps the index of the attempt that just failed to the
//! time to wait before the next one. Every strategy here is a pure function
//! of that index.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Computes the wait before the next attempt
///
/// # Example
///
/// ```rust
/// use retrier::retry::{DelayStrategy, LinearDelay};
/// use std::time::Duration;
///
/// let delay = LinearDelay::new(Duration::from_secs(1));
/// assert_eq!(delay.delay(0), Duration::from_secs(1));
/// assert_eq!(delay.delay(2), Duration::from_secs(3));
/// ```
pub trait DelayStrategy: Send + Sync {
    /// Delay to apply after the attempt with zero-based index `attempt`
    fn delay(&self, attempt: u32) -> Duration;
}

/// Retry immediately
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoDelay;

impl DelayStrategy for NoDelay {
    fn delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }
}

/// The same delay before every retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantDelay {
    delay: Duration,
}

impl ConstantDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl DelayStrategy for ConstantDelay {
    fn delay(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// Delay growing by `initial` on every attempt: `initial * (attempt + 1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearDelay {
    initial: Duration,
}

impl LinearDelay {
    pub fn new(initial: Duration) -> Self {
        Self { initial }
    }
}

impl DelayStrategy for LinearDelay {
    fn delay(&self, attempt: u32) -> Duration {
        self.initial.saturating_mul(attempt.saturating_add(1))
    }
}

/// Exponential backoff computed in whole multiples of a unit
///
/// With `factor = initial / unit`, the delay after attempt `i` is
/// `unit * factor^(i + 1)`, so the first delay is always `initial`. Working
/// in integer units keeps the sequence exact: `(2s, 1s)` gives 2s, 4s, 8s,
/// ... and `(100ms, 10ms)` gives 100ms, 1s, 10s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialDelay {
    unit: Duration,
    factor: u128,
}

impl ExponentialDelay {
    /// Create an exponential strategy
    ///
    /// # Errors
    ///
    /// `unit` must be non-zero and `initial` a whole multiple of it.
    pub fn new(initial: Duration, unit: Duration) -> Result<Self> {
        if unit.is_zero() {
            return Err(Error::invalid_policy("exponential delay unit must not be zero"));
        }
        if unit > initial {
            return Err(Error::invalid_policy(format!(
                "exponential delay unit ({}ms) must not exceed the initial delay ({}ms)",
                unit.as_millis(),
                initial.as_millis()
            )));
        }

        let (initial_nanos, unit_nanos) = (initial.as_nanos(), unit.as_nanos());
        if initial_nanos % unit_nanos != 0 {
            return Err(Error::invalid_policy(format!(
                "initial delay ({}ms) must be a whole multiple of the unit ({}ms)",
                initial.as_millis(),
                unit.as_millis()
            )));
        }

        Ok(Self {
            unit,
            factor: initial_nanos / unit_nanos,
        })
    }

    /// The delay after the first attempt
    pub fn initial(&self) -> Duration {
        self.delay(0)
    }
}

impl DelayStrategy for ExponentialDelay {
    fn delay(&self, attempt: u32) -> Duration {
        let multiplier = self.factor.saturating_pow(attempt.saturating_add(1));
        saturating_from_nanos(self.unit.as_nanos().saturating_mul(multiplier))
    }
}

/// Caps another strategy at a maximum delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CappedDelay<D> {
    inner: D,
    max: Duration,
}

impl<D> CappedDelay<D> {
    pub fn new(inner: D, max: Duration) -> Self {
        Self { inner, max }
    }
}

impl<D: DelayStrategy> DelayStrategy for CappedDelay<D> {
    fn delay(&self, attempt: u32) -> Duration {
        self.inner.delay(attempt).min(self.max)
    }
}

fn saturating_from_nanos(nanos: u128) -> Duration {
    let secs = nanos / NANOS_PER_SEC;
    if secs > u128::from(u64::MAX) {
        return Duration::MAX;
    }
    Duration::new(secs as u64, (nanos % NANOS_PER_SEC) as u32)
}

impl<D: DelayStrategy + ?Sized> DelayStrategy for Box<D> {
    fn delay(&self, attempt: u32) -> Duration {
        (**self).delay(attempt)
    }
}

impl<D: DelayStrategy + ?Sized> DelayStrategy for Arc<D> {
    fn delay(&self, attempt: u32) -> Duration {
        (**self).delay(attempt)
    }
}

impl<D: DelayStrategy + ?Sized> DelayStrategy for &D {
    fn delay(&self, attempt: u32) -> Duration {
        (**self).delay(attempt)
    }
}
