//! Retry configuration
//!
//! [`RetryConfig`] describes a retry policy and the default transport's
//! settings in plain data, so policies can live in YAML/JSON files and be
//! adjusted through `RETRIER_*` environment variables. [`ConfigLoader`]
//! resolves the precedence between those sources.

mod loader;

pub use loader::ConfigLoader;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::retry::{
    All, Any, CappedDelay, ConstantDelay, DelayStrategy, ExponentialDelay, LinearDelay, Methods,
    NoDelay, Policy, Statuses, TemporaryErrors, TransientError,
};

#[cfg(feature = "reqwest")]
use crate::retry::{RetryTransport, TracingObserver};
#[cfg(feature = "reqwest")]
use crate::transport::{HttpError, ReqwestTransport};

/// Decision function built from a [`RetryConfig`]
pub type ConfiguredPolicy<E> = Policy<All<E>, Box<dyn DelayStrategy>>;

/// Retry transport built from a [`RetryConfig`]
#[cfg(feature = "reqwest")]
pub type ConfiguredTransport =
    RetryTransport<ReqwestTransport, ConfiguredPolicy<HttpError>, TracingObserver>;

/// Delay strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DelayKind {
    /// Retry immediately
    None,

    /// `initial-delay-ms` before every retry
    Constant,

    /// `initial-delay-ms * (attempt + 1)`
    Linear,

    /// Exponential backoff in multiples of `unit-ms` (default)
    #[default]
    Exponential,
}

impl fmt::Display for DelayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DelayKind::None => "none",
            DelayKind::Constant => "constant",
            DelayKind::Linear => "linear",
            DelayKind::Exponential => "exponential",
        };
        f.write_str(name)
    }
}

impl FromStr for DelayKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(DelayKind::None),
            "constant" => Ok(DelayKind::Constant),
            "linear" => Ok(DelayKind::Linear),
            "exponential" => Ok(DelayKind::Exponential),
            other => Err(Error::invalid_config(format!(
                "unknown delay strategy '{}' (expected none, constant, linear or exponential)",
                other
            ))),
        }
    }
}

/// Retry policy and transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay strategy
    #[serde(default)]
    pub strategy: DelayKind,

    /// First delay in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Unit of the exponential strategy in milliseconds
    #[serde(default = "default_unit")]
    pub unit_ms: u64,

    /// Upper bound for any single delay; `null` disables the cap
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: Option<u64>,

    /// Response statuses that are retried
    #[serde(default = "default_retry_statuses")]
    pub retry_statuses: Vec<u16>,

    /// Methods that may be retried; empty allows every method
    #[serde(default = "default_retry_methods")]
    pub retry_methods: Vec<String>,

    /// Retry transport errors that report themselves as temporary
    #[serde(default = "default_true")]
    pub retry_temporary_errors: bool,

    /// Send requests with a body once, without buffering
    #[serde(default)]
    pub prevent_retry_with_body: bool,

    /// Per-attempt timeout of the default transport; 0 disables it
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User agent of the default transport
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            strategy: DelayKind::default(),
            initial_delay_ms: default_initial_delay(),
            unit_ms: default_unit(),
            max_delay_ms: default_max_delay(),
            retry_statuses: default_retry_statuses(),
            retry_methods: default_retry_methods(),
            retry_temporary_errors: true,
            prevent_retry_with_body: false,
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}
fn default_initial_delay() -> u64 {
    1000
}
fn default_unit() -> u64 {
    500
}
fn default_max_delay() -> Option<u64> {
    Some(30000)
}
fn default_retry_statuses() -> Vec<u16> {
    vec![408, 425, 429, 500, 502, 503, 504]
}
fn default_retry_methods() -> Vec<String> {
    ["GET", "HEAD", "OPTIONS", "PUT", "DELETE"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_true() -> bool {
    true
}
fn default_timeout() -> u64 {
    30
}
fn default_user_agent() -> String {
    format!("retrier/{}", env!("CARGO_PKG_VERSION"))
}

impl RetryConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration describes a usable policy
    pub fn validate(&self) -> Result<()> {
        self.delay_strategy()?;

        if let Some(code) = self
            .retry_statuses
            .iter()
            .find(|code| !(100..=599).contains(*code))
        {
            return Err(Error::invalid_config(format!(
                "retry-statuses contains {}, which is not an HTTP status code",
                code
            )));
        }

        if self
            .retry_methods
            .iter()
            .any(|method| method.trim().is_empty())
        {
            return Err(Error::invalid_config(
                "retry-methods must not contain empty names",
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(Error::invalid_config("user-agent must not be empty"));
        }

        Ok(())
    }

    /// Build the configured delay strategy, capped by `max-delay-ms`
    pub fn delay_strategy(&self) -> Result<Box<dyn DelayStrategy>> {
        let initial = Duration::from_millis(self.initial_delay_ms);
        let strategy: Box<dyn DelayStrategy> = match self.strategy {
            DelayKind::None => Box::new(NoDelay),
            DelayKind::Constant => Box::new(ConstantDelay::new(initial)),
            DelayKind::Linear => Box::new(LinearDelay::new(initial)),
            DelayKind::Exponential => Box::new(ExponentialDelay::new(
                initial,
                Duration::from_millis(self.unit_ms),
            )?),
        };

        Ok(match self.max_delay_ms {
            Some(max) => Box::new(CappedDelay::new(strategy, Duration::from_millis(max))),
            None => strategy,
        })
    }

    /// Build the decision function
    ///
    /// An attempt is retried when it failed with a temporary error (if
    /// enabled) or returned one of `retry-statuses`, and its method is in
    /// `retry-methods`. Every predicate is capped by `max-retries`.
    pub fn policy<E: TransientError + 'static>(&self) -> Result<ConfiguredPolicy<E>> {
        let mut reasons = Any::new();
        if self.retry_temporary_errors {
            reasons = reasons.with(TemporaryErrors::new(self.max_retries));
        }
        if !self.retry_statuses.is_empty() {
            reasons = reasons.with(Statuses::new(
                self.max_retries,
                self.retry_statuses.iter().copied(),
            ));
        }

        let mut predicate = All::new().with(reasons);
        if !self.retry_methods.is_empty() {
            predicate = predicate.with(Methods::new(
                self.max_retries,
                self.retry_methods.iter().map(String::as_str),
            ));
        }

        Ok(Policy::new(predicate, self.delay_strategy()?))
    }

    /// Build a retry transport over a [`ReqwestTransport`] configured from
    /// these settings, logging attempts through `tracing`
    #[cfg(feature = "reqwest")]
    pub fn build_transport(&self) -> Result<ConfiguredTransport> {
        self.validate()?;

        RetryTransport::builder()
            .with_transport(ReqwestTransport::from_config(self)?)
            .with_decision(self.policy()?)
            .with_observer(TracingObserver::new("http"))
            .prevent_retry_with_body(self.prevent_retry_with_body)
            .build()
    }
}
