//! Error types for retrier construction and configuration
//!
//! Failures of an individual retry sequence are reported through
//! [`RetryError`](crate::retry::RetryError); this type covers everything that
//! can go wrong before a request is ever sent.

use thiserror::Error;

/// Result type alias using retrier's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Construction and configuration errors
#[derive(Error, Debug)]
pub enum Error {
    /// Policy parameters that cannot produce a well-defined strategy
    #[error("Invalid retry policy: {message}")]
    InvalidPolicy { message: String },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The default HTTP client could not be built
    #[cfg(feature = "reqwest")]
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

impl Error {
    /// Create an invalid policy error
    pub fn invalid_policy(message: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            message: message.into(),
        }
    }

    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
