//! # retrier
//!
//! Retry decisions for HTTP clients, layered beneath the transport:
//! - Pure delay strategies and retry predicates
//! - `All`/`Any` combinators and the predicate + delay decision function
//! - [`RetryTransport`], a transport decorator that owns the attempt loop,
//!   buffers and replays request bodies, and forwards cancellation
//! - Configuration loading for policies (YAML/JSON files and `RETRIER_*`
//!   environment variables)
//!
//! # Example
//!
//! ```rust,no_run
//! use retrier::http::{Method, Request};
//! use retrier::retry::{policy, ExponentialDelay, TemporaryErrors};
//! use retrier::{RetryTransport, Transport};
//! use std::time::Duration;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let delay = ExponentialDelay::new(Duration::from_millis(200), Duration::from_millis(100))?;
//!     let transport = RetryTransport::builder()
//!         .with_decision(policy(TemporaryErrors::new(3), delay))
//!         .build()?;
//!
//!     let response = transport
//!         .send(Request::new(Method::GET, "https://example.com"))
//!         .await?;
//!     println!("status: {}", response.status());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod retry;
pub mod transport;

pub use config::{ConfigLoader, DelayKind, RetryConfig};
pub use error::{Error, Result};
pub use retry::{RetryError, RetryTransport, RetryTransportBuilder};
pub use transport::Transport;

#[cfg(feature = "reqwest")]
pub use transport::{HttpError, ReqwestTransport};
