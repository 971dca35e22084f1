//! Common test infrastructure for retrier integration tests
//!
//! # Usage
//!
//! In your test file, add:
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! # Modules
//!
//! - `mock_transport`: Scriptable in-memory transport recording calls,
//!   cancellations and the bodies it received
//! - `bodies`: Request bodies whose stream fails part-way
//! - `mock_server`: Wiremock setup helpers for the reqwest transport

// Not every test binary uses every helper
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod bodies;
pub mod mock_server;
pub mod mock_transport;

pub use bodies::*;
pub use mock_server::*;
pub use mock_transport::*;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Route `tracing` output to the test harness; controlled by `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_test_writer())
        .with(EnvFilter::from_default_env())
        .try_init();
}
