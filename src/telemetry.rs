//! Tracing bootstrap helpers.
//!
//! The crate logs through [`tracing`]; embedding applications usually install
//! their own subscriber. These helpers cover binaries and tests that just
//! want `RUST_LOG`-controlled fmt output.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Failure installing the global subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to install tracing subscriber: {0}")]
    Init(String),
}

/// Install an fmt subscriber filtered by `RUST_LOG` (default `info`).
/// Fails if a global subscriber is already set.
pub fn try_init() -> Result<(), TelemetryError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()
        .map_err(|err| TelemetryError::Init(err.to_string()))
}

/// Like [`try_init`], but quietly keeps an already-installed subscriber.
pub fn init() {
    let _ = try_init();
}
