//! Error types for cloud provider calls.

use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by the provider boundary.
///
/// These never reach the synchronous caller that created a request; the
/// dispatcher resolves every one of them to the `Failed` state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider request failed: {0}")]
    Remote(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Circuit breaker is open, provider call skipped")]
    CircuitOpen,
}

pub type Result<T> = std::result::Result<T, ProviderError>;
