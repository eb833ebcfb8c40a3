//! Provider boundary for VM provisioning.
//!
//! Defines the [`CloudClient`] port a remote provider is reached through, an
//! HTTP implementation of it, and [`ResilientProvider`], which wraps any client
//! with a call timeout and a circuit breaker so that provider failures come
//! back as a fallback outcome instead of an error.

pub mod boundary;
pub mod breaker;
pub mod client;
pub mod error;
pub mod http;

// When the `test-helpers` feature is enabled, include the mock client.
#[cfg(any(test, feature = "test-helpers"))]
pub mod mock;

pub use boundary::{ProvisionOutcome, ResilientProvider, DEFAULT_CALL_TIMEOUT, FALLBACK_SENTINEL};
pub use breaker::{BreakerConfig, BreakerState, CircuitBreaker};
pub use client::{CloudClient, InstanceHandle};
pub use error::{ProviderError, Result};
pub use http::{HttpCloudClient, HttpCloudClientConfig};
