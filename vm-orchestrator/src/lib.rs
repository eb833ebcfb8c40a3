//! Provisioning orchestration business logic
//!
//! This crate owns the request flow around the domain types in `vm-core`: the
//! use case that accepts new requests, the durable store they are committed
//! to, and the dispatcher that later drives each one through the provider
//! boundary. It is consumed by the vm-api HTTP service but can also be
//! embedded by other entry points.

pub mod db;
pub mod dispatcher;
pub mod error;
pub mod identity;
pub mod provisioning;
pub mod signal;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use dispatcher::{Dispatcher, DispatcherConfig, DispatcherHandle};
pub use error::{OrchestratorError, Result};
pub use identity::{RoleDirectory, RoleResolver};
pub use provisioning::ProvisioningOrchestrator;
pub use signal::{RequestSignal, SignalReceiver, SignalSender};
pub use store::{InMemoryProvisioningStore, ProvisioningStore, SqliteProvisioningStore};
