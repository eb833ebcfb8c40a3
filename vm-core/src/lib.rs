//! Domain core for VM provisioning.
//!
//! Holds the provisioning request entity with its lifecycle state machine and
//! the per-role quota policy. Nothing here touches storage, the network or a
//! runtime; the orchestrator and provider crates build on these types.

pub mod error;
pub mod quota;
pub mod request;

pub use error::{CoreError, InvalidTransition, PolicyViolation, Resource, Result, ValidationError};
pub use quota::{enforce, Limit, ResourceQuota, LEAST_PRIVILEGED_ROLE};
pub use request::{ProvisioningRequest, ProvisioningStatus};
