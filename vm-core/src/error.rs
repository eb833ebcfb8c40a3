use std::fmt::{self, Display, Formatter};
use thiserror::Error;

use crate::request::ProvisioningStatus;

/// The resource dimension a quota check refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Ram,
    Cpu,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Ram => "RAM",
            Resource::Cpu => "CPU",
        }
    }
}

impl Display for Resource {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Malformed input rejected before anything is persisted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    EmptyField(&'static str),

    #[error("Invalid {resource} format: '{value}'. Expected format: {expected}")]
    InvalidFormat {
        resource: Resource,
        value: String,
        expected: &'static str,
    },
}

/// A request exceeded the quota of the caller's role.
///
/// Carries the role as supplied by the caller, the dimension that was exceeded,
/// the raw requested token and the formatted ceiling, so the rejection can be
/// rendered without re-deriving anything.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Policy violation: role '{role}' cannot request {resource}={requested}. Maximum allowed: {max_allowed}")]
pub struct PolicyViolation {
    pub role: String,
    pub resource: Resource,
    pub requested: String,
    pub max_allowed: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot {action} a request in state {from}")]
pub struct InvalidTransition {
    pub from: ProvisioningStatus,
    pub action: &'static str,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    PolicyViolation(#[from] PolicyViolation),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

pub type Result<T> = std::result::Result<T, CoreError>;
