use std::fmt::{self, Display, Formatter};

use async_trait::async_trait;
use vm_core::ProvisioningRequest;

use crate::error::Result;

/// Provider-assigned identifier of a created instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceHandle(String);

impl InstanceHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for InstanceHandle {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The raw remote provisioning call.
///
/// Implementations should not apply their own timeout or retry policy; the
/// [`ResilientProvider`](crate::ResilientProvider) wrapping them owns both.
#[async_trait]
pub trait CloudClient: Send + Sync {
    /// Short name used in logs (e.g. "openstack").
    fn name(&self) -> &'static str;

    async fn provision_instance(&self, request: &ProvisioningRequest) -> Result<InstanceHandle>;
}
