use std::sync::Arc;

use tracing::{error, info, instrument};
use uuid::Uuid;
use vm_core::ProvisioningRequest;

use crate::error::{OrchestratorError, Result};
use crate::identity::RoleResolver;
use crate::signal::RequestSignal;
use crate::store::ProvisioningStore;

/// Synchronous entry point for new provisioning requests.
///
/// Validates input, applies the caller's quota, commits the request and then
/// hands its id to the dispatcher. Provisioning itself happens later; callers
/// observe the outcome by reading the request again.
#[derive(Clone)]
pub struct ProvisioningOrchestrator {
    store: Arc<dyn ProvisioningStore>,
    roles: Arc<dyn RoleResolver>,
    signal: Arc<dyn RequestSignal>,
}

impl ProvisioningOrchestrator {
    pub fn new(
        store: Arc<dyn ProvisioningStore>,
        roles: Arc<dyn RoleResolver>,
        signal: Arc<dyn RequestSignal>,
    ) -> Self {
        Self {
            store,
            roles,
            signal,
        }
    }

    /// Create a request on behalf of `requester`, using the role on record for them.
    pub async fn create(&self, requester: &str, ram: &str, cpu: &str) -> Result<ProvisioningRequest> {
        let role = self.roles.resolve_role(requester);
        self.create_with_role(&role, requester, ram, cpu).await
    }

    /// Create a request with an explicitly supplied role.
    #[instrument(skip(self))]
    pub async fn create_with_role(
        &self,
        role: &str,
        requester: &str,
        ram: &str,
        cpu: &str,
    ) -> Result<ProvisioningRequest> {
        let request = ProvisioningRequest::new(requester, ram, cpu)?;
        vm_core::enforce(role, ram, cpu)?;

        let saved = self.store.save(&request).await?;
        info!(request_id = %saved.id(), status = %saved.status(), "Provisioning request saved");

        // Only after the commit above may the dispatcher learn about the request.
        // Note: a failed publish leaves the committed request in PendingApproval with
        // nothing scheduled to dispatch it, and a caller retrying creates a second request.
        if let Err(e) = self.signal.publish(saved.id()).await {
            error!(request_id = %saved.id(), "Failed to schedule dispatch: {}", e);
            return Err(e);
        }

        Ok(saved)
    }

    /// Read the current state of a request.
    pub async fn get(&self, id: Uuid) -> Result<ProvisioningRequest> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(id.to_string()))
    }
}
