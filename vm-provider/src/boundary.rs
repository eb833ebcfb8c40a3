use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};
use vm_core::ProvisioningRequest;

use crate::breaker::{BreakerConfig, BreakerState, CircuitBreaker};
use crate::client::{CloudClient, InstanceHandle};
use crate::error::{ProviderError, Result};

/// Marker returned in place of an instance when the provider could not be used.
pub const FALLBACK_SENTINEL: &str = "QUEUE-WAITING-ALLOCATION";

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(3);

/// Result of one pass through the provider boundary.
///
/// Provider failures are never raised from [`ResilientProvider::provision`];
/// they come back as [`ProvisionOutcome::Fallback`] carrying the sentinel and
/// the underlying cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Provisioned(InstanceHandle),
    Fallback {
        sentinel: &'static str,
        cause: ProviderError,
    },
}

impl ProvisionOutcome {
    /// Collapse to a plain result; any fallback becomes its cause.
    pub fn into_result(self) -> Result<InstanceHandle> {
        match self {
            ProvisionOutcome::Provisioned(handle) => Ok(handle),
            ProvisionOutcome::Fallback { cause, .. } => Err(cause),
        }
    }
}

/// Wraps a [`CloudClient`] with a call timeout and a circuit breaker.
pub struct ResilientProvider {
    client: Arc<dyn CloudClient>,
    breaker: CircuitBreaker,
    timeout: Duration,
}

impl ResilientProvider {
    pub fn new(client: Arc<dyn CloudClient>, timeout: Duration, breaker: BreakerConfig) -> Self {
        let breaker = CircuitBreaker::new(client.name(), breaker);
        Self {
            client,
            breaker,
            timeout,
        }
    }

    pub fn breaker_state(&self) -> BreakerState {
        self.breaker.state()
    }

    #[instrument(skip_all, fields(request_id = %request.id(), provider = self.client.name()))]
    pub async fn provision(&self, request: &ProvisioningRequest) -> ProvisionOutcome {
        if !self.breaker.try_acquire() {
            return self.fallback(ProviderError::CircuitOpen);
        }

        let result = match tokio::time::timeout(
            self.timeout,
            self.client.provision_instance(request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.timeout)),
        };

        match result {
            Ok(handle) => {
                self.breaker.record_success();
                info!(instance = %handle, "Provider allocated instance");
                ProvisionOutcome::Provisioned(handle)
            }
            Err(cause) => {
                self.breaker.record_failure();
                self.fallback(cause)
            }
        }
    }

    fn fallback(&self, cause: ProviderError) -> ProvisionOutcome {
        warn!(cause = %cause, sentinel = FALLBACK_SENTINEL, "Provider unavailable, using fallback");
        ProvisionOutcome::Fallback {
            sentinel: FALLBACK_SENTINEL,
            cause,
        }
    }
}
