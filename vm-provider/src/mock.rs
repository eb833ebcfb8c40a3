use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use vm_core::ProvisioningRequest;

use crate::client::{CloudClient, InstanceHandle};
use crate::error::{ProviderError, Result};

#[derive(Debug, Clone)]
pub enum MockBehavior {
    Succeed(String),
    Fail(String),
    /// Succeed after a delay.
    Delay(Duration, String),
    /// Never return.
    Hang,
}

/// In-process stand-in for a cloud provider that counts its calls.
#[derive(Debug)]
pub struct MockCloudClient {
    behavior: MockBehavior,
    calls: AtomicUsize,
}

impl MockCloudClient {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn succeeding(instance_id: &str) -> Self {
        Self::new(MockBehavior::Succeed(instance_id.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::new(MockBehavior::Fail(message.to_string()))
    }

    pub fn hanging() -> Self {
        Self::new(MockBehavior::Hang)
    }

    pub fn delayed(delay: Duration, instance_id: &str) -> Self {
        Self::new(MockBehavior::Delay(delay, instance_id.to_string()))
    }

    /// Number of times the remote call was actually made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CloudClient for MockCloudClient {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn provision_instance(&self, _request: &ProvisioningRequest) -> Result<InstanceHandle> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            MockBehavior::Succeed(id) => Ok(InstanceHandle::new(id.clone())),
            MockBehavior::Fail(message) => Err(ProviderError::Remote(message.clone())),
            MockBehavior::Delay(delay, id) => {
                tokio::time::sleep(*delay).await;
                Ok(InstanceHandle::new(id.clone()))
            }
            MockBehavior::Hang => std::future::pending().await,
        }
    }
}
