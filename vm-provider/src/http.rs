use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use vm_core::ProvisioningRequest;

use crate::client::{CloudClient, InstanceHandle};
use crate::error::{ProviderError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpCloudClientConfig {
    pub base_url: String,
    pub image_ref: String,
}

impl Default for HttpCloudClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            image_ref: "ubuntu-22.04".to_string(),
        }
    }
}

/// Compute API client that creates one server per provisioning request.
///
/// Sends `POST {base_url}/servers` and reads the instance id from `server.id`
/// in the response body.
#[derive(Debug, Clone)]
pub struct HttpCloudClient {
    http: reqwest::Client,
    config: HttpCloudClientConfig,
}

#[derive(Debug, Deserialize)]
struct CreateServerResponse {
    server: CreatedServer,
}

#[derive(Debug, Deserialize)]
struct CreatedServer {
    id: String,
}

impl HttpCloudClient {
    pub fn new(config: HttpCloudClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn servers_url(&self) -> String {
        format!("{}/servers", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CloudClient for HttpCloudClient {
    fn name(&self) -> &'static str {
        "openstack"
    }

    async fn provision_instance(&self, request: &ProvisioningRequest) -> Result<InstanceHandle> {
        let url = self.servers_url();
        let payload = json!({
            "server": {
                "name": format!("vm-{}", request.id()),
                "imageRef": self.config.image_ref,
            }
        });

        debug!(%url, request_id = %request.id(), "Creating server");

        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::Remote(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Remote(format!(
                "{} returned {}: {}",
                url, status, body
            )));
        }

        let body: CreateServerResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        Ok(InstanceHandle::new(body.server.id))
    }
}
