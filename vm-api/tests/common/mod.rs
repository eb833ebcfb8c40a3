//! Common test utilities and helpers for vm-api tests
//!
//! Builds the full service stack over an in-memory database, with the cloud
//! provider replaced by the mock client.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::SqlitePool;
use vm_api::AppState;
use vm_orchestrator::{
    Dispatcher, DispatcherConfig, DispatcherHandle, RoleDirectory, SqliteProvisioningStore,
};
use vm_provider::mock::MockCloudClient;
use vm_provider::{BreakerConfig, ResilientProvider};

pub use vm_orchestrator::test_utils::create_test_db;

/// Running service wired to a mock provider
pub struct TestService {
    pub app: Router,
    pub pool: SqlitePool,
    pub client: Arc<MockCloudClient>,
    pub dispatcher: DispatcherHandle,
}

pub fn test_roles() -> RoleDirectory {
    RoleDirectory::new()
        .with_role("trainee-user", "TRAINEE")
        .with_role("dev-user", "DEV")
        .with_role("admin-user", "ADMIN")
}

/// Create a test app with the given mock provider behaviour
pub async fn spawn_service(client: MockCloudClient) -> TestService {
    let pool = create_test_db().await;
    let client = Arc::new(client);

    let provider = Arc::new(ResilientProvider::new(
        client.clone(),
        Duration::from_millis(200),
        BreakerConfig::default(),
    ));
    let store = Arc::new(SqliteProvisioningStore::new(pool.clone()));
    let (signal, dispatcher) = Dispatcher::new(store, provider).spawn(&DispatcherConfig::default());

    let state = AppState::new(pool.clone(), Arc::new(test_roles()), Arc::new(signal));
    let app = vm_api::create_app(state)
        .await
        .expect("Failed to create test app");

    TestService {
        app,
        pool,
        client,
        dispatcher,
    }
}

/// Helper to extract JSON body from axum response
pub async fn extract_json_body<T>(response: axum::response::Response) -> T
where
    T: serde::de::DeserializeOwned,
{
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");

    serde_json::from_slice(&body).expect("Failed to deserialize JSON")
}

impl TestService {
    /// Send a request to the API
    pub async fn send_request(
        &self,
        request: axum::http::Request<axum::body::Body>,
    ) -> axum::http::Response<axum::body::Body> {
        use tower::ServiceExt;
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Post JSON to an endpoint with arbitrary headers
    pub async fn post_with_headers(
        &self,
        uri: &str,
        body: &serde_json::Value,
        headers: &[(&str, &[u8])],
    ) -> axum::http::Response<axum::body::Body> {
        let mut builder = axum::http::Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");

        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = builder
            .body(axum::body::Body::from(body.to_string()))
            .unwrap();
        self.send_request(request).await
    }

    /// Post JSON to an endpoint
    pub async fn post(
        &self,
        uri: &str,
        body: &serde_json::Value,
        user: Option<&str>,
    ) -> axum::http::Response<axum::body::Body> {
        let mut builder = axum::http::Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");

        if let Some(user) = user {
            builder = builder.header("x-user", user);
        }

        let request = builder
            .body(axum::body::Body::from(body.to_string()))
            .unwrap();
        self.send_request(request).await
    }

    /// Get request to an endpoint
    pub async fn get(&self, uri: &str, user: Option<&str>) -> axum::http::Response<axum::body::Body> {
        let mut builder = axum::http::Request::builder().method("GET").uri(uri);

        if let Some(user) = user {
            builder = builder.header("x-user", user);
        }

        let request = builder.body(axum::body::Body::empty()).unwrap();
        self.send_request(request).await
    }

    /// Drop the router (and with it the dispatch signal) and wait for the dispatcher to drain.
    pub async fn shutdown(self) -> (SqlitePool, Arc<MockCloudClient>) {
        let TestService {
            app,
            pool,
            client,
            dispatcher,
        } = self;
        drop(app);
        dispatcher.join().await;
        (pool, client)
    }
}

/// Count stored provisioning requests
pub async fn count_requests(pool: &SqlitePool) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM provisioning_requests")
        .fetch_one(pool)
        .await
        .expect("Failed to count requests");
    count
}
