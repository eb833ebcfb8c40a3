//! Integration tests for REST API endpoints
//!
//! Drives the provisioning endpoints end to end: request intake, quota
//! rejection, status reads and the asynchronous outcome written by the
//! dispatcher.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::{json, Value};
use vm_provider::mock::MockCloudClient;

const PROVISIONING: &str = "/api/v1/provisioning";

/// Poll the status endpoint until the request leaves the in-progress states.
async fn wait_for_settled(service: &common::TestService, id: &str, user: &str) -> Value {
    let uri = format!("{}/{}", PROVISIONING, id);

    for _ in 0..100 {
        let response = service.get(&uri, Some(user)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = common::extract_json_body(response).await;

        match body["status"].as_str() {
            Some("ACTIVE") | Some("FAILED") => return body,
            _ => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }

    panic!("request {} never settled", id);
}

#[tokio::test]
async fn test_create_request_returns_created() {
    let service = common::spawn_service(MockCloudClient::succeeding("i-123")).await;

    let response = service
        .post(
            PROVISIONING,
            &json!({ "username": "will-be-overridden", "ram": "4GB", "cpu": "2vCPU" }),
            Some("trainee-user"),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = common::extract_json_body(response).await;
    assert_eq!(body["status"], "PENDING_APPROVAL");
    assert_eq!(body["trackingId"], body["id"]);

    let id = body["id"].as_str().unwrap().to_string();
    let settled = wait_for_settled(&service, &id, "trainee-user").await;

    assert_eq!(settled["status"], "ACTIVE");
    assert_eq!(settled["requester"], "trainee-user"); // From auth header
    assert_eq!(settled["ram"], "4GB");
    assert_eq!(settled["cpu"], "2vCPU");
    assert!(settled["updatedAt"].is_string());
    assert_eq!(service.client.calls(), 1);
}

#[tokio::test]
async fn test_create_request_without_auth_fails() {
    let service = common::spawn_service(MockCloudClient::succeeding("i-123")).await;

    let response = service
        .post(PROVISIONING, &json!({ "ram": "4GB", "cpu": "2vCPU" }), None)
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_quota_violation_returns_problem_details() {
    let service = common::spawn_service(MockCloudClient::succeeding("i-123")).await;

    let response = service
        .post(
            PROVISIONING,
            &json!({ "ram": "16GB", "cpu": "2vCPU" }),
            Some("trainee-user"),
        )
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body: Value = common::extract_json_body(response).await;
    assert_eq!(body["title"], "Policy Violation");
    assert_eq!(body["userRole"], "TRAINEE");
    assert_eq!(body["violatedResource"], "RAM");
    assert_eq!(body["requestedValue"], "16GB");
    assert_eq!(body["maxAllowed"], "8GB");

    let (pool, client) = service.shutdown().await;
    assert_eq!(common::count_requests(&pool).await, 0);
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_unknown_principal_gets_trainee_quota() {
    let service = common::spawn_service(MockCloudClient::succeeding("i-123")).await;

    let response = service
        .post(
            PROVISIONING,
            &json!({ "ram": "8GB", "cpu": "8vCPU" }),
            Some("stranger"),
        )
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = common::extract_json_body(response).await;
    assert_eq!(body["violatedResource"], "CPU");
    assert_eq!(body["maxAllowed"], "4vCPU");
}

#[tokio::test]
async fn test_admin_is_not_limited() {
    let service = common::spawn_service(MockCloudClient::succeeding("i-123")).await;

    let response = service
        .post(
            PROVISIONING,
            &json!({ "ram": "512GB", "cpu": "128vCPU" }),
            Some("admin-user"),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_invalid_input_returns_bad_request() {
    let service = common::spawn_service(MockCloudClient::succeeding("i-123")).await;

    for body in [
        json!({ "cpu": "2vCPU" }),
        json!({ "ram": "lots", "cpu": "2vCPU" }),
        json!({ "ram": "4GB", "cpu": "many" }),
    ] {
        let response = service.post(PROVISIONING, &body, Some("dev-user")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {}", body);
    }

    let (pool, _client) = service.shutdown().await;
    assert_eq!(common::count_requests(&pool).await, 0);
}

#[tokio::test]
async fn test_provider_failure_ends_failed() {
    let service = common::spawn_service(MockCloudClient::failing("503 Service Unavailable")).await;

    let response = service
        .post(
            PROVISIONING,
            &json!({ "ram": "16GB", "cpu": "4vCPU" }),
            Some("dev-user"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = common::extract_json_body(response).await;
    let id = body["id"].as_str().unwrap().to_string();

    let settled = wait_for_settled(&service, &id, "dev-user").await;
    assert_eq!(settled["status"], "FAILED");
}

#[tokio::test]
async fn test_get_unknown_request_returns_404() {
    let service = common::spawn_service(MockCloudClient::succeeding("i-123")).await;

    let response = service
        .get(
            &format!("{}/{}", PROVISIONING, uuid::Uuid::new_v4()),
            Some("dev-user"),
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_malformed_id_returns_400() {
    let service = common::spawn_service(MockCloudClient::succeeding("i-123")).await;

    let response = service
        .get(&format!("{}/not-a-uuid", PROVISIONING), Some("dev-user"))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_endpoints() {
    let service = common::spawn_service(MockCloudClient::succeeding("i-123")).await;

    let response = service.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = common::extract_json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "vm-api");

    let response = service.get("/health/ready", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = common::extract_json_body(response).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["database"], "connected");
}
