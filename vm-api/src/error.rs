use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use vm_core::{CoreError, PolicyViolation};
use vm_orchestrator::OrchestratorError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    PolicyViolation(PolicyViolation),
    Conflict(String),
    Unavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::PolicyViolation(violation) => return policy_violation_response(violation),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Problem-details body naming the role, the exceeded resource and both values.
fn policy_violation_response(violation: PolicyViolation) -> Response {
    let body = json!({
        "type": "about:blank",
        "title": "Policy Violation",
        "status": StatusCode::FORBIDDEN.as_u16(),
        "detail": violation.to_string(),
        "userRole": violation.role,
        "violatedResource": violation.resource.as_str(),
        "requestedValue": violation.requested,
        "maxAllowed": violation.max_allowed,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (StatusCode::FORBIDDEN, Json(body)).into_response()
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => ApiError::BadRequest(e.to_string()),
            CoreError::PolicyViolation(v) => ApiError::PolicyViolation(v),
            CoreError::InvalidTransition(e) => ApiError::Conflict(e.to_string()),
        }
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::Core(e) => e.into(),
            OrchestratorError::NotFound(id) => {
                ApiError::NotFound(format!("Provisioning request not found: {}", id))
            }
            OrchestratorError::InvalidInput(msg) => ApiError::BadRequest(msg),
            OrchestratorError::SignalClosed => ApiError::Unavailable(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}
