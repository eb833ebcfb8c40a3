use crate::{auth::AuthenticatedUser, error::ApiResult, state::AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use vm_core::{ProvisioningRequest, ProvisioningStatus};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/provisioning", post(create_request))
        .route("/api/v1/provisioning/{id}", get(get_request))
}

/// Body of a new provisioning request.
///
/// `username` is accepted for compatibility but the authenticated principal
/// always takes its place.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CreateProvisioningBody {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub ram: String,
    #[serde(default)]
    pub cpu: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResponse {
    pub id: Uuid,
    pub status: ProvisioningStatus,
    pub tracking_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestView {
    pub id: Uuid,
    pub requester: String,
    pub ram: String,
    pub cpu: String,
    pub status: ProvisioningStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&ProvisioningRequest> for RequestView {
    fn from(request: &ProvisioningRequest) -> Self {
        Self {
            id: request.id(),
            requester: request.requester().to_string(),
            ram: request.ram().to_string(),
            cpu: request.cpu().to_string(),
            status: request.status(),
            created_at: request.created_at(),
            updated_at: request.updated_at(),
        }
    }
}

async fn create_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<CreateProvisioningBody>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let request = state
        .orchestrator
        .create(&user.username, &body.ram, &body.cpu)
        .await?;

    info!(request_id = %request.id(), user = %user.username, "Provisioning request accepted");

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: request.id(),
            status: request.status(),
            tracking_id: request.id().to_string(),
        }),
    ))
}

async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RequestView>> {
    let request = state.orchestrator.get(id).await?;
    Ok(Json(RequestView::from(&request)))
}
