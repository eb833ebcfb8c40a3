use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;
use vm_core::{ProvisioningRequest, ProvisioningStatus};

use crate::error::{OrchestratorError, Result};

/// Durable home of provisioning requests.
///
/// `save` is an upsert keyed by the request id. When it returns, the write is
/// committed and visible to any later `find_by_id`, from any task.
#[async_trait]
pub trait ProvisioningStore: Send + Sync {
    async fn save(&self, request: &ProvisioningRequest) -> Result<ProvisioningRequest>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ProvisioningRequest>>;
}

#[derive(Clone)]
pub struct SqliteProvisioningStore {
    pool: SqlitePool,
}

impl SqliteProvisioningStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a reference to the database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ProvisioningStore for SqliteProvisioningStore {
    #[instrument(skip_all, fields(request_id = %request.id(), status = %request.status()))]
    async fn save(&self, request: &ProvisioningRequest) -> Result<ProvisioningRequest> {
        let mut tx = self.pool.begin().await?;

        // Identity, requester and resources are written once and never updated.
        sqlx::query(
            r#"
            INSERT INTO provisioning_requests (id, requester, ram, cpu, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(request.id().to_string())
        .bind(request.requester())
        .bind(request.ram())
        .bind(request.cpu())
        .bind(request.status().as_str())
        .bind(request.created_at().timestamp_millis())
        .bind(request.updated_at().map(|dt| dt.timestamp_millis()))
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, RequestRow>("SELECT * FROM provisioning_requests WHERE id = ?")
            .bind(request.id().to_string())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        row.try_into()
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ProvisioningRequest>> {
        let row = sqlx::query_as::<_, RequestRow>("SELECT * FROM provisioning_requests WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(ProvisioningRequest::try_from).transpose()
    }
}

/// Store kept entirely in memory, for tests and single-process embedding.
#[derive(Default)]
pub struct InMemoryProvisioningStore {
    requests: RwLock<HashMap<Uuid, ProvisioningRequest>>,
}

impl InMemoryProvisioningStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.requests.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.requests.read().await.is_empty()
    }
}

#[async_trait]
impl ProvisioningStore for InMemoryProvisioningStore {
    async fn save(&self, request: &ProvisioningRequest) -> Result<ProvisioningRequest> {
        self.requests
            .write()
            .await
            .insert(request.id(), request.clone());
        Ok(request.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ProvisioningRequest>> {
        Ok(self.requests.read().await.get(&id).cloned())
    }
}

// Internal row type for sqlx
#[derive(sqlx::FromRow)]
struct RequestRow {
    id: String,
    requester: String,
    ram: String,
    cpu: String,
    status: String,
    created_at: i64,
    updated_at: Option<i64>,
}

impl TryFrom<RequestRow> for ProvisioningRequest {
    type Error = OrchestratorError;

    fn try_from(row: RequestRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| OrchestratorError::CorruptRecord(format!("id '{}': {}", row.id, e)))?;
        let status = row
            .status
            .parse::<ProvisioningStatus>()
            .map_err(|e| OrchestratorError::CorruptRecord(format!("request {}: {}", id, e)))?;
        let created_at = from_millis(row.created_at, id)?;
        let updated_at = row.updated_at.map(|ms| from_millis(ms, id)).transpose()?;

        Ok(ProvisioningRequest::restore(
            id,
            row.requester,
            row.ram,
            row.cpu,
            status,
            created_at,
            updated_at,
        ))
    }
}

fn from_millis(ms: i64, id: Uuid) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        OrchestratorError::CorruptRecord(format!("request {}: timestamp {} out of range", id, ms))
    })
}
