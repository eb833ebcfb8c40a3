use std::sync::Arc;

use sqlx::SqlitePool;
use vm_orchestrator::{ProvisioningOrchestrator, RequestSignal, RoleResolver, SqliteProvisioningStore};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: ProvisioningOrchestrator,
    pool: SqlitePool,
}

impl AppState {
    /// Wire the use case to the store behind `pool` and the given dispatch signal.
    pub fn new(
        pool: SqlitePool,
        roles: Arc<dyn RoleResolver>,
        signal: Arc<dyn RequestSignal>,
    ) -> Self {
        let store = Arc::new(SqliteProvisioningStore::new(pool.clone()));
        Self {
            orchestrator: ProvisioningOrchestrator::new(store, roles, signal),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
