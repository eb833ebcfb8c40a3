use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use vm_api::{create_app, AppState, Config};
use vm_orchestrator::db::{backup_database, create_pool, run_migrations};
use vm_orchestrator::Dispatcher;
use vm_provider::{HttpCloudClient, ResilientProvider};

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = vm_logging::init_subscriber();

    info!("Starting vm-api service...");

    // Load configuration
    let config = Config::from_env();
    info!(
        "Configuration loaded: bind_addr={}, db_path={}, provider_url={}",
        config.bind_addr,
        config.db_path.display(),
        config.provider_url
    );
    let roles = config.roles()?;
    info!("Role directory loaded ({} principals)", roles.len());

    // Database setup
    let db_path = &config.db_path;

    // Backup before migrations
    if db_path.exists() {
        let backup_path = backup_database(db_path)?;
        info!("Database backed up to: {}", backup_path.display());
    }

    // Create pool and run migrations
    let pool = create_pool(db_path).await?;
    info!("Running database migrations...");
    run_migrations(&pool).await?;
    info!("Migrations complete");

    // Provider boundary and dispatcher
    let client = Arc::new(HttpCloudClient::new(config.cloud_client()));
    let provider = Arc::new(ResilientProvider::new(
        client,
        config.provider_timeout(),
        config.breaker(),
    ));
    let store = Arc::new(vm_orchestrator::SqliteProvisioningStore::new(pool.clone()));
    let dispatcher_config = config.dispatcher();
    let (signal, dispatcher) = Dispatcher::new(store, provider).spawn(&dispatcher_config);
    info!(
        "Dispatcher started (workers: {}, queue: {})",
        dispatcher_config.workers, dispatcher_config.queue_capacity
    );

    // Create app
    let state = AppState::new(pool, Arc::new(roles), Arc::new(signal));
    let app = create_app(state).await?;

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router held the last signal sender; the dispatcher now drains its backlog.
    info!("Server stopped, waiting for pending dispatches");
    dispatcher.join().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
