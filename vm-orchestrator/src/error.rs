use thiserror::Error;
use vm_core::CoreError;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Provisioning request not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Corrupt stored record: {0}")]
    CorruptRecord(String),

    #[error("Dispatch channel is closed")]
    SignalClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
