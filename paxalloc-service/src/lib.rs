pub mod app_config;
pub mod actor;
pub mod bundle;
pub mod persistence;

pub use actor::{AllocationActor, AllocationHandle};
pub use bundle::{BatchOutput, TripBundle};
pub use persistence::{spawn_snapshot_writer, write_snapshot};

use paxalloc_engine::{MigrationError, SessionError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Allocation actor is no longer running")]
    ActorClosed,

    #[error("Migration failed: {0}")]
    Migration(#[from] MigrationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
