use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A persisted value no longer parses into its domain enum.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// Terminal update on a job that is not `running`. Jobs transition to a
    /// terminal state exactly once; a second attempt is a bug upstream.
    #[error("Job {0} is not running")]
    JobNotRunning(Uuid),
}
