//! Errors of the history database.

use homelink_domain::error::HubError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("history database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("history schema: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

// The hub only sees the opaque storage variant; the source chain is kept.
impl From<StorageError> for HubError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
