//! Storage error taxonomy shared by all backends.

use thiserror::Error;

use crate::domain::entities::UrlRecord;

/// Errors returned by [`crate::domain::repositories::UrlRepository`] implementations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A uniqueness constraint rejected the write; carries the stored record.
    #[error("record already exists for short code '{}'", .0.short)]
    Conflict(Box<UrlRecord>),

    /// The backend did not answer within the allotted time.
    #[error("storage operation timed out")]
    Timeout,

    /// The collision fallback ran out of attempts.
    #[error("no free short code for '{url}' after {attempts} attempts")]
    CollisionLimit { url: String, attempts: u32 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Wraps the stored record of a uniqueness violation.
    pub fn conflict(existing: UrlRecord) -> Self {
        Self::Conflict(Box::new(existing))
    }
}
