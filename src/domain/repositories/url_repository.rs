//! Repository trait for URL record persistence.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::entities::UrlRecord;
use crate::domain::errors::StorageError;

/// Aggregate counters reported by a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Records not marked deleted.
    pub urls: usize,
    /// Distinct non-empty owners of those records.
    pub users: usize,
}

/// Repository interface for URL records.
///
/// Backends enforce uniqueness of both the original URL and the short code.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::MemoryUrlRepository`] - process memory
/// - [`crate::infrastructure::persistence::FileUrlRepository`] - append-only JSON lines
/// - [`crate::infrastructure::persistence::PgUrlRepository`] - PostgreSQL table
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlRepository: Send + Sync {
    /// Stores a new record.
    ///
    /// A backend-generated id is assigned when `record.id` is empty.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] carrying the already stored record if
    /// the original URL or the short code is taken.
    async fn write(&self, record: UrlRecord) -> Result<UrlRecord, StorageError>;

    /// Stores several records at once. Nothing is written on conflict.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] with the first clashing stored record.
    async fn write_all(&self, records: Vec<UrlRecord>) -> Result<(), StorageError>;

    /// Finds a record by short code, including soft-deleted ones.
    async fn find_by_short(&self, short: &str) -> Result<Option<UrlRecord>, StorageError>;

    /// Finds a record by its original URL.
    async fn find_by_original(&self, original: &str) -> Result<Option<UrlRecord>, StorageError>;

    /// Lists live records owned by `user_id`.
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<UrlRecord>, StorageError>;

    /// Marks every stored record matching a request (short code and owner) as
    /// deleted. Requests matching nothing are ignored.
    async fn delete_batch(&self, records: &[UrlRecord]) -> Result<(), StorageError>;

    /// Counts live records and their distinct owners.
    async fn stats(&self) -> Result<StorageStats, StorageError>;

    /// Checks that the backend is reachable within `timeout`.
    async fn ping(&self, timeout: Duration) -> Result<(), StorageError>;
}
