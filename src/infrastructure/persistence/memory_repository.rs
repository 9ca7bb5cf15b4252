//! Process-memory implementation of the URL repository.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::entities::UrlRecord;
use crate::domain::errors::StorageError;
use crate::domain::repositories::{StorageStats, UrlRepository};
use crate::infrastructure::persistence::record_index::RecordIndex;

/// Keeps every record in a lock-guarded index. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryUrlRepository {
    index: RwLock<RecordIndex>,
}

impl MemoryUrlRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UrlRepository for MemoryUrlRepository {
    async fn write(&self, record: UrlRecord) -> Result<UrlRecord, StorageError> {
        let mut index = self.index.write().await;
        let record = index.prepare(record)?;
        index.upsert(record.clone());
        Ok(record)
    }

    async fn write_all(&self, records: Vec<UrlRecord>) -> Result<(), StorageError> {
        let mut index = self.index.write().await;
        for record in index.prepare_all(records)? {
            index.upsert(record);
        }
        Ok(())
    }

    async fn find_by_short(&self, short: &str) -> Result<Option<UrlRecord>, StorageError> {
        Ok(self.index.read().await.get_by_short(short).cloned())
    }

    async fn find_by_original(&self, original: &str) -> Result<Option<UrlRecord>, StorageError> {
        Ok(self.index.read().await.get_by_original(original).cloned())
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<UrlRecord>, StorageError> {
        Ok(self.index.read().await.by_user(user_id))
    }

    async fn delete_batch(&self, records: &[UrlRecord]) -> Result<(), StorageError> {
        let mut index = self.index.write().await;
        let deleted = index.pending_deletions(records);
        tracing::debug!(requested = records.len(), deleted = deleted.len(), "Memory delete batch");
        for record in deleted {
            index.upsert(record);
        }
        Ok(())
    }

    async fn stats(&self) -> Result<StorageStats, StorageError> {
        Ok(self.index.read().await.stats())
    }

    async fn ping(&self, _timeout: Duration) -> Result<(), StorageError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_find() {
        let repo = MemoryUrlRepository::new();
        let stored = repo
            .write(UrlRecord::new("", "https://a.com", "abc", "u"))
            .await
            .unwrap();

        assert!(!stored.id.is_empty());
        assert_eq!(repo.find_by_short("abc").await.unwrap(), Some(stored.clone()));
        assert_eq!(
            repo.find_by_original("https://a.com").await.unwrap(),
            Some(stored)
        );
        assert_eq!(repo.find_by_short("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_conflict_carries_existing() {
        let repo = MemoryUrlRepository::new();
        repo.write(UrlRecord::new("first", "https://a.com", "abc", "u"))
            .await
            .unwrap();

        let err = repo
            .write(UrlRecord::new("", "https://a.com", "abc", "v"))
            .await
            .unwrap_err();

        match err {
            StorageError::Conflict(existing) => assert_eq!(existing.id, "first"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_write_all_is_atomic() {
        let repo = MemoryUrlRepository::new();
        repo.write(UrlRecord::new("", "https://b.com", "bbb", ""))
            .await
            .unwrap();

        let result = repo
            .write_all(vec![
                UrlRecord::new("1", "https://a.com", "aaa", ""),
                UrlRecord::new("2", "https://b.com", "bbb", ""),
            ])
            .await;

        assert!(matches!(result, Err(StorageError::Conflict(_))));
        assert_eq!(repo.find_by_short("aaa").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_batch_soft_deletes_owned_records() {
        let repo = MemoryUrlRepository::new();
        repo.write(UrlRecord::new("", "https://a.com", "aaa", "alice"))
            .await
            .unwrap();
        repo.write(UrlRecord::new("", "https://b.com", "bbb", "bob"))
            .await
            .unwrap();

        repo.delete_batch(&[
            UrlRecord::deletion("aaa", "alice"),
            UrlRecord::deletion("bbb", "alice"),
        ])
        .await
        .unwrap();

        assert!(repo.find_by_short("aaa").await.unwrap().unwrap().is_deleted);
        assert!(!repo.find_by_short("bbb").await.unwrap().unwrap().is_deleted);
        assert!(repo.find_by_user("alice").await.unwrap().is_empty());
        assert_eq!(
            repo.stats().await.unwrap(),
            StorageStats { urls: 1, users: 1 }
        );
    }

    #[tokio::test]
    async fn test_ping() {
        assert!(MemoryUrlRepository::new()
            .ping(Duration::from_millis(1))
            .await
            .is_ok());
    }
}
