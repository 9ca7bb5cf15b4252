//! Append-only JSON-lines implementation of the URL repository.
//!
//! Every write appends one line per record. A delete batch appends the
//! updated records again with `is_deleted` set. When the file is loaded, a
//! later line for a short code replaces the earlier ones.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tokio::time;
use tracing::{debug, info};

use crate::domain::entities::UrlRecord;
use crate::domain::errors::StorageError;
use crate::domain::repositories::{StorageStats, UrlRepository};
use crate::infrastructure::persistence::record_index::RecordIndex;

struct FileState {
    index: RecordIndex,
    file: File,
}

/// File-backed repository with an in-memory index for reads.
pub struct FileUrlRepository {
    path: PathBuf,
    state: RwLock<FileState>,
}

impl FileUrlRepository {
    /// Opens (or creates) the storage file and loads its records.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file cannot be read or opened for
    /// appending, and [`StorageError::Serialization`] on a malformed line.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let index = load_index(&path).await?;
        info!(path = %path.display(), records = index.len(), "File storage loaded");

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            state: RwLock::new(FileState { index, file }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn load_index(path: &Path) -> Result<RecordIndex, StorageError> {
    let contents = match fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RecordIndex::new()),
        Err(e) => return Err(e.into()),
    };

    let mut index = RecordIndex::new();
    for line in contents.lines().filter(|l| !l.trim().is_empty()) {
        index.upsert(serde_json::from_str(line)?);
    }
    Ok(index)
}

async fn append(file: &mut File, records: &[UrlRecord]) -> Result<(), StorageError> {
    let mut buf = Vec::new();
    for record in records {
        serde_json::to_writer(&mut buf, record)?;
        buf.push(b'\n');
    }
    file.write_all(&buf).await?;
    file.flush().await?;
    Ok(())
}

#[async_trait]
impl UrlRepository for FileUrlRepository {
    async fn write(&self, record: UrlRecord) -> Result<UrlRecord, StorageError> {
        let mut state = self.state.write().await;
        let record = state.index.prepare(record)?;

        append(&mut state.file, std::slice::from_ref(&record)).await?;
        state.index.upsert(record.clone());
        Ok(record)
    }

    async fn write_all(&self, records: Vec<UrlRecord>) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let records = state.index.prepare_all(records)?;

        append(&mut state.file, &records).await?;
        for record in records {
            state.index.upsert(record);
        }
        Ok(())
    }

    async fn find_by_short(&self, short: &str) -> Result<Option<UrlRecord>, StorageError> {
        Ok(self.state.read().await.index.get_by_short(short).cloned())
    }

    async fn find_by_original(&self, original: &str) -> Result<Option<UrlRecord>, StorageError> {
        Ok(self.state.read().await.index.get_by_original(original).cloned())
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<UrlRecord>, StorageError> {
        Ok(self.state.read().await.index.by_user(user_id))
    }

    async fn delete_batch(&self, records: &[UrlRecord]) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let deleted = state.index.pending_deletions(records);
        if deleted.is_empty() {
            return Ok(());
        }

        append(&mut state.file, &deleted).await?;
        debug!(deleted = deleted.len(), "File delete batch appended");
        for record in deleted {
            state.index.upsert(record);
        }
        Ok(())
    }

    async fn stats(&self) -> Result<StorageStats, StorageError> {
        Ok(self.state.read().await.index.stats())
    }

    async fn ping(&self, timeout: Duration) -> Result<(), StorageError> {
        time::timeout(timeout, fs::metadata(&self.path))
            .await
            .map_err(|_| StorageError::Timeout)??;
        Ok(())
    }
}
