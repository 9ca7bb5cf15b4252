//! In-process index of URL records shared by the memory and file backends.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::domain::entities::UrlRecord;
use crate::domain::errors::StorageError;
use crate::domain::repositories::StorageStats;

/// Records in insertion order, indexed by short code and original URL.
///
/// Records are never removed, so positions stay stable.
#[derive(Debug, Default)]
pub struct RecordIndex {
    records: Vec<UrlRecord>,
    by_short: HashMap<String, usize>,
    by_original: HashMap<String, usize>,
}

impl RecordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get_by_short(&self, short: &str) -> Option<&UrlRecord> {
        self.by_short.get(short).map(|&i| &self.records[i])
    }

    pub fn get_by_original(&self, original: &str) -> Option<&UrlRecord> {
        self.by_original.get(original).map(|&i| &self.records[i])
    }

    /// Returns the stored record that `record` would clash with.
    fn conflict_for(&self, record: &UrlRecord) -> Option<&UrlRecord> {
        self.get_by_original(&record.original)
            .or_else(|| self.get_by_short(&record.short))
    }

    /// Validates a new record and assigns an id if it has none.
    ///
    /// Does not insert.
    pub fn prepare(&self, mut record: UrlRecord) -> Result<UrlRecord, StorageError> {
        if let Some(existing) = self.conflict_for(&record) {
            return Err(StorageError::conflict(existing.clone()));
        }
        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }
        Ok(record)
    }

    /// Validates a batch against stored records and against itself.
    ///
    /// On a clash inside the batch the earlier batch entry is reported.
    pub fn prepare_all(&self, records: Vec<UrlRecord>) -> Result<Vec<UrlRecord>, StorageError> {
        let mut shorts: HashMap<String, usize> = HashMap::with_capacity(records.len());
        let mut originals: HashMap<String, usize> = HashMap::with_capacity(records.len());
        let mut prepared: Vec<UrlRecord> = Vec::with_capacity(records.len());

        for record in records {
            let record = self.prepare(record)?;

            let clash = originals
                .get(&record.original)
                .or_else(|| shorts.get(&record.short))
                .copied();
            if let Some(i) = clash {
                return Err(StorageError::conflict(prepared[i].clone()));
            }

            originals.insert(record.original.clone(), prepared.len());
            shorts.insert(record.short.clone(), prepared.len());
            prepared.push(record);
        }

        Ok(prepared)
    }

    /// Inserts `record`, replacing any record with the same short code.
    pub fn upsert(&mut self, record: UrlRecord) {
        if let Some(&i) = self.by_short.get(&record.short) {
            let previous = &self.records[i];
            if previous.original != record.original {
                self.by_original.remove(&previous.original);
                self.by_original.insert(record.original.clone(), i);
            }
            self.records[i] = record;
            return;
        }

        let i = self.records.len();
        self.by_short.insert(record.short.clone(), i);
        self.by_original.insert(record.original.clone(), i);
        self.records.push(record);
    }

    /// Live records owned by `user_id`, oldest first.
    pub fn by_user(&self, user_id: &str) -> Vec<UrlRecord> {
        self.records
            .iter()
            .filter(|r| !r.is_deleted && r.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Computes the records a delete batch turns into deleted ones.
    ///
    /// Only live records whose short code and owner match a request are
    /// returned, each at most once, with `is_deleted` set. Nothing is changed.
    pub fn pending_deletions(&self, requests: &[UrlRecord]) -> Vec<UrlRecord> {
        let mut seen = HashSet::new();

        requests
            .iter()
            .filter_map(|request| {
                let stored = self.get_by_short(&request.short)?;
                if stored.is_deleted || !request.matches_deletion(stored) {
                    return None;
                }
                if !seen.insert(stored.short.as_str()) {
                    return None;
                }
                Some(UrlRecord {
                    is_deleted: true,
                    ..stored.clone()
                })
            })
            .collect()
    }

    pub fn stats(&self) -> StorageStats {
        let live = self.records.iter().filter(|r| !r.is_deleted);
        let mut users = HashSet::new();
        let mut urls = 0;
        for record in live {
            urls += 1;
            if !record.user_id.is_empty() {
                users.insert(record.user_id.as_str());
            }
        }

        StorageStats {
            urls,
            users: users.len(),
        }
    }
}
