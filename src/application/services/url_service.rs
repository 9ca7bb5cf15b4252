//! URL creation, lookup and deletion service.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::application::services::resolver::{Resolution, ResolverStrategy, UrlResolver};
use crate::domain::delete_worker::DeleteQueue;
use crate::domain::entities::UrlRecord;
use crate::domain::errors::StorageError;
use crate::domain::repositories::{StorageStats, UrlRepository};
use crate::error::AppError;
use crate::utils::url_validator::validate_url;

/// Upper bound on a storage health check.
pub const PING_TIMEOUT: Duration = Duration::from_secs(3);

/// Result of shortening a single URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortenOutcome {
    /// A new mapping was stored.
    Created(UrlRecord),
    /// The URL had already been shortened; carries the stored mapping.
    Existing(UrlRecord),
}

impl ShortenOutcome {
    pub fn record(&self) -> &UrlRecord {
        match self {
            Self::Created(r) | Self::Existing(r) => r,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// One entry of a batch shortening request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub correlation_id: String,
    pub original: String,
}

/// Orchestrates the resolver, the storage backend and the deletion worker.
pub struct UrlService<R: UrlRepository + ?Sized> {
    repository: Arc<R>,
    resolver: UrlResolver<R>,
    delete_queue: DeleteQueue,
    base_url: String,
}

impl<R: UrlRepository + ?Sized> UrlService<R> {
    /// Creates a new URL service.
    ///
    /// # Arguments
    ///
    /// - `repository` - storage backend shared with the resolver and worker
    /// - `resolver` - short code assignment strategy
    /// - `delete_queue` - producer handle of the running deletion worker
    /// - `base_url` - prefix of every returned short URL
    pub fn new(
        repository: Arc<R>,
        resolver: UrlResolver<R>,
        delete_queue: DeleteQueue,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            resolver,
            delete_queue,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Builds the public short URL for `code`.
    pub fn short_url(&self, code: &str) -> String {
        format!("{}/{}", self.base_url, code)
    }

    pub fn strategy(&self) -> ResolverStrategy {
        self.resolver.strategy()
    }

    /// Shortens `original` on behalf of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the URL is not an absolute HTTP(S) URL.
    /// Returns [`AppError::Internal`] on storage errors or if the short code is
    /// held by a different URL.
    pub async fn create_url_record(
        &self,
        original: &str,
        user_id: &str,
    ) -> Result<ShortenOutcome, AppError> {
        let original = checked_url(original)?;

        let resolution = self
            .resolver
            .resolve(UrlRecord::new("", original, "", user_id))
            .await?;

        let outcome = match resolution {
            Resolution::Computed(record) => match self.repository.write(record).await {
                Ok(stored) => ShortenOutcome::Created(stored),
                Err(StorageError::Conflict(existing)) => {
                    if existing.original != original {
                        warn!(short = %existing.short, "Short code held by another URL");
                        return Err(AppError::internal(
                            "Short code collision",
                            json!({ "short": existing.short }),
                        ));
                    }
                    ShortenOutcome::Existing(*existing)
                }
                Err(e) => return Err(e.into()),
            },
            Resolution::Persisted(stored) => ShortenOutcome::Created(stored),
            Resolution::Existing(existing) => ShortenOutcome::Existing(existing),
        };

        debug!(
            short = %outcome.record().short,
            created = outcome.is_created(),
            "URL shortened"
        );

        Ok(outcome)
    }

    /// Shortens several URLs at once.
    ///
    /// The returned records carry the client correlation ids as their `id`.
    /// With the stateless strategy the batch is written atomically and any
    /// already shortened URL fails the whole batch; the stateful strategy
    /// resolves entries one by one and reports existing mappings as they are.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] naming the first invalid entry.
    /// Returns [`AppError::Conflict`] if a stateless batch clashes with stored data.
    pub async fn create_url_records(
        &self,
        entries: Vec<BatchEntry>,
        user_id: &str,
    ) -> Result<Vec<UrlRecord>, AppError> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            let original = validate_url(&entry.original).map_err(|e| {
                AppError::bad_request(
                    "Invalid URL format",
                    json!({ "correlation_id": entry.correlation_id, "reason": e.to_string() }),
                )
            })?;
            records.push(UrlRecord::new(
                entry.correlation_id.clone(),
                original,
                "",
                user_id,
            ));
        }

        match self.resolver.strategy() {
            ResolverStrategy::Stateless => {
                let mut computed = Vec::with_capacity(records.len());
                for record in records {
                    computed.push(self.resolver.resolve(record).await?.into_record());
                }
                self.repository.write_all(computed.clone()).await?;
                info!(count = computed.len(), "Batch shortened");
                Ok(computed)
            }
            ResolverStrategy::Stateful => {
                let mut resolved = Vec::with_capacity(records.len());
                for record in records {
                    let correlation_id = record.id.clone();
                    let mut stored = self.resolver.resolve(record).await?.into_record();
                    stored.id = correlation_id;
                    resolved.push(stored);
                }
                info!(count = resolved.len(), "Batch shortened");
                Ok(resolved)
            }
        }
    }

    /// Queues soft deletion of `user_id`'s records with the given short codes.
    ///
    /// Returns immediately; the deletion worker applies the requests later.
    /// Codes not owned by the user are ignored at flush time. Returns the
    /// number of queued requests.
    pub fn delete_url_records(&self, user_id: &str, shorts: Vec<String>) -> usize {
        let mut queued = 0;
        for short in shorts {
            let short = short.trim();
            if short.is_empty() {
                continue;
            }
            self.delete_queue.submit(UrlRecord::deletion(short, user_id));
            queued += 1;
        }

        debug!(user_id, queued, "Delete requests queued");
        queued
    }

    /// Resolves a short code to its live record.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the code is unknown.
    /// Returns [`AppError::Gone`] if the record has been soft-deleted.
    pub async fn get_url_by_short(&self, short: &str) -> Result<UrlRecord, AppError> {
        let record = self
            .repository
            .find_by_short(short)
            .await?
            .ok_or_else(|| AppError::not_found("Short URL not found", json!({ "short": short })))?;

        if record.is_deleted {
            return Err(AppError::gone(
                "Short URL has been deleted",
                json!({ "short": short }),
            ));
        }

        Ok(record)
    }

    /// Lists the live records owned by `user_id`.
    pub async fn get_urls_by_user(&self, user_id: &str) -> Result<Vec<UrlRecord>, AppError> {
        if user_id.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.repository.find_by_user(user_id).await?)
    }

    /// Checks that the storage backend is reachable.
    pub async fn ping(&self) -> Result<(), AppError> {
        Ok(self.repository.ping(PING_TIMEOUT).await?)
    }

    /// Counts live records and distinct owners.
    pub async fn get_stats(&self) -> Result<StorageStats, AppError> {
        Ok(self.repository.stats().await?)
    }

    /// Reports whether the deletion worker still accepts requests.
    pub fn delete_worker_running(&self) -> bool {
        !self.delete_queue.is_closed()
    }
}

fn checked_url(input: &str) -> Result<&str, AppError> {
    validate_url(input).map_err(|e| {
        AppError::bad_request("Invalid URL format", json!({ "reason": e.to_string() }))
    })
}
