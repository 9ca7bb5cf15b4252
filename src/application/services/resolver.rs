//! Short code resolution strategies.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::entities::UrlRecord;
use crate::domain::errors::StorageError;
use crate::domain::repositories::UrlRepository;
use crate::utils::short_code::{hash_to_short, hash_to_short_with_attempt};

/// Upper bound on collision fallback attempts in the stateful strategy.
pub const MAX_COLLISION_ATTEMPTS: u32 = 64;

/// How short codes are assigned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolverStrategy {
    /// Pure hash; storage constraints reject duplicates.
    #[default]
    Stateless,
    /// Looks up storage first and rehashes with an attempt suffix on a short
    /// code collision, then persists the mapping itself.
    Stateful,
}

impl FromStr for ResolverStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stateless" => Ok(Self::Stateless),
            "stateful" => Ok(Self::Stateful),
            other => Err(format!(
                "unknown resolver strategy '{other}', expected 'stateless' or 'stateful'"
            )),
        }
    }
}

impl fmt::Display for ResolverStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stateless => f.write_str("stateless"),
            Self::Stateful => f.write_str("stateful"),
        }
    }
}

/// Result of resolving a record's short code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The code was computed without touching storage; the caller persists it.
    Computed(UrlRecord),
    /// A new mapping was stored by the resolver.
    Persisted(UrlRecord),
    /// The original URL was already shortened.
    Existing(UrlRecord),
}

impl Resolution {
    pub fn record(&self) -> &UrlRecord {
        match self {
            Self::Computed(r) | Self::Persisted(r) | Self::Existing(r) => r,
        }
    }

    pub fn into_record(self) -> UrlRecord {
        match self {
            Self::Computed(r) | Self::Persisted(r) | Self::Existing(r) => r,
        }
    }
}

/// Maps original URLs to short codes.
pub struct UrlResolver<R: UrlRepository + ?Sized> {
    repository: Arc<R>,
    strategy: ResolverStrategy,
    code_length: usize,
    lock: Mutex<()>,
}

impl<R: UrlRepository + ?Sized> UrlResolver<R> {
    /// Creates a resolver. `code_length` must already be validated to
    /// `1..=MAX_CODE_LENGTH`.
    pub fn new(repository: Arc<R>, strategy: ResolverStrategy, code_length: usize) -> Self {
        Self {
            repository,
            strategy,
            code_length,
            lock: Mutex::new(()),
        }
    }

    pub fn strategy(&self) -> ResolverStrategy {
        self.strategy
    }

    /// Computes the primary short code of `original`.
    pub fn long_to_short(&self, original: &str) -> String {
        hash_to_short(original, self.code_length)
    }

    /// Assigns a short code to `record`, whose `short` field is ignored.
    ///
    /// The stateless strategy never touches storage and always returns
    /// [`Resolution::Computed`].
    ///
    /// # Errors
    ///
    /// In the stateful strategy storage errors propagate, and
    /// [`StorageError::CollisionLimit`] is returned when every fallback code
    /// is taken.
    pub async fn resolve(&self, mut record: UrlRecord) -> Result<Resolution, StorageError> {
        match self.strategy {
            ResolverStrategy::Stateless => {
                record.short = self.long_to_short(&record.original);
                Ok(Resolution::Computed(record))
            }
            ResolverStrategy::Stateful => self.resolve_stateful(record).await,
        }
    }

    async fn resolve_stateful(&self, mut record: UrlRecord) -> Result<Resolution, StorageError> {
        let _guard = self.lock.lock().await;

        if let Some(existing) = self.repository.find_by_original(&record.original).await? {
            debug!(short = %existing.short, "Original URL already shortened");
            return Ok(Resolution::Existing(existing));
        }

        for attempt in 0..MAX_COLLISION_ATTEMPTS {
            let code = if attempt == 0 {
                self.long_to_short(&record.original)
            } else {
                hash_to_short_with_attempt(&record.original, attempt, self.code_length)
            };

            match self.repository.find_by_short(&code).await? {
                None => {
                    record.short = code;
                    let stored = self.repository.write(record).await?;
                    return Ok(Resolution::Persisted(stored));
                }
                Some(taken) if taken.original == record.original => {
                    return Ok(Resolution::Existing(taken));
                }
                Some(taken) => {
                    warn!(
                        short = %code,
                        attempt,
                        taken_by = %taken.original,
                        "Short code collision, rehashing"
                    );
                }
            }
        }

        Err(StorageError::CollisionLimit {
            url: record.original,
            attempts: MAX_COLLISION_ATTEMPTS,
        })
    }
}
