//! PostgreSQL implementation of the URL repository.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tokio::time;
use tokio_retry::strategy::ExponentialBackoff;
use uuid::Uuid;

use crate::domain::entities::UrlRecord;
use crate::domain::errors::StorageError;
use crate::domain::repositories::{StorageStats, UrlRepository};

/// Connection attempts made before giving up at startup.
const CONNECT_ATTEMPTS: usize = 5;

#[derive(FromRow)]
struct UrlRow {
    id: String,
    original_url: String,
    short_url: String,
    user_id: String,
    is_deleted: bool,
}

impl From<UrlRow> for UrlRecord {
    fn from(row: UrlRow) -> Self {
        Self {
            id: row.id,
            original: row.original_url,
            short: row.short_url,
            user_id: row.user_id,
            is_deleted: row.is_deleted,
        }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, original_url, short_url, user_id, is_deleted FROM url_records";

/// PostgreSQL repository over the `url_records` table.
///
/// Uniqueness of `original_url` and `short_url` is enforced by table
/// constraints; a violation is reported with the row already stored.
pub struct PgUrlRepository {
    pool: Arc<PgPool>,
}

impl PgUrlRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Connects with exponential backoff and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] once every attempt has failed or if
    /// a migration cannot be applied.
    pub async fn connect(dsn: &str, max_connections: u32) -> Result<Self, StorageError> {
        // Backoff delays between attempts: 200ms, 400ms, ... capped at 5s.
        let mut delays = ExponentialBackoff::from_millis(2)
            .factor(100)
            .max_delay(Duration::from_secs(5))
            .take(CONNECT_ATTEMPTS);

        let pool = loop {
            let attempt = PgPoolOptions::new()
                .max_connections(max_connections)
                .acquire_timeout(Duration::from_secs(3))
                .connect(dsn)
                .await;

            match (attempt, delays.next()) {
                (Ok(pool), _) => break pool,
                (Err(e), Some(delay)) => {
                    tracing::warn!(
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "Database connection failed, retrying"
                    );
                    time::sleep(delay).await;
                }
                (Err(e), None) => return Err(e.into()),
            }
        };
        tracing::info!("Connected to database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::Database(e.into()))?;
        tracing::info!("Database migrations applied");

        Ok(Self::new(Arc::new(pool)))
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<UrlRecord>, StorageError> {
        let sql = format!("{SELECT_COLUMNS} WHERE {column} = $1");
        let row = sqlx::query_as::<_, UrlRow>(&sql)
            .bind(value)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(Into::into))
    }

    /// Looks up the stored row that `record` clashes with.
    async fn existing_for(&self, record: &UrlRecord) -> Result<StorageError, StorageError> {
        let existing = match self.find_one("original_url", &record.original).await? {
            Some(existing) => Some(existing),
            None => self.find_one("short_url", &record.short).await?,
        };

        Ok(StorageError::conflict(existing.unwrap_or_else(|| record.clone())))
    }
}

fn with_id(mut record: UrlRecord) -> UrlRecord {
    if record.id.is_empty() {
        record.id = Uuid::new_v4().to_string();
    }
    record
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl UrlRepository for PgUrlRepository {
    async fn write(&self, record: UrlRecord) -> Result<UrlRecord, StorageError> {
        let record = with_id(record);

        let inserted = sqlx::query_as::<_, UrlRow>(
            r#"
            INSERT INTO url_records (id, original_url, short_url, user_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            RETURNING id, original_url, short_url, user_id, is_deleted
            "#,
        )
        .bind(&record.id)
        .bind(&record.original)
        .bind(&record.short)
        .bind(&record.user_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        match inserted {
            Some(row) => Ok(row.into()),
            None => Err(self.existing_for(&record).await?),
        }
    }

    async fn write_all(&self, records: Vec<UrlRecord>) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        for record in records.into_iter().map(with_id) {
            let result = sqlx::query(
                r#"
                INSERT INTO url_records (id, original_url, short_url, user_id)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(&record.id)
            .bind(&record.original)
            .bind(&record.short)
            .bind(&record.user_id)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    tx.rollback().await?;
                    return Err(self.existing_for(&record).await?);
                }
                Err(e) => return Err(e.into()),
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_short(&self, short: &str) -> Result<Option<UrlRecord>, StorageError> {
        self.find_one("short_url", short).await
    }

    async fn find_by_original(&self, original: &str) -> Result<Option<UrlRecord>, StorageError> {
        self.find_one("original_url", original).await
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<UrlRecord>, StorageError> {
        let sql = format!("{SELECT_COLUMNS} WHERE user_id = $1 AND NOT is_deleted ORDER BY row_id");
        let rows = sqlx::query_as::<_, UrlRow>(&sql)
            .bind(user_id)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_batch(&self, records: &[UrlRecord]) -> Result<(), StorageError> {
        let (shorts, users): (Vec<String>, Vec<String>) = records
            .iter()
            .map(|r| (r.short.clone(), r.user_id.clone()))
            .unzip();

        let result = sqlx::query(
            r#"
            UPDATE url_records AS u
            SET is_deleted = TRUE
            FROM UNNEST($1::text[], $2::text[]) AS d(short_url, user_id)
            WHERE u.short_url = d.short_url
              AND u.user_id = d.user_id
              AND NOT u.is_deleted
            "#,
        )
        .bind(&shorts)
        .bind(&users)
        .execute(self.pool.as_ref())
        .await?;

        tracing::debug!(
            requested = records.len(),
            deleted = result.rows_affected(),
            "Postgres delete batch"
        );
        Ok(())
    }

    async fn stats(&self) -> Result<StorageStats, StorageError> {
        let (urls, users) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*), COUNT(DISTINCT NULLIF(user_id, ''))
            FROM url_records
            WHERE NOT is_deleted
            "#,
        )
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(StorageStats {
            urls: usize::try_from(urls).unwrap_or_default(),
            users: usize::try_from(users).unwrap_or_default(),
        })
    }

    async fn ping(&self, timeout: Duration) -> Result<(), StorageError> {
        time::timeout(timeout, sqlx::query("SELECT 1").execute(self.pool.as_ref()))
            .await
            .map_err(|_| StorageError::Timeout)??;
        Ok(())
    }
}
