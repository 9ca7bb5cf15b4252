//! Storage backends implementing [`crate::domain::repositories::UrlRepository`].
//!
//! # Repositories
//!
//! - [`MemoryUrlRepository`] - Process memory, lost on restart
//! - [`FileUrlRepository`] - Append-only JSON-lines file
//! - [`PgUrlRepository`] - PostgreSQL `url_records` table
//!
//! The memory and file backends share [`record_index::RecordIndex`].

pub mod file_repository;
pub mod memory_repository;
pub mod pg_url_repository;
pub mod record_index;

pub use file_repository::FileUrlRepository;
pub use memory_repository::MemoryUrlRepository;
pub use pg_url_repository::PgUrlRepository;
