//! Repository trait definitions for the domain layer.
//!
//! The storage contract consumed by the resolver, the URL service and the
//! deletion worker. Implementations live in `crate::infrastructure::persistence`;
//! mock implementations are generated via `mockall` for unit tests.

pub mod url_repository;

pub use url_repository::{StorageStats, UrlRepository};

#[cfg(test)]
pub use url_repository::MockUrlRepository;
