//! Domain layer containing entities, the storage contract and the deletion
//! pipeline.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Storage trait definitions
//! - [`errors`] - Storage error taxonomy
//! - [`delete_worker`] - Batched asynchronous soft-deletion
//!
//! # Deletion Flow
//!
//! 1. HTTP handler accepts a list of short codes and answers `202 Accepted`
//! 2. Each code is submitted to [`delete_worker::DeleteQueue`] (non-blocking)
//! 3. [`delete_worker::DeleteWorker`] buffers records and flushes them in one
//!    storage call on size threshold or timer
//! 4. Storage marks matching rows as deleted via
//!    [`repositories::UrlRepository::delete_batch`]

pub mod delete_worker;
pub mod entities;
pub mod errors;
pub mod repositories;
