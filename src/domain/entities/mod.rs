//! Core domain entities.
//!
//! - [`UrlRecord`] - A long URL to short code mapping with its owner and
//!   soft-delete flag

pub mod url_record;

pub use url_record::UrlRecord;
