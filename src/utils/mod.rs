//! Utility functions shared across layers.
//!
//! - [`short_code`] - Deterministic SHA-256/base-62 short code derivation
//! - [`url_validator`] - Acceptance checks for submitted URLs

pub mod short_code;
pub mod url_validator;
