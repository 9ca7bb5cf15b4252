//! HTTP middleware for request processing and protection.
//!
//! Provides user identity, trusted-subnet access control, and observability
//! middleware.

pub mod identity;
pub mod tracing;
pub mod trusted_subnet;
