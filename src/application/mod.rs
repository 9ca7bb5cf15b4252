//! Application layer services implementing business logic.
//!
//! Services consume the [`crate::domain::repositories::UrlRepository`] trait
//! and give HTTP handlers and the admin CLI a narrow API.
//!
//! # Available Services
//!
//! - [`services::url_service::UrlService`] - Shortening, lookup, listing and deletion
//! - [`services::resolver::UrlResolver`] - Stateless or stateful short code assignment
//! - [`services::identity_service::IdentityService`] - Signed user identity tokens

pub mod services;
