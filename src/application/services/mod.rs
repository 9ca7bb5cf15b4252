//! Business logic services for the application layer.

pub mod identity_service;
pub mod resolver;
pub mod url_service;

pub use identity_service::{IdentityService, UserIdentity};
pub use resolver::{Resolution, ResolverStrategy, UrlResolver};
pub use url_service::{BatchEntry, ShortenOutcome, UrlService};
