//! Shared application state injected into every handler.

use std::sync::Arc;

use ipnetwork::IpNetwork;

use crate::application::services::{IdentityService, UrlService};
use crate::domain::repositories::UrlRepository;

/// URL service over whichever backend was selected at startup.
pub type DynUrlService = UrlService<dyn UrlRepository>;

#[derive(Clone)]
pub struct AppState {
    pub url_service: Arc<DynUrlService>,
    pub identity_service: Arc<IdentityService>,
    /// Clients allowed to read internal statistics. `None` denies everyone.
    pub trusted_subnet: Option<IpNetwork>,
}

impl AppState {
    pub fn new(
        url_service: Arc<DynUrlService>,
        identity_service: Arc<IdentityService>,
        trusted_subnet: Option<IpNetwork>,
    ) -> Self {
        Self {
            url_service,
            identity_service,
            trusted_subnet,
        }
    }
}
