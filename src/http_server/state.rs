//! Shared handler state

use std::sync::Arc;

use crate::auth::IdentityProvider;
use crate::catalog::CatalogLookup;
use crate::library::Library;

pub struct AppState {
    pub library: Arc<Library>,
    pub identity: Arc<dyn IdentityProvider>,
    /// `None` when ISBN lookup is disabled
    pub lookup: Option<Arc<dyn CatalogLookup>>,
}

impl AppState {
    pub fn new(
        library: Arc<Library>,
        identity: Arc<dyn IdentityProvider>,
        lookup: Option<Arc<dyn CatalogLookup>>,
    ) -> Self {
        Self {
            library,
            identity,
            lookup,
        }
    }
}
