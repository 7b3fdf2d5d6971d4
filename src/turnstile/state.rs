use std::sync::Arc;

use crate::accounts::AccountService;
use crate::auth::{Authenticator, ExcludedPaths};
use crate::store::UserStore;

/// Shared by every handler and the request gate; immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub authenticator: Option<Arc<Authenticator>>,
    pub excluded_paths: Arc<ExcludedPaths>,
    pub users: Arc<dyn UserStore>,
    pub accounts: AccountService,
}

impl AppState {
    #[must_use]
    pub fn new(
        authenticator: Option<Authenticator>,
        excluded_paths: ExcludedPaths,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            authenticator: authenticator.map(Arc::new),
            excluded_paths: Arc::new(excluded_paths),
            accounts: AccountService::new(users.clone()),
            users,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("authenticator", &self.authenticator)
            .field("excluded_paths", &self.excluded_paths)
            .finish_non_exhaustive()
    }
}
