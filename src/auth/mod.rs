//! Authentication strategies and the shared request-facing contract.

use std::sync::Arc;
use tracing::{error, info};

pub mod base;
pub mod basic;
pub mod clock;
pub mod config;
pub mod expiry;
pub mod password;
pub mod paths;
pub mod persistent;
pub mod request;
pub mod session;
pub mod token;

pub use base::Auth;
pub use basic::{BasicAuth, Credentials};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AuthConfig, AuthType};
pub use expiry::{ExpiryPolicy, SessionExpAuth};
pub use paths::ExcludedPaths;
pub use persistent::SessionDbAuth;
pub use request::AuthRequest;
pub use session::SessionAuth;

use crate::store::{SessionStore, User, UserQuery, UserStore};

/// Find the user a session points at; store errors resolve nobody.
pub(crate) async fn resolve_user(users: &dyn UserStore, user_id: &str) -> Option<User> {
    match users.find(&UserQuery::by_id(user_id)).await {
        Ok(user) => user,
        Err(err) => {
            error!("Failed to resolve session user: {err}");
            None
        }
    }
}

/// The strategy selected at startup.
#[derive(Debug)]
pub enum Authenticator {
    Null(Auth),
    Basic(BasicAuth),
    Session(SessionAuth),
    SessionExpiry(SessionExpAuth),
    SessionPersistent(SessionDbAuth),
}

impl Authenticator {
    /// Build the configured strategy, or `None` when no strategy is configured.
    ///
    /// # Errors
    /// Fails only when the persistent session store can not be loaded.
    pub async fn from_config(
        config: &AuthConfig,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Option<Self>> {
        let Some(auth_type) = config.auth_type() else {
            info!("no auth type configured, requests pass through unauthenticated");
            return Ok(None);
        };

        let base = Auth::new(config.session_name());
        let authenticator = match auth_type {
            AuthType::Auth => Self::Null(base),
            AuthType::Basic => Self::Basic(BasicAuth::new(base, users)),
            AuthType::Session => Self::Session(SessionAuth::new(base, users, clock)),
            AuthType::SessionExpiry => Self::SessionExpiry(SessionExpAuth::new(
                SessionAuth::new(base, users, clock),
                config.session_duration(),
            )),
            AuthType::SessionPersistent => Self::SessionPersistent(
                SessionDbAuth::new(
                    base,
                    users,
                    ExpiryPolicy::new(config.session_duration(), clock),
                    sessions,
                )
                .await?,
            ),
        };

        info!(
            auth_type = %auth_type,
            session_name = config.session_name(),
            session_duration = config.session_duration(),
            "authentication enabled"
        );
        Ok(Some(authenticator))
    }

    #[must_use]
    pub const fn kind(&self) -> AuthType {
        match self {
            Self::Null(_) => AuthType::Auth,
            Self::Basic(_) => AuthType::Basic,
            Self::Session(_) => AuthType::Session,
            Self::SessionExpiry(_) => AuthType::SessionExpiry,
            Self::SessionPersistent(_) => AuthType::SessionPersistent,
        }
    }

    #[must_use]
    pub const fn base(&self) -> &Auth {
        match self {
            Self::Null(base) => base,
            Self::Basic(auth) => auth.base(),
            Self::Session(auth) => auth.base(),
            Self::SessionExpiry(auth) => auth.base(),
            Self::SessionPersistent(auth) => auth.base(),
        }
    }

    /// Whether the strategy issues and destroys sessions.
    #[must_use]
    pub const fn supports_sessions(&self) -> bool {
        matches!(
            self,
            Self::Session(_) | Self::SessionExpiry(_) | Self::SessionPersistent(_)
        )
    }

    #[must_use]
    pub fn require_auth(&self, path: &str, excluded_paths: &ExcludedPaths) -> bool {
        excluded_paths.requires_auth(path)
    }

    pub fn authorization_header<'r, R: AuthRequest + ?Sized>(&self, request: &'r R) -> Option<&'r str> {
        self.base().authorization_header(request)
    }

    pub fn session_cookie<'r, R: AuthRequest + ?Sized>(&self, request: &'r R) -> Option<&'r str> {
        self.base().session_cookie(request)
    }

    pub async fn current_user<R: AuthRequest + Sync + ?Sized>(&self, request: &R) -> Option<User> {
        match self {
            Self::Null(_) => None,
            Self::Basic(auth) => auth.current_user(request).await,
            Self::Session(auth) => auth.current_user(request).await,
            Self::SessionExpiry(auth) => auth.current_user(request).await,
            Self::SessionPersistent(auth) => auth.current_user(request).await,
        }
    }

    /// New session id for `user_id`; strategies without sessions return `None`.
    pub async fn create_session(&self, user_id: Option<&str>) -> Option<String> {
        match self {
            Self::Null(_) | Self::Basic(_) => None,
            Self::Session(auth) => auth.create_session(user_id).await,
            Self::SessionExpiry(auth) => auth.create_session(user_id).await,
            Self::SessionPersistent(auth) => auth.create_session(user_id).await,
        }
    }

    pub async fn user_id_for_session_id(&self, session_id: Option<&str>) -> Option<String> {
        match self {
            Self::Null(_) | Self::Basic(_) => None,
            Self::Session(auth) => auth.user_id_for_session_id(session_id).await,
            Self::SessionExpiry(auth) => auth.user_id_for_session_id(session_id).await,
            Self::SessionPersistent(auth) => auth.user_id_for_session_id(session_id).await,
        }
    }

    pub async fn destroy_session<R: AuthRequest + Sync + ?Sized>(&self, request: &R) -> bool {
        match self {
            Self::Null(_) | Self::Basic(_) => false,
            Self::Session(auth) => auth.destroy_session(request).await,
            Self::SessionExpiry(auth) => auth.destroy_session(request).await,
            Self::SessionPersistent(auth) => auth.destroy_session(request).await,
        }
    }
}
