//! Expiring sessions kept in a durable [`SessionStore`].
//!
//! Records survive a restart: the store is loaded once at construction and
//! every lookup goes back to it. There is no in-memory mirror, so the store is
//! the single source of truth.

use std::sync::Arc;
use tracing::{debug, error};

use super::{
    base::Auth, expiry::ExpiryPolicy, request::AuthRequest, resolve_user, token,
};
use crate::store::{SessionQuery, SessionRecord, SessionStore, User, UserStore};

pub struct SessionDbAuth {
    base: Auth,
    users: Arc<dyn UserStore>,
    policy: ExpiryPolicy,
    store: Arc<dyn SessionStore>,
}

impl SessionDbAuth {
    /// Build the authenticator and load existing records.
    ///
    /// # Errors
    /// Fails if the store can not be loaded, e.g. a corrupt session file.
    pub async fn new(
        base: Auth,
        users: Arc<dyn UserStore>,
        policy: ExpiryPolicy,
        store: Arc<dyn SessionStore>,
    ) -> anyhow::Result<Self> {
        let loaded = store.load_all().await?;
        debug!("loaded {loaded} persisted sessions");
        Ok(Self {
            base,
            users,
            policy,
            store,
        })
    }

    #[must_use]
    pub const fn base(&self) -> &Auth {
        &self.base
    }

    #[must_use]
    pub const fn policy(&self) -> &ExpiryPolicy {
        &self.policy
    }

    pub async fn create_session(&self, user_id: Option<&str>) -> Option<String> {
        let user_id = user_id.filter(|id| !id.is_empty())?;
        let session_id = match token::generate_session_id() {
            Ok(session_id) => session_id,
            Err(err) => {
                error!("Failed to create session: {err:#}");
                return None;
            }
        };

        let record = SessionRecord::new(session_id.clone(), user_id.to_string(), self.policy.now());
        match self.store.save(&record).await {
            Ok(()) => {
                debug!(user_id, "persistent session created");
                Some(session_id)
            }
            Err(err) => {
                error!("Failed to save session: {err}");
                None
            }
        }
    }

    async fn record(&self, session_id: &str) -> Option<SessionRecord> {
        match self.store.search(&SessionQuery::by_session_id(session_id)).await {
            Ok(records) => records.into_iter().next(),
            Err(err) => {
                error!("Failed to search sessions: {err}");
                None
            }
        }
    }

    /// Owner of `session_id`, evicting the record if it has expired.
    pub async fn user_id_for_session_id(&self, session_id: Option<&str>) -> Option<String> {
        let session_id = session_id.filter(|id| !id.is_empty())?;
        let record = self.record(session_id).await?;
        if !self.policy.is_expired(record.created_at) {
            return Some(record.user_id);
        }

        debug!(user_id = %record.user_id, "persistent session expired");
        if let Err(err) = self.store.remove(&record).await {
            error!("Failed to remove expired session: {err}");
        }
        None
    }

    pub async fn current_user<R: AuthRequest + Sync + ?Sized>(&self, request: &R) -> Option<User> {
        let user_id = self
            .user_id_for_session_id(self.base.session_cookie(request))
            .await?;
        resolve_user(self.users.as_ref(), &user_id).await
    }

    /// Remove the record named by the session cookie.
    ///
    /// An expired record is evicted by the lookup and reported as not destroyed.
    pub async fn destroy_session<R: AuthRequest + Sync + ?Sized>(&self, request: &R) -> bool {
        let Some(session_id) = self.base.session_cookie(request).filter(|id| !id.is_empty()) else {
            return false;
        };
        if self.user_id_for_session_id(Some(session_id)).await.is_none() {
            return false;
        }
        let Some(record) = self.record(session_id).await else {
            return false;
        };
        match self.store.remove(&record).await {
            Ok(()) => true,
            Err(err) => {
                error!("Failed to remove session: {err}");
                false
            }
        }
    }
}

impl std::fmt::Debug for SessionDbAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionDbAuth")
            .field("base", &self.base)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
