//! In-memory session authentication.
//!
//! The map is owned by the authenticator instance (one per process) and
//! guarded by a `RwLock`: creation and destruction take the write lock,
//! lookups only the read lock.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

use super::{base::Auth, clock::Clock, request::AuthRequest, resolve_user, token};
use crate::store::{User, UserStore};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SessionEntry {
    pub(crate) user_id: String,
    pub(crate) created_at: i64,
}

pub struct SessionAuth {
    base: Auth,
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionAuth {
    #[must_use]
    pub fn new(base: Auth, users: Arc<dyn UserStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            base,
            users,
            clock,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn base(&self) -> &Auth {
        &self.base
    }

    pub(crate) fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Start a session for `user_id`, returning the new session id.
    pub async fn create_session(&self, user_id: Option<&str>) -> Option<String> {
        let user_id = user_id.filter(|id| !id.is_empty())?;
        let created_at = self.clock.now();

        let mut sessions = self.sessions.write().await;
        // A collision is practically impossible, but ids must never be reused.
        for _ in 0..3 {
            let session_id = match token::generate_session_id() {
                Ok(session_id) => session_id,
                Err(err) => {
                    error!("Failed to create session: {err:#}");
                    return None;
                }
            };
            if sessions.contains_key(&session_id) {
                continue;
            }
            sessions.insert(
                session_id.clone(),
                SessionEntry {
                    user_id: user_id.to_string(),
                    created_at,
                },
            );
            debug!(user_id, "session created");
            return Some(session_id);
        }

        error!("Failed to create a unique session id");
        None
    }

    pub async fn user_id_for_session_id(&self, session_id: Option<&str>) -> Option<String> {
        self.entry(session_id).await.map(|entry| entry.user_id)
    }

    pub(crate) async fn entry(&self, session_id: Option<&str>) -> Option<SessionEntry> {
        let session_id = session_id.filter(|id| !id.is_empty())?;
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Drop the mapping for `session_id`, returning whether one existed.
    pub(crate) async fn remove(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    pub async fn current_user<R: AuthRequest + Sync + ?Sized>(&self, request: &R) -> Option<User> {
        let user_id = self
            .user_id_for_session_id(self.base.session_cookie(request))
            .await?;
        resolve_user(self.users.as_ref(), &user_id).await
    }

    /// Log out: requires a cookie that currently maps to a user.
    pub async fn destroy_session<R: AuthRequest + Sync + ?Sized>(&self, request: &R) -> bool {
        let Some(session_id) = self.base.session_cookie(request) else {
            return false;
        };
        if self.user_id_for_session_id(Some(session_id)).await.is_none() {
            return false;
        }
        self.remove(session_id).await
    }
}

impl std::fmt::Debug for SessionAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAuth")
            .field("base", &self.base)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
