//! Sessions that expire a fixed duration after creation.
//!
//! Expiry is detected when a session is read; there is no sliding refresh. An
//! expired entry is evicted as soon as it is detected, the same as the
//! persistent variant does with its records.

use std::sync::Arc;
use tracing::debug;

use super::{base::Auth, clock::Clock, request::AuthRequest, resolve_user, session::SessionAuth};
use crate::store::User;

/// Fixed-window expiry evaluated against a clock.
#[derive(Clone, Debug)]
pub struct ExpiryPolicy {
    duration: i64,
    clock: Arc<dyn Clock>,
}

impl ExpiryPolicy {
    #[must_use]
    pub fn new(duration: i64, clock: Arc<dyn Clock>) -> Self {
        Self { duration, clock }
    }

    /// Seconds; `<= 0` disables expiry.
    #[must_use]
    pub const fn duration(&self) -> i64 {
        self.duration
    }

    #[must_use]
    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// `created_at + duration` strictly before now.
    #[must_use]
    pub fn is_expired(&self, created_at: i64) -> bool {
        self.duration > 0 && created_at.saturating_add(self.duration) < self.clock.now()
    }
}

#[derive(Debug)]
pub struct SessionExpAuth {
    sessions: SessionAuth,
    policy: ExpiryPolicy,
}

impl SessionExpAuth {
    /// Wrap `sessions`, sharing its clock for the expiry window.
    #[must_use]
    pub fn new(sessions: SessionAuth, duration: i64) -> Self {
        let policy = ExpiryPolicy::new(duration, sessions.clock().clone());
        Self { sessions, policy }
    }

    #[must_use]
    pub const fn base(&self) -> &Auth {
        self.sessions.base()
    }

    #[must_use]
    pub const fn policy(&self) -> &ExpiryPolicy {
        &self.policy
    }

    pub async fn create_session(&self, user_id: Option<&str>) -> Option<String> {
        self.sessions.create_session(user_id).await
    }

    pub async fn user_id_for_session_id(&self, session_id: Option<&str>) -> Option<String> {
        let entry = self.sessions.entry(session_id).await?;
        if self.policy.is_expired(entry.created_at) {
            if let Some(session_id) = session_id {
                self.sessions.remove(session_id).await;
            }
            debug!(user_id = %entry.user_id, "session expired");
            return None;
        }
        Some(entry.user_id)
    }

    pub async fn current_user<R: AuthRequest + Sync + ?Sized>(&self, request: &R) -> Option<User> {
        let user_id = self
            .user_id_for_session_id(self.base().session_cookie(request))
            .await?;
        resolve_user(self.sessions.users().as_ref(), &user_id).await
    }

    /// Log out: an expired session can not be destroyed, it is already gone.
    pub async fn destroy_session<R: AuthRequest + Sync + ?Sized>(&self, request: &R) -> bool {
        let Some(session_id) = self.base().session_cookie(request) else {
            return false;
        };
        if self.user_id_for_session_id(Some(session_id)).await.is_none() {
            return false;
        }
        self.sessions.remove(session_id).await
    }
}
