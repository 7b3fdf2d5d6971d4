//! Account lifecycle over the credential store.
//!
//! Unlike the request authenticators this service keeps the current session id
//! on the user record itself, and it also drives registration and password
//! reset. Errors are surfaced so handlers can pick the status code.

use secrecy::SecretString;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::store::{StoreError, User, UserField, UserQuery, UserStore};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("User {0} already exists")]
    AlreadyExists(String),
    #[error("no user matches")]
    NotFound,
    #[error("reset token is not valid")]
    InvalidToken,
    #[error("failed to hash password")]
    Hash,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
}

impl AccountService {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    #[must_use]
    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    /// Create a user with a salted hash of `password`.
    ///
    /// # Errors
    /// [`AccountError::AlreadyExists`] if the email is taken.
    pub async fn register_user(&self, email: &str, password: &SecretString) -> Result<User, AccountError> {
        if self.users.find(&UserQuery::by_email(email)).await?.is_some() {
            return Err(AccountError::AlreadyExists(email.to_string()));
        }
        let hashed = hash_password(password).map_err(|err| {
            error!("{err:#}");
            AccountError::Hash
        })?;
        let user = self.users.add(email, &hashed).await.map_err(|err| match err {
            StoreError::Conflict => AccountError::AlreadyExists(email.to_string()),
            other => AccountError::Store(other),
        })?;
        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    pub async fn valid_login(&self, email: &str, password: &str) -> bool {
        match self.users.find(&UserQuery::by_email(email)).await {
            Ok(Some(user)) => verify_password(&user.hashed_password, password),
            Ok(None) => false,
            Err(err) => {
                error!("Failed to lookup user: {err}");
                false
            }
        }
    }

    /// Issue a session id and store it on the user; `None` for unknown emails.
    pub async fn create_session(&self, email: &str) -> Option<String> {
        let user = match self.users.find(&UserQuery::by_email(email)).await {
            Ok(Some(user)) => user,
            Ok(None) => return None,
            Err(err) => {
                error!("Failed to lookup user: {err}");
                return None;
            }
        };
        let session_id = Uuid::new_v4().to_string();
        match self
            .users
            .update(&user.id, &[UserField::SessionId(Some(session_id.clone()))])
            .await
        {
            Ok(()) => {
                debug!(user_id = %user.id, "account session created");
                Some(session_id)
            }
            Err(err) => {
                error!("Failed to store session: {err}");
                None
            }
        }
    }

    pub async fn get_user_from_session_id(&self, session_id: Option<&str>) -> Option<User> {
        let session_id = session_id.filter(|id| !id.is_empty())?;
        match self.users.find(&UserQuery::by_session_id(session_id)).await {
            Ok(user) => user,
            Err(err) => {
                error!("Failed to lookup session: {err}");
                None
            }
        }
    }

    /// Clear the session id stored on `user_id`.
    ///
    /// # Errors
    /// [`AccountError::NotFound`] if the user does not exist.
    pub async fn destroy_session(&self, user_id: &str) -> Result<(), AccountError> {
        self.users
            .update(user_id, &[UserField::SessionId(None)])
            .await
            .map_err(|err| match err {
                StoreError::NotFound => AccountError::NotFound,
                other => AccountError::Store(other),
            })
    }

    /// Issue and store a fresh reset token for `email`.
    ///
    /// # Errors
    /// [`AccountError::NotFound`] for an unknown email.
    pub async fn get_reset_password_token(&self, email: &str) -> Result<String, AccountError> {
        let user = self
            .users
            .find(&UserQuery::by_email(email))
            .await?
            .ok_or(AccountError::NotFound)?;
        let reset_token = Uuid::new_v4().to_string();
        self.users
            .update(&user.id, &[UserField::ResetToken(Some(reset_token.clone()))])
            .await?;
        Ok(reset_token)
    }

    /// Replace the password of the user holding `reset_token` and burn the token.
    ///
    /// # Errors
    /// [`AccountError::InvalidToken`] when no user holds the token.
    pub async fn update_password(&self, reset_token: &str, password: &SecretString) -> Result<(), AccountError> {
        if reset_token.is_empty() {
            return Err(AccountError::InvalidToken);
        }
        let user = self
            .users
            .find(&UserQuery::by_reset_token(reset_token))
            .await?
            .ok_or(AccountError::InvalidToken)?;
        let hashed = hash_password(password).map_err(|err| {
            error!("{err:#}");
            AccountError::Hash
        })?;
        self.users
            .update(
                &user.id,
                &[UserField::HashedPassword(hashed), UserField::ResetToken(None)],
            )
            .await?;
        info!(user_id = %user.id, "password updated");
        Ok(())
    }
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryUserStore;

    fn service() -> AccountService {
        AccountService::new(Arc::new(MemoryUserStore::new()))
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value)
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let accounts = service();
        let user = accounts
            .register_user("bob@example.com", &secret("pw"))
            .await
            .unwrap();
        assert_eq!(user.email, "bob@example.com");
        assert_ne!(user.hashed_password, "pw");

        let err = accounts
            .register_user("bob@example.com", &secret("other"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::AlreadyExists(email) if email == "bob@example.com"));
    }

    #[tokio::test]
    async fn valid_login_checks_password() {
        let accounts = service();
        accounts
            .register_user("bob@example.com", &secret("pw"))
            .await
            .unwrap();
        assert!(accounts.valid_login("bob@example.com", "pw").await);
        assert!(!accounts.valid_login("bob@example.com", "nope").await);
        assert!(!accounts.valid_login("eve@example.com", "pw").await);
    }

    #[tokio::test]
    async fn session_lives_on_the_user_record() {
        let accounts = service();
        let user = accounts
            .register_user("bob@example.com", &secret("pw"))
            .await
            .unwrap();

        assert!(accounts.create_session("eve@example.com").await.is_none());
        let session_id = accounts.create_session("bob@example.com").await.unwrap();
        let found = accounts
            .get_user_from_session_id(Some(&session_id))
            .await
            .unwrap();
        assert_eq!(found.id, user.id);
        assert!(accounts.get_user_from_session_id(None).await.is_none());
        assert!(accounts.get_user_from_session_id(Some("")).await.is_none());

        accounts.destroy_session(&user.id).await.unwrap();
        assert!(accounts
            .get_user_from_session_id(Some(&session_id))
            .await
            .is_none());
        assert!(matches!(
            accounts.destroy_session("missing").await,
            Err(AccountError::NotFound)
        ));
    }

    #[tokio::test]
    async fn reset_token_updates_password_once() {
        let accounts = service();
        accounts
            .register_user("bob@example.com", &secret("old"))
            .await
            .unwrap();

        assert!(matches!(
            accounts.get_reset_password_token("eve@example.com").await,
            Err(AccountError::NotFound)
        ));

        let token = accounts
            .get_reset_password_token("bob@example.com")
            .await
            .unwrap();
        accounts.update_password(&token, &secret("new")).await.unwrap();
        assert!(accounts.valid_login("bob@example.com", "new").await);
        assert!(!accounts.valid_login("bob@example.com", "old").await);

        assert!(matches!(
            accounts.update_password(&token, &secret("again")).await,
            Err(AccountError::InvalidToken)
        ));
        assert!(matches!(
            accounts.update_password("", &secret("again")).await,
            Err(AccountError::InvalidToken)
        ));
    }
}
