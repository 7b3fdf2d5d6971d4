use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, User, UserField, UserQuery, UserStore};

/// Process-local user store; contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find(&self, query: &UserQuery) -> Result<Option<User>, StoreError> {
        if query.criteria().is_empty() {
            return Err(StoreError::EmptyQuery);
        }
        let users = self.users.read().await;
        Ok(users.iter().find(|user| query.matches(user)).cloned())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.users.read().await.len() as u64)
    }

    async fn add(&self, email: &str, hashed_password: &str) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.iter().any(|user| user.email == email) {
            return Err(StoreError::Conflict);
        }
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
            session_id: None,
            reset_token: None,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: &str, fields: &[UserField]) -> Result<(), StoreError> {
        let mut users = self.users.write().await;

        // Email must stay unique across users.
        for field in fields {
            if let UserField::Email(email) = field {
                if users.iter().any(|user| user.id != id && &user.email == email) {
                    return Err(StoreError::Conflict);
                }
            }
        }

        let user = users
            .iter_mut()
            .find(|user| user.id == id)
            .ok_or(StoreError::NotFound)?;
        for field in fields {
            field.apply(user);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_find_and_count() {
        let store = MemoryUserStore::new();
        assert_eq!(store.count().await.unwrap(), 0);

        let user = store.add("bob@example.com", "hash").await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        let found = store.find(&UserQuery::by_id(&user.id)).await.unwrap();
        assert_eq!(found, Some(user));
        assert!(store
            .find(&UserQuery::by_email("nobody@example.com"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryUserStore::new();
        store.add("bob@example.com", "hash").await.unwrap();
        assert!(matches!(
            store.add("bob@example.com", "other").await,
            Err(StoreError::Conflict)
        ));
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let store = MemoryUserStore::new();
        assert!(matches!(
            store.find(&UserQuery::default()).await,
            Err(StoreError::EmptyQuery)
        ));
    }

    #[tokio::test]
    async fn update_applies_fields_and_reports_missing_users() {
        let store = MemoryUserStore::new();
        let user = store.add("bob@example.com", "hash").await.unwrap();

        store
            .update(&user.id, &[UserField::SessionId(Some("s-1".to_string()))])
            .await
            .unwrap();
        let found = store
            .find(&UserQuery::by_session_id("s-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);

        assert!(matches!(
            store.update("missing", &[UserField::SessionId(None)]).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn update_keeps_emails_unique() {
        let store = MemoryUserStore::new();
        store.add("alice@example.com", "hash").await.unwrap();
        let bob = store.add("bob@example.com", "hash").await.unwrap();

        assert!(matches!(
            store
                .update(&bob.id, &[UserField::Email("alice@example.com".to_string())])
                .await,
            Err(StoreError::Conflict)
        ));
    }
}
