//! Credential and session storage contracts.
//!
//! The authenticators only ever talk to these traits. Backends:
//! - [`MemoryUserStore`]: process-local users, used when no DSN is configured.
//! - [`JsonSessionStore`]: session records indexed in memory and optionally
//!   written through to a JSON file.
//! - [`PgUserStore`] / [`PgSessionStore`]: `PostgreSQL` tables from `sql/schema.sql`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod file;
pub mod memory;
pub mod postgres;

pub use file::JsonSessionStore;
pub use memory::MemoryUserStore;
pub use postgres::{PgSessionStore, PgUserStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("field `{0}` can not be updated")]
    UnknownField(String),
    #[error("query has no criteria")]
    EmptyQuery,
    #[error("record already exists")]
    Conflict,
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid storage document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Identity record owned by the credential store.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    #[serde(skip_serializing)]
    pub session_id: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("hashed_password", &"***")
            .field("session_id", &self.session_id.as_ref().map(|_| "***"))
            .field("reset_token", &self.reset_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Lookup criteria for [`UserStore::find`]; all present criteria must match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserQuery {
    pub id: Option<String>,
    pub email: Option<String>,
    pub session_id: Option<String>,
    pub reset_token: Option<String>,
}

impl UserQuery {
    #[must_use]
    pub fn by_id(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn by_email(email: &str) -> Self {
        Self {
            email: Some(email.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn by_session_id(session_id: &str) -> Self {
        Self {
            session_id: Some(session_id.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn by_reset_token(reset_token: &str) -> Self {
        Self {
            reset_token: Some(reset_token.to_string()),
            ..Self::default()
        }
    }

    /// Column/value pairs for every criterion that is set.
    #[must_use]
    pub fn criteria(&self) -> Vec<(&'static str, &str)> {
        [
            ("id", self.id.as_deref()),
            ("email", self.email.as_deref()),
            ("session_id", self.session_id.as_deref()),
            ("reset_token", self.reset_token.as_deref()),
        ]
        .into_iter()
        .filter_map(|(column, value)| value.map(|value| (column, value)))
        .collect()
    }

    #[must_use]
    pub fn matches(&self, user: &User) -> bool {
        self.criteria().into_iter().all(|(column, value)| match column {
            "id" => user.id == value,
            "email" => user.email == value,
            "session_id" => user.session_id.as_deref() == Some(value),
            "reset_token" => user.reset_token.as_deref() == Some(value),
            _ => false,
        })
    }
}

/// The only user fields that may change after creation.
#[derive(Clone, PartialEq, Eq)]
pub enum UserField {
    Email(String),
    HashedPassword(String),
    SessionId(Option<String>),
    ResetToken(Option<String>),
}

impl UserField {
    /// Build an update from a field name, rejecting anything outside the allow-list.
    ///
    /// # Errors
    /// Returns [`StoreError::UnknownField`] for `id` or any unknown name.
    pub fn parse(name: &str, value: Option<String>) -> Result<Self, StoreError> {
        match (name, value) {
            ("email", Some(email)) => Ok(Self::Email(email)),
            ("hashed_password", Some(hash)) => Ok(Self::HashedPassword(hash)),
            ("session_id", value) => Ok(Self::SessionId(value)),
            ("reset_token", value) => Ok(Self::ResetToken(value)),
            (other, _) => Err(StoreError::UnknownField(other.to_string())),
        }
    }

    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Email(_) => "email",
            Self::HashedPassword(_) => "hashed_password",
            Self::SessionId(_) => "session_id",
            Self::ResetToken(_) => "reset_token",
        }
    }

    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Email(value) | Self::HashedPassword(value) => Some(value),
            Self::SessionId(value) | Self::ResetToken(value) => value.as_deref(),
        }
    }

    pub fn apply(&self, user: &mut User) {
        match self {
            Self::Email(email) => user.email.clone_from(email),
            Self::HashedPassword(hash) => user.hashed_password.clone_from(hash),
            Self::SessionId(session_id) => user.session_id.clone_from(session_id),
            Self::ResetToken(token) => user.reset_token.clone_from(token),
        }
    }
}

impl std::fmt::Debug for UserField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserField({})", self.column())
    }
}

/// Durable session record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub session_id: String,
    pub user_id: String,
    /// Unix seconds.
    pub created_at: i64,
}

impl SessionRecord {
    #[must_use]
    pub fn new(session_id: String, user_id: String, created_at: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id,
            user_id,
            created_at,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionQuery {
    pub session_id: Option<String>,
    pub user_id: Option<String>,
}

impl SessionQuery {
    #[must_use]
    pub fn by_session_id(session_id: &str) -> Self {
        Self {
            session_id: Some(session_id.to_string()),
            user_id: None,
        }
    }

    #[must_use]
    pub fn matches(&self, record: &SessionRecord) -> bool {
        self.session_id
            .as_deref()
            .map_or(true, |session_id| record.session_id == session_id)
            && self
                .user_id
                .as_deref()
                .map_or(true, |user_id| record.user_id == user_id)
    }
}

/// Holds users and their salted password hashes.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// First user matching every criterion of `query`.
    async fn find(&self, query: &UserQuery) -> Result<Option<User>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    /// Insert a user with a fresh id. Duplicate emails are a [`StoreError::Conflict`].
    async fn add(&self, email: &str, hashed_password: &str) -> Result<User, StoreError>;

    /// Apply `fields` to the user `id`; [`StoreError::NotFound`] if it does not exist.
    async fn update(&self, id: &str, fields: &[UserField]) -> Result<(), StoreError>;
}

/// Durable session records keyed by unique `session_id`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load every stored record into the backend's index, returning how many exist.
    async fn load_all(&self) -> Result<usize, StoreError>;

    async fn search(&self, query: &SessionQuery) -> Result<Vec<SessionRecord>, StoreError>;

    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError>;

    async fn remove(&self, record: &SessionRecord) -> Result<(), StoreError>;
}
