//! HTTP Basic authentication against the credential store.

use base64ct::{Base64, Encoding};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{debug, error};

use super::{base::Auth, password::verify_password, request::AuthRequest};
use crate::store::{User, UserQuery, UserStore};

const BASIC_PREFIX: &str = "Basic ";

/// Identifier and secret decoded from a Basic header.
#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

/// Strip the case-sensitive `Basic ` prefix.
#[must_use]
pub fn extract_base64_authorization_header(header: Option<&str>) -> Option<&str> {
    header?.strip_prefix(BASIC_PREFIX)
}

/// Decode the base64 payload into UTF-8.
#[must_use]
pub fn decode_base64_authorization_header(encoded: Option<&str>) -> Option<String> {
    let bytes = Base64::decode_vec(encoded?)
        .map_err(|err| debug!("invalid base64 in basic credentials: {err}"))
        .ok()?;
    String::from_utf8(bytes)
        .map_err(|_| debug!("basic credentials are not UTF-8"))
        .ok()
}

/// Split `email:password` on the first colon; the password may contain colons.
#[must_use]
pub fn extract_user_credentials(decoded: Option<&str>) -> Option<Credentials> {
    let (email, password) = decoded?.split_once(':')?;
    Some(Credentials {
        email: email.to_string(),
        password: SecretString::from(password),
    })
}

#[derive(Clone)]
pub struct BasicAuth {
    base: Auth,
    users: Arc<dyn UserStore>,
}

impl BasicAuth {
    #[must_use]
    pub fn new(base: Auth, users: Arc<dyn UserStore>) -> Self {
        Self { base, users }
    }

    #[must_use]
    pub const fn base(&self) -> &Auth {
        &self.base
    }

    /// Look up `email` and verify `password`.
    ///
    /// An empty store never yields a user.
    pub async fn user_object_from_credentials(&self, email: &str, password: &str) -> Option<User> {
        match self.users.count().await {
            Ok(0) => return None,
            Ok(_) => {}
            Err(err) => {
                error!("Failed to count users: {err}");
                return None;
            }
        }

        let user = match self.users.find(&UserQuery::by_email(email)).await {
            Ok(Some(user)) => user,
            Ok(None) => return None,
            Err(err) => {
                error!("Failed to lookup user: {err}");
                return None;
            }
        };

        verify_password(&user.hashed_password, password).then_some(user)
    }

    pub async fn current_user<R: AuthRequest + Sync + ?Sized>(&self, request: &R) -> Option<User> {
        let header = self.base.authorization_header(request);
        let encoded = extract_base64_authorization_header(header);
        let decoded = decode_base64_authorization_header(encoded);
        let credentials = extract_user_credentials(decoded.as_deref())?;
        self.user_object_from_credentials(&credentials.email, credentials.password.expose_secret())
            .await
    }
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth").field("base", &self.base).finish()
    }
}
