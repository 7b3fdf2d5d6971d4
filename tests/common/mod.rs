#![allow(dead_code, clippy::unwrap_used)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response},
    Router,
};
use secrecy::SecretString;
use serde_json::Value;
use std::sync::Arc;
use turnstile::auth::{
    config::DEFAULT_EXCLUDED_PATHS, password::hash_password, AuthConfig, AuthType, Authenticator,
    ExcludedPaths, ManualClock,
};
use turnstile::store::{JsonSessionStore, MemoryUserStore, UserStore};
use turnstile::turnstile::{router, AppState};

pub const EMAIL: &str = "bob@example.com";
pub const PASSWORD: &str = "Sup3rSecret!";
pub const T: i64 = 1_700_000_000;

pub struct TestApp {
    pub router: Router,
    pub users: Arc<MemoryUserStore>,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub async fn new(auth_type: Option<AuthType>) -> Self {
        Self::with_duration(auth_type, 0).await
    }

    pub async fn with_duration(auth_type: Option<AuthType>, duration: i64) -> Self {
        let users = Arc::new(MemoryUserStore::new());
        let hash = hash_password(&SecretString::from(PASSWORD)).unwrap();
        users.add(EMAIL, &hash).await.unwrap();

        let clock = Arc::new(ManualClock::new(T));
        let config = AuthConfig::new()
            .with_auth_type(auth_type)
            .with_session_name("sid".to_string())
            .with_session_duration(duration)
            .with_excluded_paths(ExcludedPaths::new(DEFAULT_EXCLUDED_PATHS));

        let authenticator = Authenticator::from_config(
            &config,
            users.clone(),
            Arc::new(JsonSessionStore::in_memory()),
            clock.clone(),
        )
        .await
        .unwrap();

        let state = AppState::new(authenticator, config.excluded_paths().clone(), users.clone());
        Self {
            router: router(state),
            users,
            clock,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        tower::ServiceExt::oneshot(self.router.clone(), request)
            .await
            .unwrap()
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn with_header(method: &str, uri: &str, name: header::HeaderName, value: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(name, value)
        .body(Body::empty())
        .unwrap()
}

pub fn form(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// `name=value` from the `Set-Cookie` header.
pub fn cookie_pair(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .unwrap()
        .to_string()
}
