//! Request gate: runs before every `/api/v1` handler.
//!
//! 1. no authenticator configured: pass through
//! 2. excluded path: pass through
//! 3. neither `Authorization` header nor session cookie: 401
//! 4. no principal resolved: 403
//! 5. otherwise the principal is attached as [`CurrentUser`]

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::debug;

use super::state::AppState;
use crate::store::User;

/// Principal resolved for the current request.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Denial {
    Unauthorized,
    Forbidden,
}

impl Denial {
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
        }
    }
}

impl IntoResponse for Denial {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}

pub async fn gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(authenticator) = state.authenticator.clone() else {
        return next.run(request).await;
    };

    let (mut parts, body) = request.into_parts();
    if !authenticator.require_auth(parts.uri.path(), &state.excluded_paths) {
        return next.run(Request::from_parts(parts, body)).await;
    }

    if authenticator.authorization_header(&parts).is_none()
        && authenticator.session_cookie(&parts).is_none()
    {
        debug!(path = parts.uri.path(), "no credentials presented");
        return Denial::Unauthorized.into_response();
    }

    let Some(user) = authenticator.current_user(&parts).await else {
        debug!(path = parts.uri.path(), "credentials did not resolve a user");
        return Denial::Forbidden.into_response();
    };

    parts.extensions.insert(CurrentUser(user));
    next.run(Request::from_parts(parts, body)).await
}
