use axum::{
    extract::{Form, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use utoipa::ToSchema;

use super::{error_response, present};
use crate::auth::password::verify_password;
use crate::store::UserQuery;
use crate::turnstile::state::AppState;

#[derive(ToSchema, Deserialize, Default)]
pub struct LoginForm {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[utoipa::path(
    post,
    path= "/api/v1/auth_session/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 200, description = "Logged in, session cookie set"),
        (status = 400, description = "email or password missing"),
        (status = 401, description = "Wrong password"),
        (status = 404, description = "No user found for this email"),
        (status = 501, description = "The configured strategy has no sessions"),
    ),
    tag = "session",
)]
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let Some(email) = present(form.email) else {
        return error_response(StatusCode::BAD_REQUEST, "email missing");
    };
    let Some(password) = present(form.password).map(SecretString::from) else {
        return error_response(StatusCode::BAD_REQUEST, "password missing");
    };

    let Some(authenticator) = state
        .authenticator
        .as_deref()
        .filter(|authenticator| authenticator.supports_sessions())
    else {
        return error_response(
            StatusCode::NOT_IMPLEMENTED,
            "session authentication is not enabled",
        );
    };

    let user = match state.users.find(&UserQuery::by_email(&email)).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return error_response(StatusCode::NOT_FOUND, "no user found for this email");
        }
        Err(err) => {
            error!("Failed to lookup user: {err}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
        }
    };

    if !verify_password(&user.hashed_password, password.expose_secret()) {
        return error_response(StatusCode::UNAUTHORIZED, "wrong password");
    }

    let Some(session_id) = authenticator.create_session(Some(&user.id)).await else {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
    };

    info!(user_id = %user.id, "logged in");
    let cookie = session_cookie(authenticator.base().session_name(), &session_id);
    ([(header::SET_COOKIE, cookie)], Json(user)).into_response()
}

#[utoipa::path(
    delete,
    path= "/api/v1/auth_session/logout",
    responses (
        (status = 200, description = "Session destroyed"),
        (status = 401, description = "No credentials"),
        (status = 403, description = "Credentials did not resolve a user"),
        (status = 404, description = "No session to destroy"),
    ),
    tag = "session",
)]
pub async fn logout(State(state): State<AppState>, request: Request) -> Response {
    let (parts, _) = request.into_parts();
    let Some(authenticator) = state.authenticator.as_deref() else {
        return error_response(StatusCode::NOT_FOUND, "Not found");
    };
    if authenticator.destroy_session(&parts).await {
        Json(json!({})).into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, "Not found")
    }
}

pub(crate) fn session_cookie(name: &str, session_id: &str) -> String {
    format!("{name}={session_id}; Path=/; HttpOnly; SameSite=Lax")
}
