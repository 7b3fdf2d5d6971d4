//! Account routes: registration, cookie login on the user record, profile and
//! password reset. These are not behind the request gate.

use axum::{
    extract::{Form, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use utoipa::ToSchema;

use super::{present, session_auth::session_cookie, valid_email};
use crate::accounts::AccountError;
use crate::auth::AuthRequest;
use crate::turnstile::state::AppState;

/// Cookie carrying the session id stored on the user record.
pub const ACCOUNT_SESSION_COOKIE: &str = "session_id";

#[derive(ToSchema, Deserialize, Default)]
pub struct CredentialsForm {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(ToSchema, Deserialize, Default)]
pub struct ResetRequestForm {
    #[serde(default)]
    email: Option<String>,
}

#[derive(ToSchema, Deserialize, Default)]
pub struct ResetPasswordForm {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    reset_token: Option<String>,
    #[serde(default)]
    new_password: Option<String>,
}

fn message(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn account_error(err: &AccountError) -> Response {
    match err {
        AccountError::NotFound | AccountError::InvalidToken => StatusCode::FORBIDDEN.into_response(),
        AccountError::AlreadyExists(_) => message(StatusCode::BAD_REQUEST, "email already registered"),
        AccountError::Hash | AccountError::Store(_) => {
            error!("Account operation failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path= "/",
    responses (
        (status = 200, description = "Welcome message"),
    ),
    tag = "accounts",
)]
pub async fn index() -> impl IntoResponse {
    Json(json!({ "message": "Bienvenue" }))
}

#[utoipa::path(
    post,
    path= "/users",
    request_body(content = CredentialsForm, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 200, description = "User created"),
        (status = 400, description = "Email already registered or invalid input"),
    ),
    tag = "accounts",
)]
pub async fn users(State(state): State<AppState>, Form(form): Form<CredentialsForm>) -> Response {
    let Some(email) = present(form.email) else {
        return message(StatusCode::BAD_REQUEST, "email missing");
    };
    if !valid_email(&email) {
        return message(StatusCode::BAD_REQUEST, "invalid email");
    }
    let Some(password) = present(form.password).map(SecretString::from) else {
        return message(StatusCode::BAD_REQUEST, "password missing");
    };

    match state.accounts.register_user(&email, &password).await {
        Ok(user) => Json(json!({ "email": user.email, "message": "user created" })).into_response(),
        Err(err) => account_error(&err),
    }
}

#[utoipa::path(
    post,
    path= "/sessions",
    request_body(content = CredentialsForm, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 200, description = "Logged in, `session_id` cookie set"),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "accounts",
)]
pub async fn login(State(state): State<AppState>, Form(form): Form<CredentialsForm>) -> Response {
    let (Some(email), Some(password)) = (present(form.email), present(form.password)) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    if !state.accounts.valid_login(&email, &password).await {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let Some(session_id) = state.accounts.create_session(&email).await else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    (
        [(header::SET_COOKIE, session_cookie(ACCOUNT_SESSION_COOKIE, &session_id))],
        Json(json!({ "email": email, "message": "logged in" })),
    )
        .into_response()
}

#[utoipa::path(
    delete,
    path= "/sessions",
    responses (
        (status = 303, description = "Logged out, redirect to /"),
        (status = 403, description = "No valid session"),
    ),
    tag = "accounts",
)]
pub async fn logout(State(state): State<AppState>, request: Request) -> Response {
    let (parts, _) = request.into_parts();
    let Some(user) = state
        .accounts
        .get_user_from_session_id(parts.cookie(ACCOUNT_SESSION_COOKIE))
        .await
    else {
        return StatusCode::FORBIDDEN.into_response();
    };
    match state.accounts.destroy_session(&user.id).await {
        Ok(()) => Redirect::to("/").into_response(),
        Err(err) => account_error(&err),
    }
}

#[utoipa::path(
    get,
    path= "/profile",
    responses (
        (status = 200, description = "Email of the logged in user"),
        (status = 403, description = "No valid session"),
    ),
    tag = "accounts",
)]
pub async fn profile(State(state): State<AppState>, request: Request) -> Response {
    let (parts, _) = request.into_parts();
    match state
        .accounts
        .get_user_from_session_id(parts.cookie(ACCOUNT_SESSION_COOKIE))
        .await
    {
        Some(user) => Json(json!({ "email": user.email })).into_response(),
        None => StatusCode::FORBIDDEN.into_response(),
    }
}

#[utoipa::path(
    post,
    path= "/reset_password",
    request_body(content = ResetRequestForm, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 200, description = "Reset token issued"),
        (status = 403, description = "Unknown email"),
    ),
    tag = "accounts",
)]
pub async fn get_reset_password_token(
    State(state): State<AppState>,
    Form(form): Form<ResetRequestForm>,
) -> Response {
    let Some(email) = present(form.email) else {
        return StatusCode::FORBIDDEN.into_response();
    };
    match state.accounts.get_reset_password_token(&email).await {
        Ok(reset_token) => Json(json!({ "email": email, "reset_token": reset_token })).into_response(),
        Err(err) => account_error(&err),
    }
}

#[utoipa::path(
    put,
    path= "/reset_password",
    request_body(content = ResetPasswordForm, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 200, description = "Password updated"),
        (status = 403, description = "Invalid reset token"),
    ),
    tag = "accounts",
)]
pub async fn update_password(
    State(state): State<AppState>,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    let (Some(email), Some(reset_token), Some(password)) = (
        present(form.email),
        present(form.reset_token),
        present(form.new_password).map(SecretString::from),
    ) else {
        return StatusCode::FORBIDDEN.into_response();
    };
    match state.accounts.update_password(&reset_token, &password).await {
        Ok(()) => Json(json!({ "email": email, "message": "Password updated" })).into_response(),
        Err(err) => account_error(&err),
    }
}
