#![allow(clippy::needless_for_each)]

use utoipa::OpenApi;

use super::handlers::{accounts, health, index, session_auth, users};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        index::status,
        index::stats,
        index::unauthorized,
        index::forbidden,
        users::me,
        session_auth::login,
        session_auth::logout,
        accounts::index,
        accounts::users,
        accounts::login,
        accounts::logout,
        accounts::profile,
        accounts::get_reset_password_token,
        accounts::update_password,
    ),
    components(
        schemas(
            health::Health,
            index::Stats,
            session_auth::LoginForm,
            accounts::CredentialsForm,
            accounts::ResetRequestForm,
            accounts::ResetPasswordForm,
        )
    ),
    tags(
        (name = "health", description = "Build information"),
        (name = "index", description = "Gated API status"),
        (name = "users", description = "Current principal"),
        (name = "session", description = "Session login and logout for the configured strategy"),
        (name = "accounts", description = "Registration, account sessions and password reset"),
    )
)]
pub struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
