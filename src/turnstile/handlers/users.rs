use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use super::error_response;
use crate::turnstile::gate::CurrentUser;

#[utoipa::path(
    get,
    path= "/api/v1/users/me",
    responses (
        (status = 200, description = "The authenticated user"),
        (status = 401, description = "No credentials"),
        (status = 403, description = "Credentials did not resolve a user"),
        (status = 404, description = "Authentication is disabled"),
    ),
    tag = "users",
)]
/// The principal attached by the gate, without secrets.
pub async fn me(current_user: Option<Extension<CurrentUser>>) -> Response {
    match current_user {
        Some(Extension(CurrentUser(user))) => Json(user).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Not found"),
    }
}
