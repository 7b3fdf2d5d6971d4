use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;
use tracing::error;
use utoipa::ToSchema;

use super::error_response;
use crate::turnstile::{gate::Denial, state::AppState};

#[derive(ToSchema, Serialize, Debug)]
pub struct Stats {
    users: u64,
}

#[utoipa::path(
    get,
    path= "/api/v1/status",
    responses (
        (status = 200, description = "API is up"),
    ),
    tag = "index",
)]
pub async fn status() -> impl IntoResponse {
    Json(json!({ "status": "OK" }))
}

#[utoipa::path(
    get,
    path= "/api/v1/stats",
    responses (
        (status = 200, description = "Number of stored users", body = Stats),
        (status = 401, description = "No credentials"),
        (status = 403, description = "Credentials did not resolve a user"),
    ),
    tag = "index",
)]
pub async fn stats(State(state): State<AppState>) -> Response {
    match state.users.count().await {
        Ok(users) => Json(Stats { users }).into_response(),
        Err(err) => {
            error!("Failed to count users: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

#[utoipa::path(
    get,
    path= "/api/v1/unauthorized",
    responses (
        (status = 401, description = "Always unauthorized"),
    ),
    tag = "index",
)]
pub async fn unauthorized() -> Denial {
    Denial::Unauthorized
}

#[utoipa::path(
    get,
    path= "/api/v1/forbidden",
    responses (
        (status = 403, description = "Always forbidden"),
    ),
    tag = "index",
)]
pub async fn forbidden() -> Denial {
    Denial::Forbidden
}
