//! HTTP server: the gated `/api/v1` API, account routes and docs.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{debug_span, error, info, Span};
use ulid::Ulid;
use utoipa_swagger_ui::SwaggerUi;

pub mod gate;
pub mod handlers;
pub mod openapi;
pub mod state;

pub use gate::{CurrentUser, Denial};
pub use state::AppState;

use handlers::{accounts, health, index, session_auth, users};

/// Routes behind the request gate.
///
/// Registered with full paths and merged (not nested) so the gate sees the
/// same path the excluded-path set is written against.
fn api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/status", get(index::status))
        .route("/api/v1/stats", get(index::stats))
        .route("/api/v1/unauthorized", get(index::unauthorized))
        .route("/api/v1/forbidden", get(index::forbidden))
        .route("/api/v1/users/me", get(users::me))
        .route("/api/v1/auth_session/login", post(session_auth::login))
        .route("/api/v1/auth_session/logout", delete(session_auth::logout))
        .route_layer(middleware::from_fn_with_state(state, gate::gate))
}

/// Build the full application router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(accounts::index))
        .route("/users", post(accounts::users))
        .route("/sessions", post(accounts::login).delete(accounts::logout))
        .route("/profile", get(accounts::profile))
        .route(
            "/reset_password",
            post(accounts::get_reset_password_token).put(accounts::update_password),
        )
        .merge(api_router(state.clone()))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span)),
        )
        .route("/health", get(health::health).options(health::health))
        .with_state(state)
}

/// Serve until ctrl-c.
/// # Errors
/// Returns an error if the server fails to start
pub async fn new(port: u16, state: AppState) -> Result<()> {
    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for ctrl-c: {err}");
                std::future::pending::<()>().await;
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let method = request.method();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http.request", %method, path, request_id)
}
