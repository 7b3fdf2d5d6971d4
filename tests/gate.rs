#![allow(clippy::unwrap_used)]

mod common;

use axum::http::{header, StatusCode};
use base64ct::{Base64, Encoding};
use common::{cookie_pair, form, get, json, with_header, TestApp, EMAIL, PASSWORD, T};
use serde_json::json;
use turnstile::auth::AuthType;

fn basic(email: &str, password: &str) -> String {
    format!("Basic {}", Base64::encode_string(format!("{email}:{password}").as_bytes()))
}

fn login_body() -> String {
    format!("email={EMAIL}&password={PASSWORD}")
}

#[tokio::test]
async fn without_strategy_requests_pass_through() {
    let app = TestApp::new(None).await;

    let response = app.send(get("/api/v1/stats")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await, json!({ "users": 1 }));

    // Nobody is attached without a gate.
    let response = app.send(get("/api/v1/users/me")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn excluded_paths_skip_the_gate() {
    let app = TestApp::new(Some(AuthType::Auth)).await;

    let response = app.send(get("/api/v1/status")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await, json!({ "status": "OK" }));

    let response = app.send(get("/api/v1/unauthorized")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json(response).await, json!({ "error": "Unauthorized" }));

    let response = app.send(get("/api/v1/forbidden")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json(response).await, json!({ "error": "Forbidden" }));
}

#[tokio::test]
async fn null_strategy_denies_everything_else() {
    let app = TestApp::new(Some(AuthType::Auth)).await;

    let response = app.send(get("/api/v1/stats")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json(response).await, json!({ "error": "Unauthorized" }));

    let request = with_header("GET", "/api/v1/stats", header::AUTHORIZATION, &basic(EMAIL, PASSWORD));
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json(response).await, json!({ "error": "Forbidden" }));
}

#[tokio::test]
async fn basic_auth_resolves_current_user() {
    let app = TestApp::new(Some(AuthType::Basic)).await;

    let request = with_header("GET", "/api/v1/users/me", header::AUTHORIZATION, &basic(EMAIL, PASSWORD));
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["email"], EMAIL);
    assert!(body.get("hashed_password").is_none());

    let request = with_header("GET", "/api/v1/users/me", header::AUTHORIZATION, &basic(EMAIL, "nope"));
    assert_eq!(app.send(request).await.status(), StatusCode::FORBIDDEN);

    let request = with_header("GET", "/api/v1/users/me", header::AUTHORIZATION, "Bearer token");
    assert_eq!(app.send(request).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn basic_auth_has_no_session_login() {
    let app = TestApp::new(Some(AuthType::Basic)).await;
    let response = app
        .send(form("POST", "/api/v1/auth_session/login", &login_body()))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn session_login_validates_input() {
    let app = TestApp::new(Some(AuthType::Session)).await;

    let response = app
        .send(form("POST", "/api/v1/auth_session/login", "password=x"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await, json!({ "error": "email missing" }));

    let response = app
        .send(form("POST", "/api/v1/auth_session/login", &format!("email={EMAIL}&password=")))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await, json!({ "error": "password missing" }));

    let response = app
        .send(form("POST", "/api/v1/auth_session/login", "email=eve@example.com&password=x"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json(response).await, json!({ "error": "no user found for this email" }));

    let response = app
        .send(form("POST", "/api/v1/auth_session/login", &format!("email={EMAIL}&password=nope")))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json(response).await, json!({ "error": "wrong password" }));
}

#[tokio::test]
async fn session_login_me_logout() {
    let app = TestApp::new(Some(AuthType::Session)).await;

    let response = app
        .send(form("POST", "/api/v1/auth_session/login", &login_body()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = cookie_pair(&response);
    assert!(cookie.starts_with("sid="));
    assert_eq!(json(response).await["email"], EMAIL);

    let me = with_header("GET", "/api/v1/users/me", header::COOKIE, &cookie);
    let response = app.send(me).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await["email"], EMAIL);

    let logout = with_header("DELETE", "/api/v1/auth_session/logout", header::COOKIE, &cookie);
    let response = app.send(logout).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await, json!({}));

    // The cookie no longer resolves, so the gate rejects before the handler.
    let me = with_header("GET", "/api/v1/users/me", header::COOKIE, &cookie);
    assert_eq!(app.send(me).await.status(), StatusCode::FORBIDDEN);
    let logout = with_header("DELETE", "/api/v1/auth_session/logout", header::COOKIE, &cookie);
    assert_eq!(app.send(logout).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn forged_cookie_is_forbidden() {
    let app = TestApp::new(Some(AuthType::Session)).await;
    let request = with_header("GET", "/api/v1/users/me", header::COOKIE, "sid=forged");
    assert_eq!(app.send(request).await.status(), StatusCode::FORBIDDEN);

    // A different cookie name is no credential at all.
    let request = with_header("GET", "/api/v1/users/me", header::COOKIE, "other=value");
    assert_eq!(app.send(request).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn empty_credentials_are_unauthorized() {
    let app = TestApp::new(Some(AuthType::Session)).await;

    let request = with_header("GET", "/api/v1/users/me", header::COOKIE, "sid=");
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json(response).await, json!({ "error": "Unauthorized" }));

    let request = with_header("GET", "/api/v1/users/me", header::AUTHORIZATION, "");
    assert_eq!(app.send(request).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expiring_session_is_rejected_after_duration() {
    let app = TestApp::with_duration(Some(AuthType::SessionExpiry), 5).await;

    let response = app
        .send(form("POST", "/api/v1/auth_session/login", &login_body()))
        .await;
    let cookie = cookie_pair(&response);

    app.clock.set(T + 4);
    let me = with_header("GET", "/api/v1/users/me", header::COOKIE, &cookie);
    assert_eq!(app.send(me).await.status(), StatusCode::OK);

    app.clock.set(T + 6);
    let me = with_header("GET", "/api/v1/users/me", header::COOKIE, &cookie);
    assert_eq!(app.send(me).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn persistent_session_round_trip() {
    let app = TestApp::with_duration(Some(AuthType::SessionPersistent), 60).await;

    let response = app
        .send(form("POST", "/api/v1/auth_session/login", &login_body()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = cookie_pair(&response);

    let me = with_header("GET", "/api/v1/users/me", header::COOKIE, &cookie);
    assert_eq!(app.send(me).await.status(), StatusCode::OK);

    app.clock.advance(61);
    let me = with_header("GET", "/api/v1/users/me", header::COOKIE, &cookie);
    assert_eq!(app.send(me).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn request_id_is_propagated() {
    let app = TestApp::new(None).await;

    let response = app.send(get("/api/v1/status")).await;
    assert!(response.headers().contains_key("x-request-id"));

    let request = with_header("GET", "/api/v1/status", "x-request-id".parse().unwrap(), "req-1");
    let response = app.send(request).await;
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("req-1")
    );
}

#[tokio::test]
async fn health_reports_build() {
    let app = TestApp::new(Some(AuthType::Auth)).await;
    let response = app.send(get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-app"));
    let body = json(response).await;
    assert_eq!(body["name"], "turnstile");
    assert!(body["build"].is_string());
    assert!(body.get("commit").is_none());
}
