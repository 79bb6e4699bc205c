//! In-process scenario tests for mensa-daemon HTTP endpoints that need no
//! database: health, auth rejection, and parameter validation.
//!
//! These tests spin up the Axum router **without** binding a TCP socket.
//! Each test calls `routes::build_router` and drives it via
//! `tower::ServiceExt::oneshot`, no network I/O required. The pool is
//! created lazily and never connects.

use std::{collections::HashMap, sync::Arc};

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use mensa_daemon::{
    auth::{IdentityVerifier, VerifiedIdentity},
    routes,
    state::AppState,
};
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a fresh in-process router backed by a lazy (never-connecting) pool
/// and a static identity fixture.
fn make_router() -> axum::Router {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect_lazy("postgres://unused@127.0.0.1:1/unused")
        .expect("lazy pool");

    let mut identities = HashMap::new();
    identities.insert(
        "tok-alice".to_string(),
        VerifiedIdentity {
            sub: "alice".to_string(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
        },
    );

    let st = Arc::new(AppState::new(pool, IdentityVerifier::Static(identities)));
    routes::build_router(st)
}

/// Drive the router with a single request and return (status, body_bytes).
async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_ok_true() {
    let router = make_router();
    let req = Request::builder()
        .method("GET")
        .uri("/v1/health")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, body) = call(router, req).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "mensa-daemon");
}

// ---------------------------------------------------------------------------
// Auth rejection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn api_without_token_returns_401() {
    let router = make_router();
    let req = Request::builder()
        .method("GET")
        .uri("/api/user")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, body) = call(router, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let json = parse_json(body);
    assert!(
        json["message"]
            .as_str()
            .unwrap_or("")
            .contains("login or register"),
        "401 body should tell the caller to login: {json}"
    );
}

#[tokio::test]
async fn api_with_unknown_token_returns_401() {
    let router = make_router();
    let req = Request::builder()
        .method("GET")
        .uri("/api/user")
        .header("Authorization", "Bearer tok-nobody")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, _) = call(router, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Parameter validation (runs before any DB access)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_order_id_list_returns_400() {
    let router = make_router();
    let req = Request::builder()
        .method("GET")
        .uri("/api/orders/not-a-number")
        .header("Authorization", "Bearer tok-alice")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, body) = call(router, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let json = parse_json(body);
    assert!(
        json["message"]
            .as_str()
            .unwrap_or("")
            .contains("orderId"),
        "400 body should name the offending parameter: {json}"
    );
}

#[tokio::test]
async fn invalid_vendor_id_list_returns_400() {
    let router = make_router();
    let req = Request::builder()
        .method("GET")
        .uri("/api/vendor/1,two,3")
        .header("Authorization", "Bearer tok-alice")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, _) = call(router, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Unknown routes return 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let router = make_router();
    let req = Request::builder()
        .method("GET")
        .uri("/v1/does_not_exist")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, _) = call(router, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
