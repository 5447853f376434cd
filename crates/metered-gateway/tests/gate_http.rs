//! End-to-end tests: HTTP request -> middleware -> Unix socket -> verdict.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::path::Path;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderValue, Request, StatusCode};
use axum::Router;
use serde_json::json;
use tower::ServiceExt;

use metered_gateway::{app_state::AppState, config, router};

mod common;
use common::spawn_decider;

fn app_with(socket: &Path) -> (Router, AppState) {
    let yaml = format!(
        r#"
version: 1
defaults:
  ipc_socket_path: "{}"
  servername: "edge-test"
  extract_headers: ["X-Api-Key", "X-Tenant"]
scopes:
  - path_prefix: "/api"
    enabled: true
    io_timeout_secs: 2
  - path_prefix: "/public"
    enabled: false
"#,
        socket.display()
    );
    let cfg = config::load_from_str(&yaml).unwrap();
    let state = AppState::new(cfg).unwrap();
    (router::build_router(state.clone()), state)
}

async fn body_text(resp: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn allow_reply_forwards_request() {
    let dir = tempfile::tempdir().unwrap();
    let sock = dir.path().join("decider.sock");
    let seen = spawn_decider(&sock, b'Y', 1);
    let (app, _) = app_with(&sock);

    let mut req = Request::builder()
        .uri("/api/items?page=2")
        .header("x-api-key", "k-123")
        .header("user-agent", "integration/1.0")
        .body(Body::empty())
        .unwrap();
    let peer: SocketAddr = "198.51.100.4:40000".parse().unwrap();
    req.extensions_mut().insert(ConnectInfo(peer));

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, "ok");

    let payload = seen.recv().unwrap();
    assert_eq!(
        payload,
        json!({
            "userAgent": "integration/1.0",
            "servername": "edge-test",
            "uri": "/api/items",
            "ip": "198.51.100.4",
            "headers": [{ "name": "X-Api-Key", "value": "k-123" }],
        })
    );
}

#[tokio::test]
async fn deny_reply_is_forbidden() {
    let dir = tempfile::tempdir().unwrap();
    let sock = dir.path().join("decider.sock");
    let seen = spawn_decider(&sock, b'N', 1);
    let (app, state) = app_with(&sock);

    let req = Request::builder().uri("/api/items").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let payload = seen.recv().unwrap();
    assert_eq!(payload["userAgent"], "unknown");
    assert_eq!(payload["ip"], "unknown");
    assert_eq!(payload["headers"], json!([]));

    assert_eq!(
        state.metrics().checks.get(&[("scope", "/api"), ("verdict", "FORBIDDEN")]),
        1
    );
}

#[tokio::test]
async fn missing_service_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let sock = dir.path().join("nobody.sock");
    let (app, state) = app_with(&sock);

    let req = Request::builder().uri("/api/items").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(state.metrics().channel_failures.get(&[("stage", "connect")]), 1);
}

#[tokio::test]
async fn disabled_scope_skips_service() {
    let dir = tempfile::tempdir().unwrap();
    let sock = dir.path().join("nobody.sock");
    let (app, state) = app_with(&sock);

    for uri in ["/public/logo.png", "/"] {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "uri={uri}");
    }
    assert_eq!(state.metrics().channel_failures.get(&[("stage", "connect")]), 0);
    assert_eq!(
        state.metrics().checks.get(&[("scope", "/public"), ("verdict", "ALLOW")]),
        1
    );
}

#[tokio::test]
async fn non_utf8_header_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    let sock = dir.path().join("nobody.sock");
    let (app, state) = app_with(&sock);

    let mut req = Request::builder().uri("/api/items").body(Body::empty()).unwrap();
    req.headers_mut()
        .insert("x-tenant", HeaderValue::from_bytes(&[0x61, 0xff, 0x62]).unwrap());

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    // rejected before any socket was opened
    assert_eq!(state.metrics().channel_failures.get(&[("stage", "connect")]), 0);
}

#[tokio::test]
async fn ops_endpoints_are_not_gated() {
    let dir = tempfile::tempdir().unwrap();
    let sock = dir.path().join("nobody.sock");
    let yaml = format!(
        "version: 1\ndefaults:\n  enabled: true\n  ipc_socket_path: \"{}\"\n",
        sock.display()
    );
    let state = AppState::new(config::load_from_str(&yaml).unwrap()).unwrap();
    assert!(state.cfg().defaults.enabled());
    let app = router::build_router(state);

    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/anything").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let resp = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let text = body_text(resp).await;
    assert!(text.contains(r#"metered_checks_total{scope="default",verdict="INTERNAL_ERROR"} 1"#));
    assert!(text.contains(r#"metered_channel_failures_total{stage="connect"} 1"#));
}

#[tokio::test]
async fn encoded_paths_resolve_to_the_gated_scope() {
    let dir = tempfile::tempdir().unwrap();
    let sock = dir.path().join("nobody.sock");
    let (app, state) = app_with(&sock);

    for uri in ["/public/../api/items", "/%61pi/items", "/public/%2e%2e/api/items", "/api/./items"] {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR, "uri={uri}");
    }
    assert_eq!(
        state.metrics().checks.get(&[("scope", "/api"), ("verdict", "INTERNAL_ERROR")]),
        4
    );
    assert_eq!(state.metrics().channel_failures.get(&[("stage", "connect")]), 4);
}

#[tokio::test]
async fn decision_service_sees_normalized_uri() {
    let dir = tempfile::tempdir().unwrap();
    let sock = dir.path().join("decider.sock");
    let seen = spawn_decider(&sock, b'Y', 1);
    let (app, _) = app_with(&sock);

    let req = Request::builder()
        .uri("/public/../%61pi/./items?x=1")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(seen.recv().unwrap()["uri"], "/api/items");
}

#[tokio::test]
async fn path_above_root_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let sock = dir.path().join("nobody.sock");
    let (app, state) = app_with(&sock);

    let req = Request::builder().uri("/api/../../etc").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.metrics().channel_failures.get(&[("stage", "connect")]), 0);
}
