//! Access-phase middleware.
//!
//! Runs before the content handler on every gated route:
//! - Normalize the path (percent-decoding, dot segments); 400 if it can't be
//! - Resolve the scope from the normalized path
//! - Build a read-only view over headers, path and peer address
//! - Check (blocking round trip on the blocking pool)
//! - Forward on `Allow`, otherwise answer 401 / 403 / 500 directly

use std::borrow::Cow;
use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use metered_core::error::Verdict;
use metered_core::RequestView;

use crate::app_state::AppState;

/// Client address reported when the host recorded no peer.
const UNKNOWN_PEER: &str = "unknown";

/// [`RequestView`] over an axum request.
#[derive(Debug)]
pub struct HttpRequestView<'a> {
    headers: &'a HeaderMap,
    path: &'a str,
    peer: Option<SocketAddr>,
}

impl<'a> HttpRequestView<'a> {
    pub fn new(headers: &'a HeaderMap, path: &'a str, peer: Option<SocketAddr>) -> Self {
        Self { headers, path, peer }
    }
}

impl RequestView for HttpRequestView<'_> {
    fn header(&self, name: &str) -> Option<&[u8]> {
        // HeaderMap lookups by &str are case-insensitive; invalid names miss.
        self.headers.get(name).map(|v| v.as_bytes())
    }

    fn client_addr(&self) -> Cow<'_, str> {
        match self.peer {
            Some(addr) => Cow::Owned(addr.ip().to_string()),
            None => Cow::Borrowed(UNKNOWN_PEER),
        }
    }

    fn uri(&self) -> &str {
        self.path
    }
}

pub fn status_for(verdict: Verdict) -> StatusCode {
    match verdict {
        Verdict::Allow => StatusCode::OK,
        Verdict::Forbidden => StatusCode::FORBIDDEN,
        Verdict::Unauthorized => StatusCode::UNAUTHORIZED,
        Verdict::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Percent-decode `raw`, drop empty and `.` segments and apply `..`.
///
/// `None` when the decoded path is not UTF-8, contains NUL, does not start
/// with `/`, or climbs above the root. A trailing slash is kept.
pub fn normalize_path(raw: &str) -> Option<String> {
    let decoded = urlencoding::decode(raw).ok()?;
    if !decoded.starts_with('/') || decoded.contains('\0') {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    for seg in decoded.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s => segments.push(s),
        }
    }

    let mut out = String::with_capacity(decoded.len());
    for seg in &segments {
        out.push('/');
        out.push_str(seg);
    }
    let dir = decoded.ends_with('/') || decoded.ends_with("/.") || decoded.ends_with("/..");
    if out.is_empty() || dir {
        out.push('/');
    }
    Some(out)
}

pub async fn access_gate(State(app): State<AppState>, req: Request, next: Next) -> Response {
    // Scope selection and the reported uri both use the normalized path.
    let Some(path) = normalize_path(req.uri().path()) else {
        tracing::debug!(path = %req.uri().path(), "request path does not normalize");
        return (StatusCode::BAD_REQUEST, "BAD_REQUEST").into_response();
    };
    let scope = app.scopes().resolve(&path);
    let started = Instant::now();

    let outcome = {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let view = HttpRequestView::new(req.headers(), &path, peer);
        app.gate().check_async(&view, scope.clone()).await
    };

    let verdict = outcome.verdict();
    let metrics = app.metrics();
    metrics.checks.inc(&[("scope", scope.name.as_str()), ("verdict", verdict.as_str())]);
    if let Some(stage) = outcome.error().and_then(|e| e.stage()) {
        metrics.channel_failures.inc(&[("stage", stage.as_str())]);
    }
    if scope.enabled() {
        metrics
            .check_duration
            .observe(&[("scope", scope.name.as_str())], started.elapsed());
    }

    if verdict.is_allow() {
        return next.run(req).await;
    }

    tracing::debug!(scope = %scope.name, %verdict, "request rejected");
    (status_for(verdict), verdict.as_str()).into_response()
}
