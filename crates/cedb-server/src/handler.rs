use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, Query, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderName, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use cedb_audit::RequestMeta;
use cedb_auth::Credentials;
use cedb_store::{DocumentKind, Fingerprint};
use serde::de::IgnoredAny;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::coordinator::{Payload, WriteRequest};
use crate::reply::{Rejection, Reply};
use crate::state::AppState;

/// Opt-in header for replacing a populated database with an empty one.
pub const ALLOW_EMPTY_WRITE: &str = "x-allow-empty-write";

pub const ACTIVITY_ROUTE: &str = "/activity";

#[derive(Debug, Default, Deserialize)]
struct ActivityQuery {
    limit: Option<usize>,
}

/// What a request asks for, once the async part (reading the body) is done.
enum Work {
    Write(WriteRequest),
    Read { uri: Uri, head: bool },
    Preflight,
    Unsupported,
}

/// Single entry point for all requests.
pub async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let meta = request_meta(&request);
    let (parts, body) = request.into_parts();
    let work = match parts.method {
        Method::PUT | Method::POST => {
            let payload = read_payload(&parts.headers, body, state.config.max_body_size).await;
            Work::Write(write_request(&parts, payload))
        }
        Method::GET => Work::Read { uri: parts.uri, head: false },
        Method::HEAD => Work::Read { uri: parts.uri, head: true },
        Method::OPTIONS => Work::Preflight,
        _ => Work::Unsupported,
    };

    let task_state = state.clone();
    let task_meta = meta.clone();
    match tokio::task::spawn_blocking(move || respond(&task_state, &task_meta, work)).await {
        Ok(reply) => reply.into_response(),
        Err(e) => {
            error!(error = %e, method = %meta.method, path = %meta.path, "request task failed");
            let rejection = Rejection::Internal;
            let reply = Reply::rejected(&rejection);
            record(&state, &meta, &reply, rejection.reason());
            reply.into_response()
        }
    }
}

fn respond(state: &AppState, meta: &RequestMeta, work: Work) -> Reply {
    let (reply, reason) = match work {
        Work::Write(request) => return state.coordinator.handle(meta, request),
        Work::Read { uri, head } => read(state, &uri, head),
        Work::Preflight => (Reply::empty(StatusCode::NO_CONTENT), ""),
        Work::Unsupported => refuse(Rejection::MethodNotAllowed),
    };
    record(state, meta, &reply, reason);
    reply
}

fn refuse(rejection: Rejection) -> (Reply, &'static str) {
    (Reply::rejected(&rejection), rejection.reason())
}

/// Append the audit entry for a request that did not go through the write path.
fn record(state: &AppState, meta: &RequestMeta, reply: &Reply, reason: &str) {
    let entry = meta
        .entry(reply.status.as_u16())
        .with_reason(reason)
        .with_size(reply.body.len());
    if let Err(e) = state.audit.append(&entry) {
        warn!(error = %e, "failed to append activity entry");
    }
}

/// Serve a document, or the activity feed.
///
/// A config file holding bytes that are not JSON is served as `{}`. Its
/// `ETag` fingerprints the stored bytes, not the `{}` body, so it stays valid
/// as `If-Match` for the write that replaces the broken file.
fn read(state: &AppState, uri: &Uri, head: bool) -> (Reply, &'static str) {
    if !head && uri.path() == ACTIVITY_ROUTE {
        return (activity(state, uri), "");
    }
    let Some(kind) = DocumentKind::from_path(uri.path()) else {
        return refuse(Rejection::NotFound);
    };

    let stored = state.store.read(kind);
    let fingerprint = Fingerprint::of(&stored);
    let unparsable = serde_json::from_slice::<IgnoredAny>(&stored).is_err();
    let body = match kind {
        DocumentKind::Config if unparsable => {
            warn!(%fingerprint, "stored config is not valid JSON, serving {{}}");
            kind.empty_default().to_vec()
        }
        _ => stored,
    };
    debug!(%kind, %fingerprint, head, "document read");

    let reply = Reply::json(StatusCode::OK, body).with_etag(fingerprint);
    (if head { reply.without_body() } else { reply }, "")
}

fn activity(state: &AppState, uri: &Uri) -> Reply {
    let max = state.config.activity_limit.max(1);
    let limit = Query::<ActivityQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.limit)
        .map_or(max, |n| n.clamp(1, max));

    match serde_json::to_vec(&state.audit.tail(limit)) {
        Ok(body) => Reply::json(StatusCode::OK, body),
        Err(e) => {
            warn!(error = %e, "failed to render activity");
            Reply::json(StatusCode::OK, b"[]".to_vec())
        }
    }
}

/// Buffer the body up to `max` bytes.
///
/// A declared `Content-Length` over the limit is refused without reading.
async fn read_payload(headers: &HeaderMap, body: Body, max: usize) -> Payload {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|n| n > max as u64) {
        return Payload::Oversized;
    }
    match axum::body::to_bytes(body, max).await {
        Ok(bytes) => Payload::Received(bytes.to_vec()),
        Err(e) => {
            debug!(error = %e, max, "request body not accepted");
            Payload::Oversized
        }
    }
}

fn write_request(parts: &Parts, payload: Payload) -> WriteRequest {
    let headers = &parts.headers;
    WriteRequest {
        path: parts.uri.path().to_string(),
        credentials: Credentials::from_lookup(|name: &str| {
            headers.get(name).and_then(|v| v.to_str().ok())
        }),
        if_match: header_text(headers, header::IF_MATCH),
        payload,
        allow_empty: headers
            .get(ALLOW_EMPTY_WRITE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true")),
    }
}

fn request_meta(request: &Request) -> RequestMeta {
    let headers = request.headers();
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_canonical().to_string())
        .unwrap_or_default();
    RequestMeta {
        client_ip,
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        user_agent: header_text(headers, header::USER_AGENT).unwrap_or_default(),
        origin: header_text(headers, header::ORIGIN).unwrap_or_default(),
    }
}

fn header_text(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}
