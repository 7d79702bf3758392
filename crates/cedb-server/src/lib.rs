//! HTTP server for CoreEngineDB.
//!
//! Serves the database and config documents over a small fixed route set,
//! guards writes with authentication and `If-Match` preconditions, and
//! records every request in the activity log.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod handler;
pub mod reply;
pub mod router;
pub mod server;
pub mod state;

pub use config::{ServerConfig, DEFAULT_PORT};
pub use coordinator::{Payload, WriteCoordinator, WriteOutcome, WriteRequest};
pub use error::{ServerError, ServerResult};
pub use reply::{Rejection, Reply};
pub use server::DocServer;
pub use state::AppState;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{HeaderMap, Request, StatusCode};
    use base64::Engine;
    use cedb_audit::AuditEntry;
    use cedb_store::{DocumentKind, Fingerprint};
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    struct TestApp {
        _dir: tempfile::TempDir,
        state: AppState,
        router: axum::Router,
    }

    struct Answer {
        status: StatusCode,
        headers: HeaderMap,
        body: Vec<u8>,
    }

    impl Answer {
        fn etag(&self) -> String {
            self.headers["etag"].to_str().unwrap().to_string()
        }

        fn json(&self) -> Value {
            serde_json::from_slice(&self.body).unwrap()
        }
    }

    fn app_with(config: impl FnOnce(&mut ServerConfig), auth_config: Value) -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = ServerConfig { data_dir: dir.path().to_path_buf(), ..Default::default() };
        config(&mut cfg);
        let state = AppState::from_config(&cfg);
        state
            .store
            .write(DocumentKind::Config, auth_config.to_string().as_bytes())
            .unwrap();
        let router = router::build_router(state.clone());
        TestApp { _dir: dir, state, router }
    }

    fn open_app() -> TestApp {
        app_with(|_| {}, json!({"auth": {"enabled": false}}))
    }

    impl TestApp {
        async fn send(&self, request: Request<Body>) -> Answer {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let headers = response.headers().clone();
            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap()
                .to_vec();
            Answer { status, headers, body }
        }

        async fn get(&self, uri: &str) -> Answer {
            self.send(Request::get(uri).body(Body::empty()).unwrap()).await
        }

        async fn put(&self, uri: &str, body: &str, headers: &[(&str, &str)]) -> Answer {
            let mut builder = Request::put(uri);
            for (name, value) in headers {
                builder = builder.header(*name, *value);
            }
            self.send(builder.body(Body::from(body.to_string())).unwrap()).await
        }

        fn activity(&self) -> Vec<AuditEntry> {
            self.state.audit.tail(1000)
        }
    }

    #[tokio::test]
    async fn fresh_database_reads_as_empty_array() {
        let app = open_app();
        let r = app.get("/json/db.json").await;
        assert_eq!(r.status, StatusCode::OK);
        assert_eq!(r.body, b"[]");
        assert_eq!(r.etag(), Fingerprint::of(b"[]").to_hex());
        assert_eq!(r.headers["content-type"], "application/json");
        assert_eq!(r.headers["access-control-expose-headers"], "ETag");
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let app = open_app();
        let e0 = app.get("/json/db.json").await.etag();

        let w = app
            .put("/json/db.json", r#"[{"id":"a","qty":3}]"#, &[("If-Match", e0.as_str())])
            .await;
        assert_eq!(w.status, StatusCode::OK);
        assert_eq!(w.json(), json!({"ok": true}));
        let e1 = w.etag();
        assert_ne!(e0, e1);

        let r = app.get("/json/db.json").await;
        assert_eq!(r.etag(), e1);
        assert_eq!(r.json(), json!([{"id": "a", "qty": 3}]));
        assert_eq!(Fingerprint::of(&r.body).to_hex(), e1);
    }

    #[tokio::test]
    async fn stale_if_match_is_refused() {
        let app = open_app();
        let e0 = app.get("/json/db.json").await.etag();
        app.put("/json/db.json", "[1]", &[("If-Match", e0.as_str())]).await;
        let before = app.get("/json/db.json").await;

        let stale = app.put("/json/db.json", "[2]", &[("If-Match", e0.as_str())]).await;
        assert_eq!(stale.status, StatusCode::PRECONDITION_FAILED);
        assert_eq!(stale.json(), json!({"error": "precondition_failed"}));

        let after = app.get("/json/db.json").await;
        assert_eq!(after.body, before.body);
        assert_eq!(after.etag(), before.etag());
    }

    #[tokio::test]
    async fn post_is_a_write() {
        let app = open_app();
        let req = Request::post("/json/config.json").body(Body::from(r#"{"k":1}"#)).unwrap();
        assert_eq!(app.send(req).await.status, StatusCode::OK);
        assert_eq!(app.get("/json/config.json").await.json(), json!({"k": 1}));
    }

    #[tokio::test]
    async fn empty_write_needs_override_header() {
        let app = open_app();
        app.put("/json/db.json", "[1,2,3]", &[]).await;

        let denied = app.put("/json/db.json", "[]", &[]).await;
        assert_eq!(denied.status, StatusCode::BAD_REQUEST);
        assert_eq!(denied.json(), json!({"error": "empty_write_denied"}));
        assert_eq!(app.get("/json/db.json").await.json(), json!([1, 2, 3]));

        let allowed = app.put("/json/db.json", "[]", &[("X-Allow-Empty-Write", "TRUE")]).await;
        assert_eq!(allowed.status, StatusCode::OK);
        assert_eq!(app.activity().last().unwrap().reason, "clear_snapshot");
    }

    #[tokio::test]
    async fn shape_validation() {
        let app = open_app();
        let cases = [
            ("/json/db.json", r#"{"a":1}"#, "expected_array"),
            ("/json/config.json", "[1]", "expected_object"),
            ("/json/db.json", "[1,", "invalid_json"),
        ];
        for (uri, body, reason) in cases {
            let r = app.put(uri, body, &[]).await;
            assert_eq!(r.status, StatusCode::BAD_REQUEST, "{uri} {body}");
            assert_eq!(r.json(), json!({ "error": reason }));
        }
    }

    fn secured_config() -> Value {
        let alice = cedb_auth::hash_password("alice", "wonderland", 1000);
        json!({
            "auth": {"enabled": true, "users": [alice]},
            "apiKeys": ["k-123"]
        })
    }

    fn basic(user: &str, password: &str) -> String {
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{user}:{password}"));
        format!("Basic {encoded}")
    }

    #[tokio::test]
    async fn auth_matrix() {
        let app = app_with(|_| {}, secured_config());
        let alice = basic("alice", "wonderland");
        let wrong = basic("alice", "nope");
        let stranger = basic("mallory", "x");

        let cases: [(&[(&str, &str)], StatusCode, &str); 6] = [
            (&[], StatusCode::UNAUTHORIZED, "unauthorized"),
            (&[("X-API-Key", "k-123")], StatusCode::OK, "apikey"),
            (&[("Authorization", "Bearer k-123")], StatusCode::OK, "bearer"),
            (&[("Authorization", alice.as_str())], StatusCode::OK, "alice"),
            (&[("Authorization", wrong.as_str())], StatusCode::UNAUTHORIZED, "bad_credentials"),
            (&[("Authorization", stranger.as_str())], StatusCode::UNAUTHORIZED, "bad_credentials"),
        ];
        for (i, (headers, status, label)) in cases.into_iter().enumerate() {
            let r = app.put("/json/db.json", &format!("[{i}]"), headers).await;
            assert_eq!(r.status, status, "{label}");
            let entry = app.activity().pop().unwrap();
            if status == StatusCode::OK {
                assert_eq!(entry.actor, label);
            } else {
                assert_eq!(r.json(), json!({ "error": label }));
                assert_eq!(entry.reason, label);
            }
        }
    }

    #[tokio::test]
    async fn username_password_headers() {
        let app = app_with(|_| {}, secured_config());
        let r = app
            .put("/json/db.json", "[1]", &[("X-Username", "alice"), ("X-Password", "wonderland")])
            .await;
        assert_eq!(r.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn reads_need_no_credentials() {
        let app = app_with(|_| {}, secured_config());
        assert_eq!(app.get("/json/db.json").await.status, StatusCode::OK);
        assert_eq!(app.get("/json/config.json").await.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn unparsable_config_is_served_as_empty_object() {
        let app = open_app();
        app.state.store.write(DocumentKind::Config, b"{not json").unwrap();
        let r = app.get("/json/config.json").await;
        assert_eq!(r.body, b"{}");
        assert_eq!(r.etag(), Fingerprint::of(b"{not json").to_hex());
    }

    #[tokio::test]
    async fn broken_config_can_be_replaced_with_its_etag() {
        use cedb_store::DocumentStore;

        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(cedb_store::InMemoryStore::new());
        store.write(DocumentKind::Config, b"{not json").unwrap();
        let state = AppState::with_parts(
            ServerConfig::default(),
            store,
            std::sync::Arc::new(cedb_auth::AllowAllAuth),
            std::sync::Arc::new(cedb_audit::AuditLog::in_data_dir(dir.path())),
        );
        let app = TestApp { _dir: dir, router: router::build_router(state.clone()), state };

        let etag = app.get("/json/config.json").await.etag();
        let body = r#"{"auth":{"enabled":false}}"#;
        let w = app.put("/json/config.json", body, &[("If-Match", etag.as_str())]).await;
        assert_eq!(w.status, StatusCode::OK);
        assert_eq!(app.get("/json/config.json").await.json()["auth"]["enabled"], false);
    }

    #[tokio::test]
    async fn valid_non_object_config_is_served_as_stored() {
        let app = open_app();
        app.state.store.write(DocumentKind::Config, b"[1,2]").unwrap();
        let r = app.get("/json/config.json").await;
        assert_eq!(r.body, b"[1,2]");
        assert_eq!(r.etag(), Fingerprint::of(b"[1,2]").to_hex());
    }

    #[tokio::test]
    async fn head_returns_etag_without_body() {
        let app = open_app();
        app.put("/json/db.json", "[1]", &[]).await;
        let get = app.get("/json/db.json").await;
        let head = app.send(Request::head("/json/db.json").body(Body::empty()).unwrap()).await;
        assert_eq!(head.status, StatusCode::OK);
        assert!(head.body.is_empty());
        assert_eq!(head.etag(), get.etag());
    }

    #[tokio::test]
    async fn preflight() {
        let app = open_app();
        let r = app
            .send(Request::options("/anything").body(Body::empty()).unwrap())
            .await;
        assert_eq!(r.status, StatusCode::NO_CONTENT);
        assert_eq!(r.headers["access-control-allow-origin"], "*");
        assert_eq!(r.headers["access-control-allow-methods"], "GET, HEAD, PUT, POST, OPTIONS");
        assert_eq!(app.activity().pop().unwrap().method, "OPTIONS");
    }

    #[tokio::test]
    async fn unknown_route_and_method() {
        let app = open_app();
        let nf = app.get("/json/other.json").await;
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert!(nf.body.is_empty());

        let put_nf = app.put("/elsewhere", "[]", &[]).await;
        assert_eq!(put_nf.status, StatusCode::NOT_FOUND);

        let del = app
            .send(Request::delete("/json/db.json").body(Body::empty()).unwrap())
            .await;
        assert_eq!(del.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(del.json(), json!({"error": "method_not_allowed"}));
    }

    #[tokio::test]
    async fn trailing_slash_is_the_same_route() {
        let app = open_app();
        assert_eq!(app.get("/json/db.json/").await.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn oversized_body() {
        let app = app_with(|c| c.max_body_size = 16, json!({"auth": {"enabled": false}}));
        let big = format!("[{}]", vec!["1"; 20].join(","));
        let r = app.put("/json/db.json", &big, &[]).await;
        assert_eq!(r.status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(r.json(), json!({"error": "payload_too_large"}));
        assert_eq!(app.get("/json/db.json").await.body, b"[]");
    }

    #[tokio::test]
    async fn declared_length_over_limit_is_refused_unread() {
        let app = app_with(|c| c.max_body_size = 4, json!({"auth": {"enabled": false}}));
        let r = app.put("/json/db.json", "[1]", &[("Content-Length", "4096")]).await;
        assert_eq!(r.status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(app.activity().pop().unwrap().reason, "payload_too_large");
    }

    #[tokio::test]
    async fn every_request_is_audited_with_its_status() {
        let app = open_app();
        let mut statuses = vec![
            app.get("/json/db.json").await.status,
            app.put("/json/db.json", "[1]", &[]).await.status,
            app.put("/json/db.json", "nope", &[]).await.status,
            app.get("/missing").await.status,
            app.send(Request::options("/").body(Body::empty()).unwrap()).await.status,
            app.send(Request::patch("/json/db.json").body(Body::empty()).unwrap()).await.status,
        ];
        statuses.push(app.get("/activity").await.status);

        let logged: Vec<u16> = app.activity().iter().map(|e| e.status).collect();
        let expected: Vec<u16> = statuses.iter().map(|s| s.as_u16()).collect();
        assert_eq!(logged, expected);
        assert!(app.activity().iter().all(|e| e.success == (e.status < 400)));
    }

    #[tokio::test]
    async fn activity_feed_is_newest_last_and_limited() {
        let app = open_app();
        for i in 0..5 {
            app.put("/json/db.json", &format!("[{i}]"), &[]).await;
        }
        let r = app.get("/activity?limit=2").await;
        assert_eq!(r.status, StatusCode::OK);
        let entries: Vec<AuditEntry> = serde_json::from_slice(&r.body).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.method == "PUT"));
        assert!(entries[0].timestamp <= entries[1].timestamp);

        let raw = app.get("/activity?limit=0").await.json();
        assert_eq!(raw.as_array().unwrap().len(), 1);
        assert!(raw[0].get("ts").is_some());
        assert!(raw[0].get("user").is_some());
    }

    #[tokio::test]
    async fn activity_limit_is_capped_by_config() {
        let app = app_with(|c| c.activity_limit = 3, json!({"auth": {"enabled": false}}));
        for _ in 0..6 {
            app.get("/json/db.json").await;
        }
        let all = app.get("/activity?limit=999").await.json();
        assert_eq!(all.as_array().unwrap().len(), 3);
        let default = app.get("/activity").await.json();
        assert_eq!(default.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn user_agent_and_origin_are_recorded() {
        let app = open_app();
        let req = Request::get("/json/db.json")
            .header("User-Agent", "monitor/1.0")
            .header("Origin", "https://ops.example")
            .body(Body::empty())
            .unwrap();
        app.send(req).await;
        let entry = app.activity().pop().unwrap();
        assert_eq!(entry.user_agent, "monitor/1.0");
        assert_eq!(entry.origin, "https://ops.example");
        assert_eq!(entry.path, "/json/db.json");
    }
}
