//! The guarded write path.
//!
//! Each write runs through a fixed sequence and stops at the first exit:
//!
//! 1. route check (`404 not_found`)
//! 2. authorization (`401 unauthorized` / `bad_credentials`)
//! 3. `If-Match` against a freshly computed fingerprint (`412`)
//! 4. body size (`413 payload_too_large`)
//! 5. parse and shape check (`400 invalid_json` / `expected_array` / `expected_object`)
//! 6. empty-write guard, database only (`400 empty_write_denied`)
//! 7. change classification, database only
//! 8. canonical render and atomic replace (`200`, or `500 write_failed`)
//!
//! Exactly one audit entry is appended per call, whatever the exit.
//! Steps 3 through 8 hold a per-document mutex, so two writers in this
//! process can never both pass the precondition against the same version.

use std::sync::{Arc, Mutex, PoisonError};

use axum::http::StatusCode;
use cedb_audit::{AuditLog, RequestMeta};
use cedb_auth::{AuthDecision, AuthProvider, Credentials};
use cedb_store::{ChangeKind, Document, DocumentKind, DocumentStore, Fingerprint};
use tracing::{error, info, warn};

use crate::reply::{Reply, Rejection, OK_BODY};

/// Request body as handed over by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Received(Vec<u8>),
    /// The body exceeded the configured limit and was not buffered.
    Oversized,
}

/// Everything the coordinator needs from one write request.
#[derive(Clone, Debug)]
pub struct WriteRequest {
    pub path: String,
    pub credentials: Credentials,
    /// `If-Match` value, if presented.
    pub if_match: Option<String>,
    pub payload: Payload,
    /// `X-Allow-Empty-Write: true`.
    pub allow_empty: bool,
}

impl WriteRequest {
    pub fn new(path: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            credentials: Credentials::default(),
            if_match: None,
            payload: Payload::Received(body.into()),
            allow_empty: false,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_if_match(mut self, fingerprint: impl Into<String>) -> Self {
        self.if_match = Some(fingerprint.into());
        self
    }

    pub fn allowing_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }
}

/// Result of one write, before auditing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteOutcome {
    pub reply: Reply,
    pub actor: String,
    pub reason: String,
}

impl WriteOutcome {
    fn rejected(rejection: Rejection, actor: &str) -> Self {
        Self {
            reply: Reply::rejected(&rejection),
            actor: actor.to_string(),
            reason: rejection.reason().to_string(),
        }
    }

    fn committed(fingerprint: Fingerprint, actor: String, reason: String) -> Self {
        Self {
            reply: Reply::json(StatusCode::OK, OK_BODY.to_vec()).with_etag(fingerprint),
            actor,
            reason,
        }
    }
}

pub struct WriteCoordinator {
    store: Arc<dyn DocumentStore>,
    auth: Arc<dyn AuthProvider>,
    audit: Arc<AuditLog>,
    locks: [Mutex<()>; 2],
}

impl WriteCoordinator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        auth: Arc<dyn AuthProvider>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            store,
            auth,
            audit,
            locks: [Mutex::new(()), Mutex::new(())],
        }
    }

    /// Run one write to completion and audit it.
    pub fn handle(&self, meta: &RequestMeta, request: WriteRequest) -> Reply {
        let outcome = self.process(request);
        let entry = meta
            .entry(outcome.reply.status.as_u16())
            .with_actor(outcome.actor)
            .with_reason(outcome.reason)
            .with_size(outcome.reply.body.len());
        if let Err(e) = self.audit.append(&entry) {
            warn!(error = %e, "failed to append activity entry");
        }
        outcome.reply
    }

    /// Run one write to completion without auditing it.
    pub fn process(&self, request: WriteRequest) -> WriteOutcome {
        let Some(kind) = DocumentKind::from_path(&request.path) else {
            return WriteOutcome::rejected(Rejection::NotFound, "");
        };

        let actor = match self.auth.authorize(&request.credentials) {
            AuthDecision::Granted(actor) => actor.to_string(),
            AuthDecision::Denied(reason) => {
                return WriteOutcome::rejected(Rejection::Unauthorized(reason), "");
            }
        };

        let _guard = self.locks[kind.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let current = self.store.read(kind);
        if let Some(presented) = request.if_match.as_deref() {
            if !Fingerprint::of(&current).matches(presented) {
                return WriteOutcome::rejected(Rejection::PreconditionFailed, &actor);
            }
        }

        let body = match request.payload {
            Payload::Received(body) => body,
            Payload::Oversized => return WriteOutcome::rejected(Rejection::PayloadTooLarge, &actor),
        };

        let incoming = match Document::parse(kind, &body) {
            Ok(doc) => doc,
            Err(e) => return WriteOutcome::rejected(Rejection::InvalidPayload(e), &actor),
        };

        let before = Document::parse_or_empty(kind, &current).record_count();
        let reason = match (before, incoming.record_count()) {
            (Some(before), Some(after)) => {
                if after == 0 && before > 0 && !request.allow_empty {
                    return WriteOutcome::rejected(Rejection::EmptyWriteDenied, &actor);
                }
                ChangeKind::classify(before, after).to_string()
            }
            _ => String::new(),
        };

        let committed = incoming
            .to_canonical_bytes()
            .and_then(|bytes| self.store.write(kind, &bytes));
        match committed {
            Ok(fingerprint) => {
                info!(%kind, %actor, %reason, %fingerprint, "document committed");
                WriteOutcome::committed(fingerprint, actor, reason)
            }
            Err(e) => {
                error!(%kind, %actor, error = %e, "document commit failed");
                WriteOutcome::rejected(Rejection::WriteFailed, &actor)
            }
        }
    }
}

impl std::fmt::Debug for WriteCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteCoordinator").field("audit", &self.audit).finish()
    }
}
