//! Transport-neutral responses and the client-facing error taxonomy.

use axum::http::header::{self, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cedb_auth::DenyReason;
use cedb_store::{DocumentError, Fingerprint};

pub const OK_BODY: &[u8] = br#"{"ok":true}"#;

const ALLOW_METHODS: &str = "GET, HEAD, PUT, POST, OPTIONS";
const ALLOW_HEADERS: &str =
    "Content-Type, If-Match, Authorization, X-API-Key, X-Username, X-Password, X-Allow-Empty-Write";

/// Every way a request can be refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    NotFound,
    MethodNotAllowed,
    Unauthorized(DenyReason),
    PreconditionFailed,
    PayloadTooLarge,
    InvalidPayload(DocumentError),
    EmptyWriteDenied,
    WriteFailed,
    Internal,
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InvalidPayload(_) | Self::EmptyWriteDenied => StatusCode::BAD_REQUEST,
            Self::WriteFailed | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Reason code for the error body and the audit log.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::Unauthorized(r) => r.as_str(),
            Self::PreconditionFailed => "precondition_failed",
            Self::PayloadTooLarge => "payload_too_large",
            Self::InvalidPayload(e) => e.reason(),
            Self::EmptyWriteDenied => "empty_write_denied",
            Self::WriteFailed => "write_failed",
            Self::Internal => "internal_error",
        }
    }
}

/// A response before it is turned into HTTP.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Vec<u8>,
    pub etag: Option<Fingerprint>,
    pub json: bool,
}

impl Reply {
    /// A bodiless reply.
    pub fn empty(status: StatusCode) -> Self {
        Self { status, body: Vec::new(), etag: None, json: false }
    }

    pub fn json(status: StatusCode, body: Vec<u8>) -> Self {
        Self { status, body, etag: None, json: true }
    }

    /// `{"error":"<reason>"}`, or an empty body for a route miss.
    pub fn rejected(rejection: &Rejection) -> Self {
        if *rejection == Rejection::NotFound {
            return Self::empty(rejection.status());
        }
        let body = serde_json::json!({ "error": rejection.reason() }).to_string().into_bytes();
        Self::json(rejection.status(), body)
    }

    pub fn with_etag(mut self, fingerprint: Fingerprint) -> Self {
        self.etag = Some(fingerprint);
        self
    }

    /// Drop the body but keep headers, for `HEAD`.
    pub fn without_body(mut self) -> Self {
        self.body.clear();
        self
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        let headers = response.headers_mut();
        if self.json {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        } else {
            headers.remove(header::CONTENT_TYPE);
        }
        if let Some(etag) = self.etag {
            if let Ok(value) = HeaderValue::from_str(&etag.to_hex()) {
                headers.insert(header::ETAG, value);
            }
        }
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        headers.insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, HeaderValue::from_static("ETag"));
        headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
        response
    }
}
