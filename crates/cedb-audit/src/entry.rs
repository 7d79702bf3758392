use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One immutable record of a single request's outcome.
///
/// Field names on disk are the short keys existing activity consumers read:
/// `ts, ip, method, path, status, success, user, reason, size, ua, origin`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the response was produced.
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    /// Peer address of the client.
    #[serde(rename = "ip", default)]
    pub client_ip: String,
    pub method: String,
    pub path: String,
    /// HTTP status returned to the client.
    pub status: u16,
    pub success: bool,
    /// Resolved actor (`apikey`, `bearer`, `disabled`, or a username).
    #[serde(rename = "user", default)]
    pub actor: String,
    /// Rejection reason or change classification; empty when neither applies.
    #[serde(default)]
    pub reason: String,
    /// Response body size in bytes.
    #[serde(rename = "size", default)]
    pub size: u64,
    #[serde(rename = "ua", default)]
    pub user_agent: String,
    #[serde(default)]
    pub origin: String,
}

impl AuditEntry {
    /// Whether a status code counts as a successful request.
    pub fn is_success_status(status: u16) -> bool {
        (100..400).contains(&status)
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size as u64;
        self
    }
}

/// Per-request facts captured before the request is handled.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub client_ip: String,
    pub method: String,
    pub path: String,
    pub user_agent: String,
    pub origin: String,
}

impl RequestMeta {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Start an audit entry for this request with the final status.
    pub fn entry(&self, status: u16) -> AuditEntry {
        AuditEntry {
            timestamp: Utc::now(),
            client_ip: self.client_ip.clone(),
            method: self.method.clone(),
            path: self.path.clone(),
            status,
            success: AuditEntry::is_success_status(status),
            actor: String::new(),
            reason: String::new(),
            size: 0,
            user_agent: self.user_agent.clone(),
            origin: self.origin.clone(),
        }
    }
}
