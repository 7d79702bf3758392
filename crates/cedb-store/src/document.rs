//! Decoding, shape validation, and canonical rendering of the two documents.

use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};
use crate::kind::DocumentKind;

/// A parsed, shape-checked document.
#[derive(Clone, Debug, PartialEq)]
pub enum Document {
    Database(Vec<Value>),
    Config(Map<String, Value>),
}

/// Why a payload was refused before reaching the store.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("database document must be a JSON array")]
    ExpectedArray,

    #[error("config document must be a JSON object")]
    ExpectedObject,
}

impl DocumentError {
    /// Wire reason code reported to clients and written to the audit log.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidJson(_) => "invalid_json",
            Self::ExpectedArray => "expected_array",
            Self::ExpectedObject => "expected_object",
        }
    }
}

impl Document {
    /// Decode `bytes` as a document of the given kind.
    ///
    /// An empty payload decodes as the kind's empty default.
    pub fn parse(kind: DocumentKind, bytes: &[u8]) -> Result<Self, DocumentError> {
        let bytes = if bytes.is_empty() { kind.empty_default() } else { bytes };
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| DocumentError::InvalidJson(e.to_string()))?;
        match (kind, value) {
            (DocumentKind::Database, Value::Array(records)) => Ok(Self::Database(records)),
            (DocumentKind::Database, _) => Err(DocumentError::ExpectedArray),
            (DocumentKind::Config, Value::Object(map)) => Ok(Self::Config(map)),
            (DocumentKind::Config, _) => Err(DocumentError::ExpectedObject),
        }
    }

    /// Decode stored bytes, falling back to the empty document on any error.
    pub fn parse_or_empty(kind: DocumentKind, bytes: &[u8]) -> Self {
        Self::parse(kind, bytes).unwrap_or_else(|_| Self::empty(kind))
    }

    /// The empty document of a kind.
    pub fn empty(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Database => Self::Database(Vec::new()),
            DocumentKind::Config => Self::Config(Map::new()),
        }
    }

    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::Database(_) => DocumentKind::Database,
            Self::Config(_) => DocumentKind::Config,
        }
    }

    /// Number of records, for database documents.
    pub fn record_count(&self) -> Option<usize> {
        match self {
            Self::Database(records) => Some(records.len()),
            Self::Config(_) => None,
        }
    }

    /// Render with two-space indentation, keeping object key order.
    pub fn to_canonical_bytes(&self) -> StoreResult<Vec<u8>> {
        let rendered = match self {
            Self::Database(records) => serde_json::to_vec_pretty(records),
            Self::Config(map) => serde_json::to_vec_pretty(map),
        };
        rendered.map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

/// Label for what a database write did to the record count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// A non-empty database was replaced by an empty one.
    ClearSnapshot,
    /// Records were removed.
    Deleted(usize),
    /// Records were added.
    Created(usize),
    /// Same number of records.
    Update,
}

impl ChangeKind {
    /// Classify a write by record counts before and after.
    pub fn classify(before: usize, after: usize) -> Self {
        if before > 0 && after == 0 {
            Self::ClearSnapshot
        } else if before > after {
            Self::Deleted(before - after)
        } else if after > before {
            Self::Created(after - before)
        } else {
            Self::Update
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClearSnapshot => write!(f, "clear_snapshot"),
            Self::Deleted(n) => write!(f, "delete_count:{n}"),
            Self::Created(n) => write!(f, "create_count:{n}"),
            Self::Update => write!(f, "update"),
        }
    }
}
