use crate::kind::DocumentKind;

/// Errors from document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The canonical location has no parent directory to stage a write in.
    #[error("no parent directory for {kind} document at {path}")]
    NoParentDir { kind: DocumentKind, path: String },

    /// Serialization failure while rendering a document.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
