//! Fingerprinted document storage for CoreEngineDB.
//!
//! The store holds exactly two JSON documents: the `Database` (an ordered
//! array of opaque records) and the `Config` (an object carrying the auth
//! policy and API keys). Every persisted byte sequence has a SHA-256
//! [`Fingerprint`] that doubles as the HTTP `ETag` and as the
//! optimistic-concurrency version token.
//!
//! # Storage Backends
//!
//! All backends implement the [`DocumentStore`] trait:
//!
//! - [`FileStore`] -- `json/db.json` and `json/config.json` under a data
//!   directory, replaced atomically on every write
//! - [`InMemoryStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Reads never fail: a missing document reads as its empty default.
//! 2. Writes go to a temporary sibling, are fsynced, then renamed into place.
//! 3. Fingerprints are computed over the exact bytes, never a re-encoding.
//! 4. Write I/O errors are propagated, never silently ignored.

pub mod document;
pub mod error;
pub mod file;
pub mod fingerprint;
pub mod kind;
pub mod memory;
pub mod traits;

pub use document::{ChangeKind, Document, DocumentError};
pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use fingerprint::Fingerprint;
pub use kind::DocumentKind;
pub use memory::InMemoryStore;
pub use traits::DocumentStore;
