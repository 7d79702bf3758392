//! Append-only activity log for CoreEngineDB.
//!
//! Every HTTP request, successful or not, produces exactly one
//! [`AuditEntry`]. Entries are appended to a JSON-lines file and are never
//! rewritten. Readers only ever see a bounded tail via [`AuditLog::tail`],
//! which degrades to an empty result instead of failing.

pub mod entry;
pub mod error;
pub mod log;

pub use entry::{AuditEntry, RequestMeta};
pub use error::{AuditError, AuditResult};
pub use log::AuditLog;
