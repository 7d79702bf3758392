use crate::error::StoreResult;
use crate::fingerprint::Fingerprint;
use crate::kind::DocumentKind;

/// Storage for the database and config documents.
///
/// All implementations must satisfy these invariants:
/// - `read` never fails. A document that was never written (or cannot be
///   read) yields [`DocumentKind::empty_default`].
/// - `write` is all-or-nothing: a concurrent reader sees either the old
///   bytes or the new bytes, never a mix.
/// - The returned fingerprint is computed over exactly the bytes persisted.
/// - The store never interprets document contents.
pub trait DocumentStore: Send + Sync {
    /// Current bytes of a document.
    fn read(&self, kind: DocumentKind) -> Vec<u8>;

    /// Replace a document's bytes and return the new fingerprint.
    fn write(&self, kind: DocumentKind, data: &[u8]) -> StoreResult<Fingerprint>;

    /// Fingerprint of the current bytes, computed fresh on every call.
    fn fingerprint(&self, kind: DocumentKind) -> Fingerprint {
        Fingerprint::of(&self.read(kind))
    }
}
