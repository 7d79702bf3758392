use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::StoreResult;
use crate::fingerprint::Fingerprint;
use crate::kind::DocumentKind;
use crate::traits::DocumentStore;

/// In-memory, HashMap-based document store.
///
/// Intended for tests and embedding. Writes swap the whole byte buffer under
/// a `RwLock`, which gives the same all-or-nothing visibility as the file
/// store's rename.
pub struct InMemoryStore {
    documents: RwLock<HashMap<DocumentKind, Vec<u8>>>,
}

impl InMemoryStore {
    /// Create a store where both documents read as their empty defaults.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store pre-seeded with document bytes.
    pub fn with_documents(documents: impl IntoIterator<Item = (DocumentKind, Vec<u8>)>) -> Self {
        Self {
            documents: RwLock::new(documents.into_iter().collect()),
        }
    }

    /// Whether a document has ever been written.
    pub fn contains(&self, kind: DocumentKind) -> bool {
        self.documents.read().expect("lock poisoned").contains_key(&kind)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for InMemoryStore {
    fn read(&self, kind: DocumentKind) -> Vec<u8> {
        let map = self.documents.read().expect("lock poisoned");
        match map.get(&kind) {
            Some(data) if !data.is_empty() => data.clone(),
            _ => kind.empty_default().to_vec(),
        }
    }

    fn write(&self, kind: DocumentKind, data: &[u8]) -> StoreResult<Fingerprint> {
        let mut map = self.documents.write().expect("lock poisoned");
        map.insert(kind, data.to_vec());
        Ok(Fingerprint::of(data))
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let map = self.documents.read().expect("lock poisoned");
        f.debug_struct("InMemoryStore")
            .field("documents", &map.len())
            .finish()
    }
}
