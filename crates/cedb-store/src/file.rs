use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::fingerprint::Fingerprint;
use crate::kind::DocumentKind;
use crate::traits::DocumentStore;

/// Directory under the data root that holds both documents.
const JSON_DIR: &str = "json";

/// Filesystem-backed document store.
///
/// Layout under the data root:
/// ```text
/// json/db.json
/// json/config.json
/// ```
///
/// Writes use the write-then-rename pattern:
/// 1. Write to a uniquely named temporary file next to the target
/// 2. Sync the temporary file to disk
/// 3. Rename it over the target
/// 4. Sync the parent directory so the rename itself is durable
#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `root`. Nothing is created until the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Canonical location of a document.
    pub fn path_of(&self, kind: DocumentKind) -> PathBuf {
        self.root.join(JSON_DIR).join(kind.file_name())
    }

    fn try_read(&self, kind: DocumentKind) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path_of(kind)) {
            Ok(data) if data.is_empty() => Ok(None),
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[cfg(unix)]
    fn sync_directory(dir: &Path) -> io::Result<()> {
        File::open(dir)?.sync_all()
    }

    #[cfg(not(unix))]
    fn sync_directory(_dir: &Path) -> io::Result<()> {
        Ok(())
    }
}

impl DocumentStore for FileStore {
    fn read(&self, kind: DocumentKind) -> Vec<u8> {
        match self.try_read(kind) {
            Ok(Some(data)) => data,
            Ok(None) => kind.empty_default().to_vec(),
            Err(e) => {
                warn!(%kind, error = %e, "document unreadable; serving empty default");
                kind.empty_default().to_vec()
            }
        }
    }

    fn write(&self, kind: DocumentKind, data: &[u8]) -> StoreResult<Fingerprint> {
        let path = self.path_of(kind);
        let parent = path.parent().ok_or_else(|| StoreError::NoParentDir {
            kind,
            path: path.display().to_string(),
        })?;
        fs::create_dir_all(parent)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}.", kind.file_name()))
            .suffix(".tmp")
            .tempfile_in(parent)?;
        tmp.write_all(data)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        Self::sync_directory(parent)?;

        let fingerprint = Fingerprint::of(data);
        debug!(%kind, len = data.len(), %fingerprint, "document replaced");
        Ok(fingerprint)
    }
}
