use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::entry::AuditEntry;
use crate::error::AuditResult;

/// Location of the activity log relative to the data root.
const LOG_RELATIVE_PATH: &str = "logs/activity.jsonl";

/// Append-only JSON-lines activity log.
///
/// On-disk format: one JSON object per line, oldest first. Appends from
/// this process are serialized by a mutex, and each line (payload plus
/// newline) goes out in a single `write_all` on an `O_APPEND` handle.
/// Readers skip lines that fail to parse (torn writes from a crash, or
/// foreign content).
pub struct AuditLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AuditLog {
    /// Open a log at an explicit path. The file is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Open the log at `logs/activity.jsonl` under a data root.
    pub fn in_data_dir(root: &Path) -> Self {
        Self::new(root.join(LOG_RELATIVE_PATH))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a single line.
    pub fn append(&self, entry: &AuditEntry) -> AuditResult<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let _guard = self.lock.lock().expect("lock poisoned");
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(&line)?;

        debug!(
            method = %entry.method,
            path = %entry.path,
            status = entry.status,
            "activity appended"
        );
        Ok(())
    }

    /// Up to `max` most recent entries, oldest first.
    ///
    /// The log is streamed line by line, so memory stays bounded by `max`
    /// and the longest line. Unparsable lines are skipped. A missing log is
    /// an empty log.
    pub fn try_tail(&self, max: usize) -> AuditResult<Vec<AuditEntry>> {
        if max == 0 {
            return Ok(Vec::new());
        }
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut window: VecDeque<AuditEntry> = VecDeque::with_capacity(max.min(1024));
        let mut skipped = 0usize;
        for line in BufReader::new(file).split(b'\n') {
            let line = line?;
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<AuditEntry>(&line) {
                Ok(entry) => {
                    if window.len() == max {
                        window.pop_front();
                    }
                    window.push_back(entry);
                }
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!(skipped, path = %self.path.display(), "skipped unparsable activity lines");
        }
        Ok(window.into())
    }

    /// Like [`try_tail`](Self::try_tail), but any failure yields an empty list.
    pub fn tail(&self, max: usize) -> Vec<AuditEntry> {
        self.try_tail(max).unwrap_or_else(|e| {
            warn!(
                error = %e,
                path = %self.path.display(),
                "activity log unreadable; returning empty tail"
            );
            Vec::new()
        })
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog").field("path", &self.path).finish()
    }
}
