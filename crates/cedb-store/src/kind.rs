use serde::{Deserialize, Serialize};

/// The two documents the store knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    /// Ordered array of opaque JSON records.
    Database,
    /// JSON object holding the auth policy and API keys.
    Config,
}

impl DocumentKind {
    /// Both kinds, in a fixed order.
    pub const ALL: [Self; 2] = [Self::Database, Self::Config];

    /// Resolve an HTTP path to a document kind.
    ///
    /// A single trailing slash is ignored, so `/json/db.json/` routes to the
    /// database just like `/json/db.json`.
    pub fn from_path(path: &str) -> Option<Self> {
        let path = if path != "/" { path.strip_suffix('/').unwrap_or(path) } else { path };
        match path {
            "/json/db.json" => Some(Self::Database),
            "/json/config.json" => Some(Self::Config),
            _ => None,
        }
    }

    /// The HTTP path this document is served at.
    pub fn route(&self) -> &'static str {
        match self {
            Self::Database => "/json/db.json",
            Self::Config => "/json/config.json",
        }
    }

    /// File name under the `json/` directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Database => "db.json",
            Self::Config => "config.json",
        }
    }

    /// Bytes served when nothing has been persisted yet.
    pub fn empty_default(&self) -> &'static [u8] {
        match self {
            Self::Database => b"[]",
            Self::Config => b"{}",
        }
    }

    /// Stable index, used for per-document lock tables.
    pub fn index(&self) -> usize {
        match self {
            Self::Database => 0,
            Self::Config => 1,
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Database => write!(f, "database"),
            Self::Config => write!(f, "config"),
        }
    }
}
