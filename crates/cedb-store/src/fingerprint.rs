use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SHA-256 digest of a document's exact bytes.
///
/// Rendered as 64 lowercase hex characters, this is both the `ETag` handed
/// to readers and the `If-Match` token expected from writers. Presented
/// tokens are compared byte-exact against the hex form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint a byte sequence.
    pub fn of(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Lowercase hex rendering (the `ETag` value).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Whether a client-presented token names this exact version.
    ///
    /// No normalization happens: quoting, case, or whitespace differences
    /// are mismatches.
    pub fn matches(&self, presented: &str) -> bool {
        presented.as_bytes() == self.to_hex().as_bytes()
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..12])
    }
}
