use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

pub const DEFAULT_PORT: u16 = 8081;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address. The IPv6 wildcard accepts IPv4 too where the OS allows.
    pub bind_addr: SocketAddr,
    /// Root holding `json/` and `logs/`.
    pub data_dir: PathBuf,
    /// Largest accepted write body, in bytes.
    pub max_body_size: usize,
    /// Most activity entries `/activity` will return.
    pub activity_limit: usize,
    /// Accept the hardcoded `admin` password for an `admin` user without a hash.
    pub legacy_admin_fallback: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), DEFAULT_PORT),
            data_dir: PathBuf::from("."),
            max_body_size: 1024 * 1024,
            activity_limit: 1000,
            legacy_admin_fallback: false,
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}
