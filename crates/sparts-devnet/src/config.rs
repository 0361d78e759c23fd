use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DevnetError, DevnetResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevnetConfig {
    pub bind_addr: SocketAddr,
    /// Largest accepted `POST /batches` body.
    pub max_batch_bytes: usize,
    /// Most blocks returned by one `GET /blocks` listing.
    pub block_page_limit: usize,
}

impl Default for DevnetConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8008)),
            max_batch_bytes: 10 * 1024 * 1024,
            block_page_limit: 100,
        }
    }
}

impl DevnetConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml(text: &str) -> DevnetResult<Self> {
        toml::from_str(text).map_err(|e| DevnetError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> DevnetResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Same settings, bound to an OS-assigned local port.
    pub fn ephemeral() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            ..Self::default()
        }
    }
}
