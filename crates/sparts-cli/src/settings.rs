//! CLI settings file.
//!
//! ```toml
//! key_file = "/home/me/.sparts/keys/default.priv"
//!
//! [client]
//! base_url = "http://validator:8008"
//! request_timeout_secs = 10
//!
//! [devnet]
//! bind_addr = "0.0.0.0:8008"
//! ```
//!
//! Command-line flags override whatever the file says.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sparts_devnet::DevnetConfig;
use sparts_sdk::ClientConfig;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub key_file: Option<PathBuf>,
    pub client: ClientConfig,
    pub devnet: DevnetConfig,
}

impl Settings {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let mut settings: Self = toml::from_str(text).context("invalid settings file")?;
        let base_url = settings.client.base_url.clone();
        settings.client = settings.client.with_base_url(base_url);
        Ok(settings)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read settings from {}", path.display()))?;
        Self::from_toml(&text)
    }

    /// Settings from `path` if given, else defaults, with flag overrides applied.
    pub fn resolve(path: Option<&Path>, url: Option<&str>, key_file: Option<&Path>) -> anyhow::Result<Self> {
        let mut settings = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(url) = url {
            settings.client = settings.client.with_base_url(url);
        }
        if let Some(key_file) = key_file {
            settings.key_file = Some(key_file.to_path_buf());
        }
        Ok(settings)
    }

    /// Configured key file, falling back to `$HOME/.sparts/keys/default.priv`.
    pub fn key_path(&self) -> anyhow::Result<PathBuf> {
        if let Some(path) = &self.key_file {
            return Ok(path.clone());
        }
        let home = std::env::var_os("HOME").context("no --key-file given and HOME is not set")?;
        Ok(PathBuf::from(home).join(".sparts").join("keys").join("default.priv"))
    }
}
