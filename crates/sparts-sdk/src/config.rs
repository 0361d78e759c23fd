use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Connection and polling settings for [`LedgerClient`](crate::LedgerClient).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root of the validator REST API, without a trailing slash.
    pub base_url: String,
    /// Bound on every HTTP request; expiry surfaces as `LedgerUnavailable`.
    #[serde(rename = "request_timeout_secs", with = "secs")]
    pub request_timeout: Duration,
    pub max_history_depth: usize,
    pub user_agent: String,
    #[serde(rename = "commit_poll_interval_ms", with = "millis")]
    pub commit_poll_interval: Duration,
    #[serde(rename = "commit_timeout_secs", with = "secs")]
    pub commit_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8008".into(),
            request_timeout: Duration::from_secs(10),
            max_history_depth: sparts_ledger::DEFAULT_MAX_DEPTH,
            user_agent: concat!("sparts-sdk/", env!("CARGO_PKG_VERSION")).into(),
            commit_poll_interval: Duration::from_millis(200),
            commit_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml(text: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SdkError::Config(e.to_string()))?;
        let base_url = config.base_url.clone();
        Ok(config.with_base_url(base_url))
    }

    pub fn load(path: &Path) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
