//! REST surface of the validator: paths and JSON bodies.
//!
//! Binary fields (state values, transaction payloads) travel as standard
//! base64 strings inside the JSON bodies.

use serde::{Deserialize, Serialize};
use sparts_crypto::Signature;
use sparts_types::{BlockRef, ErrorKind, LedgerAddress};

use crate::envelope::TransactionHeader;

/// HTTP endpoint paths.
pub mod endpoints {
    pub const STATE: &str = "/state";
    pub const BLOCKS: &str = "/blocks";
    pub const BATCHES: &str = "/batches";
    pub const BATCH_STATUSES: &str = "/batch_statuses";

    /// `GET /state/{address}`
    pub fn state_entry(address: &str) -> String {
        format!("{STATE}/{address}")
    }

    /// `GET /blocks/{num}`
    pub fn block(num: u64) -> String {
        format!("{BLOCKS}/{num}")
    }
}

/// Content type of `POST /batches` bodies.
pub const BATCH_CONTENT_TYPE: &str = "application/octet-stream";

/// Base64 (standard alphabet, padded) serde adapter for byte fields.
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text.as_bytes()).map_err(serde::de::Error::custom)
    }
}

/// Body of `GET /state/{address}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateResponse {
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    pub head: String,
}

/// One entry of a prefix listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateItem {
    pub address: LedgerAddress,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

/// Body of `GET /state?address={prefix}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateListResponse {
    pub data: Vec<StateItem>,
    pub head: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeaderJson {
    pub block_num: BlockRef,
    pub previous_block_id: String,
    pub batch_ids: Vec<String>,
}

/// A transaction as rendered inside a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionJson {
    pub header: TransactionHeader,
    pub header_signature: Signature,
    #[serde(with = "base64_bytes")]
    pub payload: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchJson {
    pub header_signature: Signature,
    pub transactions: Vec<TransactionJson>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockJson {
    pub header: BlockHeaderJson,
    pub header_signature: String,
    pub batches: Vec<BatchJson>,
}

impl BlockJson {
    pub fn block_num(&self) -> BlockRef {
        self.header.block_num
    }

    /// All transactions in the block, in batch order.
    pub fn transactions(&self) -> impl Iterator<Item = &TransactionJson> {
        self.batches.iter().flat_map(|b| b.transactions.iter())
    }
}

/// Body of `GET /blocks/{num}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockResponse {
    pub data: BlockJson,
}

/// Body of `GET /blocks?limit=n`, newest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockListResponse {
    pub data: Vec<BlockJson>,
}

/// Body of a `202 Accepted` answer to `POST /batches`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Status URL to poll, `.../batch_statuses?id=...`.
    pub link: String,
}

/// Commit state of one batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatusKind {
    Committed,
    Invalid,
    Pending,
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidTransaction {
    pub id: String,
    pub message: String,
    /// Rejection kind, when the validator reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStatusEntry {
    pub id: String,
    pub status: BatchStatusKind,
    #[serde(default)]
    pub invalid_transactions: Vec<InvalidTransaction>,
}

/// Body of `GET /batch_statuses?id=...`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStatusResponse {
    pub data: Vec<BatchStatusEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub title: String,
    pub message: String,
}

/// Body of every non-2xx answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

impl ErrorResponse {
    pub fn new(code: u16, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code,
                title: title.into(),
                message: message.into(),
            },
        }
    }
}
