use serde::{Deserialize, Serialize};
use sparts_crypto::{PublicKey, Signature};
use sparts_types::LedgerAddress;

use crate::codec::EnvelopeCodec;
use crate::error::ProtocolResult;

/// Signed description of one transaction.
///
/// Serialized with [`EnvelopeCodec`]; the signer's signature covers exactly
/// those bytes. The payload itself travels outside the header and is bound to
/// it by `payload_sha512`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHeader {
    pub family_name: String,
    pub family_version: String,
    pub inputs: Vec<LedgerAddress>,
    pub outputs: Vec<LedgerAddress>,
    /// Ids of transactions that must commit first.
    pub dependencies: Vec<String>,
    pub payload_sha512: String,
    pub signer_public_key: PublicKey,
    pub batcher_public_key: PublicKey,
    pub nonce: String,
}

/// A transaction: encoded header, its signature, and the payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub header: Vec<u8>,
    pub header_signature: Signature,
    pub payload: Vec<u8>,
}

impl Transaction {
    /// Transactions are identified by their header signature.
    pub fn id(&self) -> String {
        self.header_signature.to_hex()
    }

    pub fn decode_header(&self) -> ProtocolResult<TransactionHeader> {
        EnvelopeCodec::decode(&self.header)
    }
}

/// Signed description of one batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchHeader {
    pub signer_public_key: PublicKey,
    /// Ids of the batch's transactions, in order.
    pub transaction_ids: Vec<String>,
}

/// The atomic unit of submission: all transactions commit, or none do.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub header: Vec<u8>,
    pub header_signature: Signature,
    pub transactions: Vec<Transaction>,
}

impl Batch {
    pub fn id(&self) -> String {
        self.header_signature.to_hex()
    }

    pub fn decode_header(&self) -> ProtocolResult<BatchHeader> {
        EnvelopeCodec::decode(&self.header)
    }
}

/// Body of `POST /batches`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchList {
    pub batches: Vec<Batch>,
}

impl BatchList {
    pub fn new(batches: Vec<Batch>) -> Self {
        Self { batches }
    }

    pub fn single(batch: Batch) -> Self {
        Self {
            batches: vec![batch],
        }
    }

    pub fn batch_ids(&self) -> Vec<String> {
        self.batches.iter().map(Batch::id).collect()
    }

    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        EnvelopeCodec::encode(self)
    }

    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        EnvelopeCodec::decode(bytes)
    }
}
