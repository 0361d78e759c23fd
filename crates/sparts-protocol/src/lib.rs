//! Wire protocol for the Software Parts ledger.
//!
//! Defines the signed envelopes clients submit to the validator (transaction
//! and batch headers, batch lists), their binary encoding, nonce sources, and
//! the JSON bodies of the validator's REST surface.

pub mod builder;
pub mod codec;
pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod nonce;

pub use builder::{verify_batch, verify_transaction, BatchBuilder, TransactionBuilder};
pub use codec::{EnvelopeCodec, MAX_ENVELOPE_SIZE};
pub use endpoint::{
    endpoints, BatchJson, BatchStatusEntry, BatchStatusKind, BatchStatusResponse, BlockHeaderJson,
    BlockJson, BlockListResponse, BlockResponse, ErrorBody, ErrorResponse, InvalidTransaction,
    StateItem, StateListResponse, StateResponse, SubmitResponse, TransactionJson,
    BATCH_CONTENT_TYPE,
};
pub use envelope::{Batch, BatchHeader, BatchList, Transaction, TransactionHeader};
pub use error::{ProtocolError, ProtocolResult};
pub use nonce::{MonotonicNonce, NonceSource, RandomNonce};
