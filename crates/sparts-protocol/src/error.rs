use sparts_crypto::CryptoError;
use sparts_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("envelope too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("payload does not match the header's payload_sha512")]
    PayloadHashMismatch,

    #[error("a batch needs at least one transaction")]
    EmptyBatch,

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl ProtocolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Crypto(err) => err.kind(),
            Self::Serialization(_) => ErrorKind::Internal,
            _ => ErrorKind::InvalidPayload,
        }
    }
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
