use sparts_ledger::Rejected;
use sparts_types::{EntityFamily, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    /// A ledger rule refused the request, locally or at the validator.
    #[error(transparent)]
    Rejected(Rejected),

    /// The validator could not be reached or answered with a server fault.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The validator marked the batch invalid.
    #[error("batch {batch_id} invalid: {message}")]
    Invalid {
        batch_id: String,
        kind: ErrorKind,
        message: String,
    },

    #[error("batch {batch_id} not committed after {waited_ms} ms")]
    CommitTimeout { batch_id: String, waited_ms: u128 },

    #[error("{family} {id} is unchanged by this amend")]
    Unchanged { family: EntityFamily, id: String },

    #[error("unexpected response from the validator: {0}")]
    Decode(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] sparts_protocol::ProtocolError),

    #[error("crypto error: {0}")]
    Crypto(#[from] sparts_crypto::CryptoError),

    #[error("invalid input: {0}")]
    Type(#[from] sparts_types::TypeError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SdkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Rejected(err) => err.kind(),
            Self::Unavailable(_) | Self::CommitTimeout { .. } => ErrorKind::LedgerUnavailable,
            Self::Invalid { kind, .. } => *kind,
            Self::Unchanged { .. } | Self::Type(_) => ErrorKind::InvalidPayload,
            Self::Protocol(err) => err.kind(),
            Self::Crypto(err) => err.kind(),
            Self::Decode(_) | Self::Config(_) | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Narrow to the ledger's rejection type, for `HistoryReader` callers.
    pub fn into_rejected(self) -> Rejected {
        match self {
            Self::Rejected(err) => err,
            Self::Unavailable(reason) => Rejected::LedgerUnavailable(reason),
            other => Rejected::Internal(other.to_string()),
        }
    }
}

impl From<Rejected> for SdkError {
    fn from(err: Rejected) -> Self {
        match err {
            Rejected::LedgerUnavailable(reason) => Self::Unavailable(reason),
            other => Self::Rejected(other),
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
