use sparts_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DevnetError {
    #[error("protocol error: {0}")]
    Protocol(#[from] sparts_protocol::ProtocolError),

    #[error("state error: {0}")]
    State(#[from] sparts_state::StateError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("chain lock poisoned")]
    LockPoisoned,

    #[error("internal error: {0}")]
    Internal(String),
}

impl DevnetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Protocol(err) => err.kind(),
            Self::State(err) => err.kind(),
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::BadRequest(_) => ErrorKind::InvalidPayload,
            Self::Io(_) => ErrorKind::LedgerUnavailable,
            Self::Config(_) | Self::LockPoisoned | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

pub type DevnetResult<T> = Result<T, DevnetError>;
