use sparts_types::{ErrorKind, LedgerAddress};

/// Errors from state store operations.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The backing store could not be reached.
    #[error("state store unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be decoded by its reader.
    #[error("corrupt state at {address}: {reason}")]
    Corrupt {
        address: LedgerAddress,
        reason: String,
    },

    /// A lock guarding in-memory state was poisoned by a panicking writer.
    #[error("state lock poisoned")]
    LockPoisoned,
}

impl StateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable(_) => ErrorKind::LedgerUnavailable,
            Self::Corrupt { .. } | Self::LockPoisoned => ErrorKind::Internal,
        }
    }
}

/// Result alias for state operations.
pub type StateResult<T> = Result<T, StateError>;
