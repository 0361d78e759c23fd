use sparts_state::StateError;
use sparts_types::{BlockRef, EntityFamily, ErrorKind, LedgerAddress};

/// Structured rejection of a transition or history query.
///
/// Rejections raised by the transition engine depend only on the prior record,
/// the action and the target lookups, so every replica reaches the same one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejected {
    #[error("{family} {id} already exists")]
    AlreadyExists { family: EntityFamily, id: String },

    #[error("{family} {id} does not exist")]
    NotFound { family: EntityFamily, id: String },

    #[error("required field `{field}` is missing or blank")]
    MissingField { field: String },

    #[error("{target} is already present in {relation}")]
    Duplicate { relation: String, target: String },

    #[error("{target} is not present in {relation}")]
    NotPresent { relation: String, target: String },

    #[error("{relation} is empty")]
    EmptyRelation { relation: String },

    #[error("referenced {family} {id} does not exist")]
    DanglingReference { family: EntityFamily, id: String },

    #[error("corrupt version chain at {address} (block {block}): {reason}")]
    CorruptChain {
        address: LedgerAddress,
        block: BlockRef,
        reason: String,
    },

    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("{family} does not support action `{action}`")]
    UnsupportedAction { family: EntityFamily, action: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl Rejected {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::MissingField { .. } => ErrorKind::MissingField,
            Self::Duplicate { .. } => ErrorKind::Duplicate,
            Self::NotPresent { .. } => ErrorKind::NotPresent,
            Self::EmptyRelation { .. } => ErrorKind::EmptyRelation,
            Self::DanglingReference { .. } => ErrorKind::DanglingReference,
            Self::CorruptChain { .. } => ErrorKind::CorruptChain,
            Self::LedgerUnavailable(_) => ErrorKind::LedgerUnavailable,
            Self::InvalidPayload(_) => ErrorKind::InvalidPayload,
            Self::UnsupportedAction { .. } => ErrorKind::UnsupportedAction,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn corrupt(address: &LedgerAddress, block: BlockRef, reason: impl Into<String>) -> Self {
        Self::CorruptChain {
            address: address.clone(),
            block,
            reason: reason.into(),
        }
    }
}

impl From<StateError> for Rejected {
    fn from(err: StateError) -> Self {
        match err {
            StateError::Unavailable(msg) => Self::LedgerUnavailable(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, Rejected>;
