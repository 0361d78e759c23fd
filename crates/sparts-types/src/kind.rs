use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable error taxonomy surfaced to callers.
///
/// Every error type in the workspace maps onto exactly one kind. Kinds raised
/// by the transition engine are deterministic across replicas;
/// [`ErrorKind::LedgerUnavailable`] is a client-side fault and is never
/// produced by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    AlreadyExists,
    NotFound,
    MissingField,
    Duplicate,
    NotPresent,
    EmptyRelation,
    DanglingReference,
    CorruptChain,
    BadKey,
    LedgerUnavailable,
    InvalidPayload,
    UnsupportedAction,
    Internal,
}

impl ErrorKind {
    /// Returns `true` for rejections decided by the ledger's transition rules,
    /// as opposed to transport or local faults.
    pub fn is_ledger_rejection(&self) -> bool {
        matches!(
            self,
            Self::AlreadyExists
                | Self::NotFound
                | Self::MissingField
                | Self::Duplicate
                | Self::NotPresent
                | Self::EmptyRelation
                | Self::DanglingReference
                | Self::InvalidPayload
                | Self::UnsupportedAction
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyExists => "AlreadyExists",
            Self::NotFound => "NotFound",
            Self::MissingField => "MissingField",
            Self::Duplicate => "Duplicate",
            Self::NotPresent => "NotPresent",
            Self::EmptyRelation => "EmptyRelation",
            Self::DanglingReference => "DanglingReference",
            Self::CorruptChain => "CorruptChain",
            Self::BadKey => "BadKey",
            Self::LedgerUnavailable => "LedgerUnavailable",
            Self::InvalidPayload => "InvalidPayload",
            Self::UnsupportedAction => "UnsupportedAction",
            Self::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
