use thiserror::Error;

/// Errors produced by type parsing and validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("unknown entity family: {0}")]
    UnknownFamily(String),

    #[error("entity id must not be blank")]
    BlankId,

    #[error("invalid block reference: {0}")]
    InvalidBlockRef(String),

    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("invalid date {value:?}: expected YYYYMMDD")]
    InvalidDate { value: String },

    #[error("invalid date range: start {start} is after end {end}")]
    InvertedRange { start: String, end: String },
}
