use sparts_types::ErrorKind;

/// Errors from key handling and signature checks.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("private key could not be parsed: {0}")]
    BadPrivateKey(String),

    #[error("public key could not be parsed: {0}")]
    BadPublicKey(String),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("signature does not verify against the given public key")]
    InvalidSignature,

    #[error("invalid digest: {0}")]
    InvalidDigest(String),
}

impl CryptoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadPrivateKey(_) | Self::BadPublicKey(_) => ErrorKind::BadKey,
            Self::MalformedSignature(_) | Self::InvalidSignature | Self::InvalidDigest(_) => {
                ErrorKind::InvalidPayload
            }
        }
    }
}
