use std::fmt;

use sha2::{Digest, Sha512};

use crate::error::CryptoError;

/// SHA-512 digest, rendered as lowercase hex on the wire.
///
/// Used for the `payload_sha512` binding in transaction headers and, truncated,
/// for address derivation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha512Digest([u8; 64]);

impl Sha512Digest {
    /// Digest of `data`.
    pub fn of(data: &[u8]) -> Self {
        Self(Sha512::digest(data).into())
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Full 128-character lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First `chars` hex characters (capped at 128).
    pub fn truncated_hex(&self, chars: usize) -> String {
        let mut hex = self.to_hex();
        hex.truncate(chars);
        hex
    }

    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidDigest(e.to_string()))?;
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| CryptoError::InvalidDigest(format!("expected 64 bytes, got {}", b.len())))?;
        Ok(Self(arr))
    }

    /// Returns `true` if `data` hashes to this digest.
    pub fn matches(&self, data: &[u8]) -> bool {
        Self::of(data) == *self
    }
}

impl fmt::Debug for Sha512Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha512Digest({}...)", self.truncated_hex(16))
    }
}

impl fmt::Display for Sha512Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
