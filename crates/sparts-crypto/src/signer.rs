use std::fmt;
use std::str::FromStr;

use k256::ecdsa::signature::{Signer as _, Verifier as _};
use serde::{Deserialize, Serialize};
use sparts_types::EntityId;
use zeroize::{Zeroize, Zeroizing};

use crate::error::CryptoError;

/// secp256k1 private key.
///
/// The key material is zeroized on drop by the underlying implementation and
/// is only ever exported through [`PrivateKey::to_hex`], which itself returns a
/// zeroizing buffer.
#[derive(Clone)]
pub struct PrivateKey(k256::ecdsa::SigningKey);

/// Compressed (33-byte SEC1) secp256k1 public key, hex encoded on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey([u8; 33]);

/// Compact 64-byte `r || s` ECDSA signature, hex encoded on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Signature([u8; 64]);

impl PrivateKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        Self(k256::ecdsa::SigningKey::random(&mut rand::thread_rng()))
    }

    /// Parse a 64-character hex private key.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(
            hex::decode(s.trim()).map_err(|e| CryptoError::BadPrivateKey(e.to_string()))?,
        );
        if bytes.len() != 32 {
            return Err(CryptoError::BadPrivateKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        k256::ecdsa::SigningKey::from_slice(&bytes)
            .map(Self)
            .map_err(|_| CryptoError::BadPrivateKey("not a valid secp256k1 scalar".into()))
    }

    /// Hex export, for writing key files.
    pub fn to_hex(&self) -> Zeroizing<String> {
        let mut bytes: [u8; 32] = self.0.to_bytes().into();
        let hex = Zeroizing::new(hex::encode(bytes));
        bytes.zeroize();
        hex
    }

    pub fn public_key(&self) -> PublicKey {
        let sec1 = self.0.verifying_key().to_sec1_bytes();
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(&sec1[..33]);
        PublicKey(bytes)
    }

    /// Sign `message` (SHA-256 prehash, RFC 6979 nonce, low-S).
    pub fn sign(&self, message: &[u8]) -> Signature {
        let sig: k256::ecdsa::Signature = self.0.sign(message);
        let mut bytes = [0u8; 64];
        bytes.copy_from_slice(&sig.to_bytes());
        Signature(bytes)
    }
}

impl PublicKey {
    /// Parse a 66-character hex compressed public key.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim()).map_err(|e| CryptoError::BadPublicKey(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 33] = bytes
            .try_into()
            .map_err(|_| CryptoError::BadPublicKey(format!("expected 33 bytes, got {}", bytes.len())))?;
        k256::ecdsa::VerifyingKey::from_sec1_bytes(&arr)
            .map_err(|_| CryptoError::BadPublicKey("not a point on secp256k1".into()))?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify `signature` over `message`.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), CryptoError> {
        let key = k256::ecdsa::VerifyingKey::from_sec1_bytes(&self.0)
            .map_err(|_| CryptoError::BadPublicKey("not a point on secp256k1".into()))?;
        let sig = k256::ecdsa::Signature::from_slice(&signature.0)
            .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
        key.verify(message, &sig)
            .map_err(|_| CryptoError::InvalidSignature)
    }

    /// Users are identified on the ledger by their public key.
    pub fn to_entity_id(&self) -> Result<EntityId, CryptoError> {
        EntityId::new(self.to_hex()).map_err(|e| CryptoError::BadPublicKey(e.to_string()))
    }
}

impl Signature {
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim()).map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| CryptoError::MalformedSignature(format!("expected 64 bytes, got {}", b.len())))?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// A signing identity: a private key and its public counterpart.
///
/// Passed by reference into envelope builders; it is never stored as shared
/// mutable state. Cloning shares nothing mutable, and the private key is
/// read-only for the signer's lifetime.
#[derive(Clone)]
pub struct Signer {
    private_key: PrivateKey,
    public_key: PublicKey,
}

impl Signer {
    pub fn new(private_key: PrivateKey) -> Self {
        let public_key = private_key.public_key();
        Self {
            private_key,
            public_key,
        }
    }

    /// Signer with a freshly generated key.
    pub fn generate() -> Self {
        Self::new(PrivateKey::generate())
    }

    /// Load from a hex private key; fails with a bad-key error if it does not parse.
    pub fn from_private_hex(s: &str) -> Result<Self, CryptoError> {
        PrivateKey::from_hex(s).map(Self::new)
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.private_key.sign(message)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey(<redacted>)")
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for PublicKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for PublicKey {
    type Error = CryptoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<PublicKey> for String {
    fn from(value: PublicKey) -> Self {
        value.to_hex()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Signature {
    type Error = CryptoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Signature> for String {
    fn from(value: Signature) -> Self {
        value.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sign_and_verify() {
        let signer = Signer::generate();
        let sig = signer.sign(b"header bytes");
        assert!(signer.public_key().verify(b"header bytes", &sig).is_ok());
    }

    #[test]
    fn verify_fails_on_wrong_message() {
        let signer = Signer::generate();
        let sig = signer.sign(b"correct");
        assert_eq!(
            signer.public_key().verify(b"wrong", &sig),
            Err(CryptoError::InvalidSignature)
        );
    }

    #[test]
    fn verify_fails_with_other_key() {
        let a = Signer::generate();
        let b = Signer::generate();
        let sig = a.sign(b"message");
        assert!(b.public_key().verify(b"message", &sig).is_err());
    }

    #[test]
    fn signing_is_deterministic() {
        let signer = Signer::generate();
        assert_eq!(signer.sign(b"m"), signer.sign(b"m"));
    }

    #[test]
    fn private_hex_round_trip() {
        let signer = Signer::generate();
        let hex = signer.private_key().to_hex();
        assert_eq!(hex.len(), 64);
        let restored = Signer::from_private_hex(&hex).unwrap();
        assert_eq!(restored.public_key(), signer.public_key());
    }

    #[test]
    fn bad_private_keys_are_rejected() {
        let inputs = vec![
            String::new(),
            "xyz".to_string(),
            "00".to_string(),
            "0".repeat(64),
            "f".repeat(64),
        ];
        for bad in &inputs {
            let err = Signer::from_private_hex(bad).unwrap_err();
            assert_eq!(err.kind(), sparts_types::ErrorKind::BadKey, "input {bad:?}");
        }
    }

    #[test]
    fn public_key_is_compressed_hex() {
        let pk = *Signer::generate().public_key();
        let hex = pk.to_hex();
        assert_eq!(hex.len(), 66);
        assert!(hex.starts_with("02") || hex.starts_with("03"));
        assert_eq!(PublicKey::from_hex(&hex).unwrap(), pk);
        assert!(PublicKey::from_hex(&"02".repeat(10)).is_err());
    }

    #[test]
    fn serde_uses_hex_strings() {
        let signer = Signer::generate();
        let sig = signer.sign(b"x");
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json, format!("\"{}\"", sig.to_hex()));
        let parsed: Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sig);

        let pk_json = serde_json::to_string(signer.public_key()).unwrap();
        let pk: PublicKey = serde_json::from_str(&pk_json).unwrap();
        assert_eq!(&pk, signer.public_key());
    }

    #[test]
    fn debug_redacts_private_material() {
        let signer = Signer::generate();
        let debug = format!("{signer:?}");
        assert!(debug.contains("redacted"));
        assert!(!debug.contains(signer.private_key().to_hex().as_str()));
    }

    #[test]
    fn entity_id_is_public_key_hex() {
        let signer = Signer::generate();
        assert_eq!(signer.public_key().to_entity_id().unwrap().as_str(), signer.public_key().to_hex());
    }

    fn signer_from(bytes: [u8; 32]) -> Option<Signer> {
        Signer::from_private_hex(&hex::encode(bytes)).ok()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn signatures_verify_only_under_their_own_key(
            key in any::<[u8; 32]>(),
            other in any::<[u8; 32]>(),
            message in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            prop_assume!(key != other);
            let (Some(signer), Some(stranger)) = (signer_from(key), signer_from(other)) else {
                return Ok(());
            };
            let signature = signer.sign(&message);
            prop_assert!(signer.public_key().verify(&message, &signature).is_ok());
            prop_assert_eq!(
                stranger.public_key().verify(&message, &signature),
                Err(CryptoError::InvalidSignature)
            );
        }
    }
}
