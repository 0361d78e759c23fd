//! Cryptographic primitives for the Software Parts ledger.
//!
//! Provides SHA-512 payload digests and secp256k1 ECDSA signing/verification.
//! Signing keys never leave the [`Signer`] that owns them; callers pass the
//! signer by reference into the envelope builder.
//!
//! All crypto operations wrap the `k256` and `sha2` crates.

pub mod error;
pub mod hasher;
pub mod signer;

pub use error::CryptoError;
pub use hasher::Sha512Digest;
pub use signer::{PrivateKey, PublicKey, Signature, Signer};
pub use zeroize::Zeroizing;
