//! Client SDK for the Software Parts ledger.
//!
//! [`PartsLedger`] is the main entry point for applications: create, amend
//! and relate entities, list families, and query version history.
//! [`LedgerClient`] is the HTTP layer underneath; it is the only component
//! that talks to the validator.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod keys;
pub mod ledger;
pub mod response;

pub use auth::{AuthDecision, AuthProvider, Challenge, LedgerAuthority};
pub use client::{BatchStatus, BatchStatusHandle, LedgerClient};
pub use config::ClientConfig;
pub use error::{SdkError, SdkResult};
pub use keys::{load_signer, save_signer};
pub use ledger::PartsLedger;
pub use response::{ResponseEnvelope, ResponseStatus};

// Re-export key types
pub use sparts_crypto::{PublicKey, Signer};
pub use sparts_ledger::{Patch, RelationEntry, StateRecord, UriEntry, ValidationReport};
pub use sparts_types::{BlockRef, DateRange, EntityFamily, EntityId, ErrorKind, LedgerAddress};
