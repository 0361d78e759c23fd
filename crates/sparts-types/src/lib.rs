//! Foundation types for the Software Parts ledger.
//!
//! This crate provides the identity, addressing, chain and temporal types used
//! throughout the system. Every other sparts crate depends on `sparts-types`.
//!
//! # Key Types
//!
//! - [`EntityFamily`] -- The closed set of entity kinds recorded on the ledger
//! - [`EntityId`] -- Opaque, immutable identifier unique within a family
//! - [`LedgerAddress`] -- 70-hex-character state key derived from family + id
//! - [`BlockRef`] -- Backward link into block history (`"0"` terminates a chain)
//! - [`Timestamp`] / [`DateRange`] -- UTC record stamps and day-granular ranges
//! - [`ErrorKind`] -- Stable error taxonomy shared by every crate

pub mod address;
pub mod block;
pub mod error;
pub mod family;
pub mod id;
pub mod kind;
pub mod temporal;

pub use address::{LedgerAddress, ADDRESS_LEN, ID_HASH_LEN, PREFIX_LEN};
pub use block::BlockRef;
pub use error::TypeError;
pub use family::EntityFamily;
pub use id::EntityId;
pub use kind::ErrorKind;
pub use temporal::{DateRange, Timestamp};
