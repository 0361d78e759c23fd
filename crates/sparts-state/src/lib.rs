//! Address-keyed state storage for the Software Parts ledger.
//!
//! The transition engine only ever sees state through two operations:
//! `get(address) -> bytes?` and `set(address, bytes)`. In production those are
//! served by the external validator's state tree; this crate defines the
//! boundary and provides in-memory backends for tests and the devnet.
//!
//! # Backends
//!
//! - [`InMemoryState`] -- `BTreeMap`-based store behind a `RwLock`
//! - [`StagedState`] -- write overlay over any reader; commits all-or-nothing
//!
//! # Design Rules
//!
//! 1. An address holds at most one value; `set` overwrites.
//! 2. Values are opaque bytes; the store never interprets them.
//! 3. Reads of a missing address are `Ok(None)`, never an error.
//! 4. All backend errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod staged;
pub mod traits;

pub use error::{StateError, StateResult};
pub use memory::InMemoryState;
pub use staged::StagedState;
pub use traits::{StateEntry, StateReader, StateStore, StateWriter};
