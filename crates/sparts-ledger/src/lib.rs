//! Entity model and transition engine for the Software Parts ledger.
//!
//! This crate is the heart of the ledger. It provides:
//! - Per-family schemas (fields, relation lists, allowed actions)
//! - `StateRecord`, the versioned value stored at an entity's address
//! - `Action` and the canonical `TransactionPayload`
//! - `TransitionEngine`, one deterministic engine for all six families
//! - `TransactionProcessor`, the read-apply-write step validators replay
//! - Version-chain verification, history walking and history validation

pub mod action;
pub mod chain;
pub mod engine;
pub mod error;
pub mod history;
pub mod payload;
pub mod processor;
pub mod record;
pub mod schema;
pub mod validation;

pub use action::{Action, Patch};
pub use chain::{ChainError, VersionChainVerifier, VersionLinked};
pub use engine::{KnownTargets, TargetLookup, TransitionContext, TransitionEngine};
pub use error::{LedgerResult, Rejected};
pub use history::{HistoryReader, HistoryWalker, InMemoryHistory, DEFAULT_MAX_DEPTH};
pub use payload::TransactionPayload;
pub use processor::{TransactionProcessor, TransactionRequest};
pub use record::{RelationEntry, StateRecord, UriEntry};
pub use schema::{FamilySchema, RelationOp, RelationSpec, RelationTarget, AMEND_ACTION};
pub use validation::{HistoryValidator, ValidationReport, Violation, ViolationKind};
