//! Single-node devnet for the Software Parts ledger.
//!
//! Serves the validator REST surface the SDK talks to (`/state`, `/blocks`,
//! `/batches`, `/batch_statuses`) over an in-memory chain that verifies,
//! replays and commits batches one at a time.

pub mod chain;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use chain::{DevnetChain, NULL_BLOCK_ID};
pub use config::DevnetConfig;
pub use error::{DevnetError, DevnetResult};
pub use handler::AppState;
pub use server::{DevnetServer, RunningDevnet};
