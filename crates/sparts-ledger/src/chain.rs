use sparts_types::BlockRef;

use crate::record::StateRecord;

/// Objects that carry a backward version link.
pub trait VersionLinked {
    /// Block this version was written in.
    fn cur_block(&self) -> BlockRef;
    /// Block of the version it replaced (`GENESIS` for the first).
    fn prev_block(&self) -> BlockRef;
}

impl VersionLinked for StateRecord {
    fn cur_block(&self) -> BlockRef {
        self.cur_block
    }

    fn prev_block(&self) -> BlockRef {
        self.prev_block
    }
}

/// Version chain integrity verifier.
///
/// Verifies that a newest-to-oldest sequence of versions forms one unbroken
/// chain: each version's `prev_block` is the next-older version's
/// `cur_block`, block refs strictly decrease, and the oldest version links to
/// the genesis terminal.
pub struct VersionChainVerifier;

impl VersionChainVerifier {
    /// Verify a complete chain, newest first.
    pub fn verify_chain(versions: &[impl VersionLinked]) -> Result<(), ChainError> {
        Self::verify_links(versions)?;
        match versions.last() {
            Some(oldest) if !oldest.prev_block().is_genesis() => Err(ChainError::MissingTerminal {
                index: versions.len() - 1,
                prev_block: oldest.prev_block(),
            }),
            _ => Ok(()),
        }
    }

    /// Verify the links of a possibly truncated chain (e.g. a date range).
    pub fn verify_links(versions: &[impl VersionLinked]) -> Result<(), ChainError> {
        for (index, version) in versions.iter().enumerate() {
            if version.cur_block().is_genesis() {
                return Err(ChainError::GenesisVersion { index });
            }
            if version.prev_block() >= version.cur_block() {
                return Err(ChainError::NotDecreasing { index });
            }
            if let Some(older) = versions.get(index + 1) {
                if version.prev_block() != older.cur_block() {
                    return Err(ChainError::BrokenLink {
                        index,
                        expected: older.cur_block(),
                        found: version.prev_block(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Errors from chain verification.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("version {index} claims to live in the genesis block")]
    GenesisVersion { index: usize },

    #[error("version {index} does not link to an older block")]
    NotDecreasing { index: usize },

    #[error("broken link at version {index}: prev_block {found}, next-older version is in block {expected}")]
    BrokenLink {
        index: usize,
        expected: BlockRef,
        found: BlockRef,
    },

    #[error("oldest version {index} links to block {prev_block} instead of the genesis terminal")]
    MissingTerminal { index: usize, prev_block: BlockRef },
}
