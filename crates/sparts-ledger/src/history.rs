//! Version-chain history queries.
//!
//! An address holds only the newest version of an entity. Older versions are
//! recovered by following `prev_block` back through the chain, one block
//! lookup per step, until the genesis terminal.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use sparts_types::{BlockRef, DateRange, EntityFamily, EntityId, LedgerAddress};

use crate::chain::VersionChainVerifier;
use crate::error::{LedgerResult, Rejected};
use crate::record::StateRecord;

/// Default bound on versions visited in one walk.
pub const DEFAULT_MAX_DEPTH: usize = 10_000;

/// Source of current and past versions.
///
/// The HTTP client implements this by scraping validator blocks; any other
/// index that can answer the same two questions may stand in for it.
#[async_trait]
pub trait HistoryReader: Send + Sync {
    /// Bytes currently stored at `address`.
    async fn current(&self, address: &LedgerAddress) -> LedgerResult<Option<Vec<u8>>>;

    /// Payload of the transaction that wrote the version of `address` whose
    /// `cur_block` is `block`, or `None` if no such transaction is found.
    async fn payload_at(&self, address: &LedgerAddress, block: BlockRef) -> LedgerResult<Option<Vec<u8>>>;
}

enum Step {
    Keep,
    Skip,
    Stop,
}

/// Walks version chains with a depth cutoff.
#[derive(Clone, Copy, Debug)]
pub struct HistoryWalker {
    max_depth: usize,
}

impl Default for HistoryWalker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl HistoryWalker {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Every version of the entity, newest first, ending at its creation.
    pub async fn full<R: HistoryReader + ?Sized>(
        &self,
        reader: &R,
        family: EntityFamily,
        id: &EntityId,
    ) -> LedgerResult<Vec<StateRecord>> {
        self.walk(reader, family, id, |_| Step::Keep).await
    }

    /// Versions whose timestamp falls on a day inside `range`, newest first.
    ///
    /// Timestamps never increase going back along the chain, so the walk
    /// stops at the first version dated before the range.
    pub async fn in_range<R: HistoryReader + ?Sized>(
        &self,
        reader: &R,
        family: EntityFamily,
        id: &EntityId,
        range: DateRange,
    ) -> LedgerResult<Vec<StateRecord>> {
        self.walk(reader, family, id, |record| {
            let date = record.timestamp.date();
            if range.precedes(date) {
                Step::Stop
            } else if range.contains(date) {
                Step::Keep
            } else {
                Step::Skip
            }
        })
        .await
    }

    async fn walk<R, F>(
        &self,
        reader: &R,
        family: EntityFamily,
        id: &EntityId,
        mut select: F,
    ) -> LedgerResult<Vec<StateRecord>>
    where
        R: HistoryReader + ?Sized,
        F: FnMut(&StateRecord) -> Step + Send,
    {
        let address = id.address(family);
        let Some(bytes) = reader.current(&address).await? else {
            return Err(Rejected::NotFound {
                family,
                id: id.to_string(),
            });
        };
        let mut version = StateRecord::decode(family, &bytes)
            .map_err(|e| Rejected::Internal(format!("current record is unreadable: {e}")))?;

        let mut selected = Vec::new();
        let mut visited = 1usize;
        loop {
            match select(&version) {
                Step::Keep => selected.push(version.clone()),
                Step::Skip => {}
                Step::Stop => break,
            }
            if version.is_creation() {
                break;
            }
            if visited >= self.max_depth {
                return Err(Rejected::corrupt(
                    &address,
                    version.prev_block,
                    format!("history deeper than {} versions", self.max_depth),
                ));
            }

            let block = version.prev_block;
            let Some(payload) = reader.payload_at(&address, block).await? else {
                return Err(Rejected::corrupt(&address, block, "no transaction found for this version"));
            };
            let older = StateRecord::decode(family, &payload)
                .map_err(|e| Rejected::corrupt(&address, block, e.to_string()))?;
            if older.id != *id {
                return Err(Rejected::corrupt(&address, block, format!("version belongs to {}", older.id)));
            }
            VersionChainVerifier::verify_links(&[version.clone(), older.clone()])
                .map_err(|e| Rejected::corrupt(&address, block, e.to_string()))?;

            tracing::trace!(address = %address.short(), block = %block, "history step");
            visited += 1;
            version = older;
        }
        Ok(selected)
    }
}

/// History held in memory, keyed by address and block.
///
/// For tests and embedding; [`InMemoryHistory::record`] mirrors what a
/// validator does when a transaction is committed.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    current: RwLock<BTreeMap<LedgerAddress, Vec<u8>>>,
    payloads: RwLock<BTreeMap<(LedgerAddress, BlockRef), Vec<u8>>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `record` as current and keep `payload` as the transaction that
    /// wrote it.
    pub fn record(&self, record: &StateRecord, payload: Vec<u8>) {
        let address = record.address();
        if let Ok(mut current) = self.current.write() {
            current.insert(address.clone(), record.encode());
        }
        if let Ok(mut payloads) = self.payloads.write() {
            payloads.insert((address, record.cur_block), payload);
        }
    }

    /// Drop the transaction behind one version, as if its block were lost.
    pub fn forget(&self, address: &LedgerAddress, block: BlockRef) {
        if let Ok(mut payloads) = self.payloads.write() {
            payloads.remove(&(address.clone(), block));
        }
    }
}

#[async_trait]
impl HistoryReader for InMemoryHistory {
    async fn current(&self, address: &LedgerAddress) -> LedgerResult<Option<Vec<u8>>> {
        let current = self
            .current
            .read()
            .map_err(|_| Rejected::Internal("history lock poisoned".into()))?;
        Ok(current.get(address).cloned())
    }

    async fn payload_at(&self, address: &LedgerAddress, block: BlockRef) -> LedgerResult<Option<Vec<u8>>> {
        let payloads = self
            .payloads
            .read()
            .map_err(|_| Rejected::Internal("history lock poisoned".into()))?;
        Ok(payloads.get(&(address.clone(), block)).cloned())
    }
}
