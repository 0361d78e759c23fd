//! Sequential block production over in-memory state.
//!
//! Every submitted batch is verified, replayed transaction by transaction
//! against a staged view of state, and either committed whole as the next
//! block or recorded as invalid with nothing written.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use sparts_crypto::Sha512Digest;
use sparts_ledger::{TransactionProcessor, TransactionRequest};
use sparts_protocol::{
    verify_batch, Batch, BatchJson, BatchList, BatchStatusEntry, BatchStatusKind, BlockHeaderJson,
    BlockJson, InvalidTransaction, TransactionJson,
};
use sparts_state::{InMemoryState, StagedState, StateEntry, StateReader};
use sparts_types::{BlockRef, ErrorKind, LedgerAddress};

use crate::error::{DevnetError, DevnetResult};

/// `previous_block_id` of the genesis block.
pub const NULL_BLOCK_ID: &str = "0000000000000000";

struct ChainLog {
    blocks: Vec<BlockJson>,
    statuses: HashMap<String, BatchStatusEntry>,
    committed: HashSet<String>,
}

impl ChainLog {
    fn with_genesis() -> Self {
        let genesis = BlockJson {
            header: BlockHeaderJson {
                block_num: BlockRef::GENESIS,
                previous_block_id: NULL_BLOCK_ID.into(),
                batch_ids: Vec::new(),
            },
            header_signature: block_id(NULL_BLOCK_ID, BlockRef::GENESIS, &[]),
            batches: Vec::new(),
        };
        Self {
            blocks: vec![genesis],
            statuses: HashMap::new(),
            committed: HashSet::new(),
        }
    }

    fn head(&self) -> &BlockJson {
        // The log is created with a genesis block and only grows.
        &self.blocks[self.blocks.len() - 1]
    }

    fn append(&mut self, batch: BatchJson) -> BlockRef {
        let previous = self.head().header_signature.clone();
        let block_num = self.head().block_num().next();
        let batch_ids = vec![batch.header_signature.to_hex()];
        let header_signature = block_id(&previous, block_num, &batch_ids);
        self.committed
            .extend(batch.transactions.iter().map(|t| t.header_signature.to_hex()));
        self.blocks.push(BlockJson {
            header: BlockHeaderJson {
                block_num,
                previous_block_id: previous,
                batch_ids,
            },
            header_signature,
            batches: vec![batch],
        });
        block_num
    }
}

fn block_id(previous: &str, block_num: BlockRef, batch_ids: &[String]) -> String {
    let mut material = format!("{previous}:{block_num}");
    for id in batch_ids {
        material.push(':');
        material.push_str(id);
    }
    Sha512Digest::of(material.as_bytes()).truncated_hex(64)
}

fn short(id: &str) -> &str {
    &id[..id.len().min(16)]
}

/// Single-node chain: state, block log and batch statuses.
pub struct DevnetChain {
    state: InMemoryState,
    processor: TransactionProcessor,
    log: RwLock<ChainLog>,
}

impl Default for DevnetChain {
    fn default() -> Self {
        Self::new()
    }
}

impl DevnetChain {
    pub fn new() -> Self {
        Self {
            state: InMemoryState::new(),
            processor: TransactionProcessor::new(),
            log: RwLock::new(ChainLog::with_genesis()),
        }
    }

    /// Number of the newest block.
    pub fn height(&self) -> DevnetResult<BlockRef> {
        let log = self.log.read().map_err(|_| DevnetError::LockPoisoned)?;
        Ok(log.head().block_num())
    }

    /// Id of the newest block.
    pub fn head(&self) -> DevnetResult<String> {
        let log = self.log.read().map_err(|_| DevnetError::LockPoisoned)?;
        Ok(log.head().header_signature.clone())
    }

    pub fn state_entry(&self, address: &LedgerAddress) -> DevnetResult<Option<Vec<u8>>> {
        Ok(self.state.get(address)?)
    }

    pub fn list_state(&self, prefix: &str) -> DevnetResult<Vec<StateEntry>> {
        Ok(self.state.list(prefix)?)
    }

    pub fn block(&self, block_num: BlockRef) -> DevnetResult<Option<BlockJson>> {
        let log = self.log.read().map_err(|_| DevnetError::LockPoisoned)?;
        let index = usize::try_from(block_num.height()).ok();
        Ok(index.and_then(|i| log.blocks.get(i)).cloned())
    }

    /// Up to `limit` blocks, newest first.
    pub fn blocks(&self, limit: usize) -> DevnetResult<Vec<BlockJson>> {
        let log = self.log.read().map_err(|_| DevnetError::LockPoisoned)?;
        Ok(log.blocks.iter().rev().take(limit).cloned().collect())
    }

    /// Status of a batch; ids never submitted are `UNKNOWN`.
    pub fn batch_status(&self, batch_id: &str) -> DevnetResult<BatchStatusEntry> {
        let log = self.log.read().map_err(|_| DevnetError::LockPoisoned)?;
        Ok(log.statuses.get(batch_id).cloned().unwrap_or_else(|| BatchStatusEntry {
            id: batch_id.to_string(),
            status: BatchStatusKind::Unknown,
            invalid_transactions: Vec::new(),
        }))
    }

    /// Replay every batch of `list` in order, one block per accepted batch.
    pub fn submit(&self, list: &BatchList) -> DevnetResult<Vec<BatchStatusEntry>> {
        let mut log = self.log.write().map_err(|_| DevnetError::LockPoisoned)?;
        list.batches
            .iter()
            .map(|batch| self.apply_batch(&mut log, batch))
            .collect()
    }

    fn apply_batch(&self, log: &mut ChainLog, batch: &Batch) -> DevnetResult<BatchStatusEntry> {
        let batch_id = batch.id();
        if let Some(existing) = log.statuses.get(&batch_id) {
            if existing.status == BatchStatusKind::Committed {
                return Ok(existing.clone());
            }
        }

        let block_num = log.head().block_num().next();
        let entry = match self.replay(log, batch, block_num) {
            Ok((staged, transactions)) => {
                staged.commit(&self.state)?;
                let count = transactions.len();
                log.append(BatchJson {
                    header_signature: batch.header_signature,
                    transactions,
                });
                tracing::info!(
                    block = %block_num,
                    batch = short(&batch_id),
                    transactions = count,
                    "block committed"
                );
                BatchStatusEntry {
                    id: batch_id.clone(),
                    status: BatchStatusKind::Committed,
                    invalid_transactions: Vec::new(),
                }
            }
            Err(invalid) => {
                tracing::warn!(
                    batch = short(&batch_id),
                    transaction = short(&invalid.id),
                    error = %invalid.message,
                    "batch invalid"
                );
                BatchStatusEntry {
                    id: batch_id.clone(),
                    status: BatchStatusKind::Invalid,
                    invalid_transactions: vec![invalid],
                }
            }
        };
        log.statuses.insert(batch_id, entry.clone());
        Ok(entry)
    }

    fn replay<'s>(
        &'s self,
        log: &ChainLog,
        batch: &Batch,
        block_num: BlockRef,
    ) -> Result<(StagedState<'s, InMemoryState>, Vec<TransactionJson>), InvalidTransaction> {
        let headers = verify_batch(batch).map_err(|e| InvalidTransaction {
            id: batch.id(),
            message: e.to_string(),
            kind: Some(e.kind()),
        })?;

        let staged = StagedState::new(&self.state);
        let mut accepted: Vec<TransactionJson> = Vec::with_capacity(headers.len());
        for (transaction, header) in batch.transactions.iter().zip(headers) {
            let id = transaction.id();
            let invalid = |message: String, kind| InvalidTransaction {
                id: id.clone(),
                message,
                kind,
            };
            if log.committed.contains(&id) {
                return Err(invalid("transaction already committed".into(), None));
            }
            let in_batch = |dep: &String| accepted.iter().any(|t| t.header_signature.to_hex() == *dep);
            if let Some(missing) = header
                .dependencies
                .iter()
                .find(|dep| !log.committed.contains(*dep) && !in_batch(*dep))
            {
                return Err(invalid(
                    format!("dependency {} is not committed", short(missing)),
                    None,
                ));
            }

            let request = TransactionRequest {
                family_name: &header.family_name,
                family_version: &header.family_version,
                outputs: &header.outputs,
                signer: &header.signer_public_key,
                payload: &transaction.payload,
            };
            let record = self
                .processor
                .process(&request, &staged)
                .map_err(|e| invalid(e.to_string(), Some(e.kind())))?;
            if record.cur_block != block_num {
                return Err(invalid(
                    format!(
                        "record is stamped for block {} but the next block is {block_num}",
                        record.cur_block
                    ),
                    Some(ErrorKind::InvalidPayload),
                ));
            }

            accepted.push(TransactionJson {
                header,
                header_signature: transaction.header_signature,
                payload: transaction.payload.clone(),
            });
        }
        Ok((staged, accepted))
    }
}
