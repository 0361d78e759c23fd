use std::collections::BTreeMap;
use std::sync::RwLock;

use sparts_types::LedgerAddress;

use crate::error::{StateError, StateResult};
use crate::traits::{StateEntry, StateReader, StateWriter};

/// Write overlay over a base reader.
///
/// Reads see pending writes first, then fall through to the base. Nothing
/// reaches the base until [`StagedState::into_writes`] is handed to a writer,
/// so a batch whose later transaction is rejected leaves the base untouched.
pub struct StagedState<'a, R: StateReader + ?Sized> {
    base: &'a R,
    pending: RwLock<BTreeMap<LedgerAddress, Vec<u8>>>,
}

impl<'a, R: StateReader + ?Sized> StagedState<'a, R> {
    pub fn new(base: &'a R) -> Self {
        Self {
            base,
            pending: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of staged writes.
    pub fn pending_len(&self) -> usize {
        self.pending.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Consume the overlay, yielding staged writes in address order.
    pub fn into_writes(self) -> StateResult<Vec<StateEntry>> {
        let pending = self
            .pending
            .into_inner()
            .map_err(|_| StateError::LockPoisoned)?;
        Ok(pending
            .into_iter()
            .map(|(address, data)| StateEntry { address, data })
            .collect())
    }

    /// Flush staged writes into `target` as one group.
    pub fn commit<W: StateWriter + ?Sized>(self, target: &W) -> StateResult<usize> {
        let writes = self.into_writes()?;
        let count = writes.len();
        target.set_many(writes)?;
        tracing::debug!(writes = count, "staged state committed");
        Ok(count)
    }
}

impl<R: StateReader + ?Sized> StateReader for StagedState<'_, R> {
    fn get(&self, address: &LedgerAddress) -> StateResult<Option<Vec<u8>>> {
        {
            let pending = self.pending.read().map_err(|_| StateError::LockPoisoned)?;
            if let Some(data) = pending.get(address) {
                return Ok(Some(data.clone()));
            }
        }
        self.base.get(address)
    }

    fn list(&self, prefix: &str) -> StateResult<Vec<StateEntry>> {
        let mut merged: BTreeMap<LedgerAddress, Vec<u8>> = self
            .base
            .list(prefix)?
            .into_iter()
            .map(|e| (e.address, e.data))
            .collect();
        let pending = self.pending.read().map_err(|_| StateError::LockPoisoned)?;
        for (address, data) in pending.iter() {
            if address.as_str().starts_with(prefix) {
                merged.insert(address.clone(), data.clone());
            }
        }
        Ok(merged
            .into_iter()
            .map(|(address, data)| StateEntry { address, data })
            .collect())
    }
}

impl<R: StateReader + ?Sized> StateWriter for StagedState<'_, R> {
    fn set(&self, address: &LedgerAddress, data: Vec<u8>) -> StateResult<()> {
        let mut pending = self.pending.write().map_err(|_| StateError::LockPoisoned)?;
        pending.insert(address.clone(), data);
        Ok(())
    }
}
