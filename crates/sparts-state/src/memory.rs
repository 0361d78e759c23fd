use std::collections::BTreeMap;
use std::sync::RwLock;

use sparts_types::LedgerAddress;

use crate::error::{StateError, StateResult};
use crate::traits::{StateEntry, StateReader, StateWriter};

/// In-memory, `BTreeMap`-based state store.
///
/// Intended for tests, the devnet and embedding. Values are cloned on read and
/// write. Address order is preserved so prefix listings are deterministic.
pub struct InMemoryState {
    entries: RwLock<BTreeMap<LedgerAddress, Vec<u8>>>,
}

impl InMemoryState {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of addresses currently holding a value.
    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every entry, in address order.
    pub fn snapshot(&self) -> StateResult<Vec<StateEntry>> {
        let map = self.entries.read().map_err(|_| StateError::LockPoisoned)?;
        Ok(map
            .iter()
            .map(|(address, data)| StateEntry {
                address: address.clone(),
                data: data.clone(),
            })
            .collect())
    }
}

impl Default for InMemoryState {
    fn default() -> Self {
        Self::new()
    }
}

impl StateReader for InMemoryState {
    fn get(&self, address: &LedgerAddress) -> StateResult<Option<Vec<u8>>> {
        let map = self.entries.read().map_err(|_| StateError::LockPoisoned)?;
        Ok(map.get(address).cloned())
    }

    fn list(&self, prefix: &str) -> StateResult<Vec<StateEntry>> {
        let map = self.entries.read().map_err(|_| StateError::LockPoisoned)?;
        Ok(map
            .iter()
            .filter(|(address, _)| address.as_str().starts_with(prefix))
            .map(|(address, data)| StateEntry {
                address: address.clone(),
                data: data.clone(),
            })
            .collect())
    }
}

impl StateWriter for InMemoryState {
    fn set(&self, address: &LedgerAddress, data: Vec<u8>) -> StateResult<()> {
        let mut map = self.entries.write().map_err(|_| StateError::LockPoisoned)?;
        map.insert(address.clone(), data);
        Ok(())
    }

    /// Atomic: all entries are written under one lock acquisition.
    fn set_many(&self, entries: Vec<StateEntry>) -> StateResult<()> {
        let mut map = self.entries.write().map_err(|_| StateError::LockPoisoned)?;
        for entry in entries {
            map.insert(entry.address, entry.data);
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryState")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sparts_types::EntityFamily;

    fn addr(family: EntityFamily, id: &str) -> LedgerAddress {
        LedgerAddress::derive(family, id)
    }

    #[test]
    fn missing_address_reads_none() {
        let state = InMemoryState::new();
        assert_eq!(state.get(&addr(EntityFamily::Part, "p1")).unwrap(), None);
        assert!(!state.contains(&addr(EntityFamily::Part, "p1")).unwrap());
    }

    #[test]
    fn set_overwrites() {
        let state = InMemoryState::new();
        let a = addr(EntityFamily::Part, "p1");
        state.set(&a, b"one".to_vec()).unwrap();
        state.set(&a, b"two".to_vec()).unwrap();
        assert_eq!(state.get(&a).unwrap(), Some(b"two".to_vec()));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn list_filters_by_family_prefix() {
        let state = InMemoryState::new();
        state.set(&addr(EntityFamily::Part, "p1"), b"p1".to_vec()).unwrap();
        state.set(&addr(EntityFamily::Part, "p2"), b"p2".to_vec()).unwrap();
        state.set(&addr(EntityFamily::Artifact, "a1"), b"a1".to_vec()).unwrap();

        let parts = state.list(&EntityFamily::Part.prefix()).unwrap();
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|e| e.address.belongs_to(EntityFamily::Part)));
        assert_eq!(state.list("").unwrap().len(), 3);
    }

    #[test]
    fn set_many_writes_everything() {
        let state = InMemoryState::new();
        state
            .set_many(vec![
                StateEntry { address: addr(EntityFamily::User, "u1"), data: vec![1] },
                StateEntry { address: addr(EntityFamily::User, "u2"), data: vec![2] },
            ])
            .unwrap();
        assert_eq!(state.snapshot().unwrap().len(), 2);
    }
}
