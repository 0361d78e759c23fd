use sparts_types::LedgerAddress;

use crate::error::StateResult;

/// One address/value pair, as returned by prefix listings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateEntry {
    pub address: LedgerAddress,
    pub data: Vec<u8>,
}

/// Read side of the state interface.
pub trait StateReader: Send + Sync {
    /// Read the value at `address`.
    ///
    /// Returns `Ok(None)` if nothing is stored there.
    fn get(&self, address: &LedgerAddress) -> StateResult<Option<Vec<u8>>>;

    /// Every entry whose address starts with `prefix`, in address order.
    fn list(&self, prefix: &str) -> StateResult<Vec<StateEntry>>;

    /// Returns `true` if a value is stored at `address`.
    fn contains(&self, address: &LedgerAddress) -> StateResult<bool> {
        Ok(self.get(address)?.is_some())
    }
}

/// Write side of the state interface.
pub trait StateWriter: Send + Sync {
    /// Store `data` at `address`, replacing any previous value.
    fn set(&self, address: &LedgerAddress, data: Vec<u8>) -> StateResult<()>;

    /// Store several entries.
    ///
    /// Default implementation calls `set()` for each entry in order. Backends
    /// may override to make the group atomic.
    fn set_many(&self, entries: Vec<StateEntry>) -> StateResult<()> {
        for entry in entries {
            self.set(&entry.address, entry.data)?;
        }
        Ok(())
    }
}

/// Full read/write state interface.
pub trait StateStore: StateReader + StateWriter {}

impl<T: StateReader + StateWriter> StateStore for T {}
