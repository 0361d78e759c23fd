use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Reference to a block in the external chain history.
///
/// Records carry two of these: `cur_block`, the block the write was submitted
/// for, and `prev_block`, the `cur_block` of the record it replaced. The
/// value `"0"` ([`BlockRef::GENESIS`]) marks the creation record and
/// terminates a backward walk. On the wire a block ref is a decimal string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlockRef(u64);

impl BlockRef {
    /// Chain terminal: the predecessor of every creation record.
    pub const GENESIS: BlockRef = BlockRef(0);

    pub const fn new(height: u64) -> Self {
        Self(height)
    }

    pub const fn height(&self) -> u64 {
        self.0
    }

    pub const fn is_genesis(&self) -> bool {
        self.0 == 0
    }

    /// The block after this one.
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockRef({})", self.0)
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BlockRef {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| TypeError::InvalidBlockRef(s.to_string()))
    }
}

impl TryFrom<String> for BlockRef {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BlockRef> for String {
    fn from(value: BlockRef) -> Self {
        value.0.to_string()
    }
}

impl From<u64> for BlockRef {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_is_zero_string() {
        assert!(BlockRef::GENESIS.is_genesis());
        assert_eq!(String::from(BlockRef::GENESIS), "0");
        assert_eq!(serde_json::to_string(&BlockRef::GENESIS).unwrap(), "\"0\"");
    }

    #[test]
    fn parses_decimal_strings() {
        assert_eq!("42".parse::<BlockRef>().unwrap(), BlockRef::new(42));
        assert!("-1".parse::<BlockRef>().is_err());
        assert!("abc".parse::<BlockRef>().is_err());
        assert!(serde_json::from_str::<BlockRef>("\"x\"").is_err());
    }

    #[test]
    fn next_and_ordering() {
        let b = BlockRef::new(7);
        assert_eq!(b.next(), BlockRef::new(8));
        assert!(BlockRef::GENESIS < b);
    }
}
