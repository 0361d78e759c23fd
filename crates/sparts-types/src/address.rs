use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

use crate::error::TypeError;
use crate::family::EntityFamily;

/// Hex characters of the family namespace prefix.
pub const PREFIX_LEN: usize = 6;
/// Hex characters of the hashed entity id.
pub const ID_HASH_LEN: usize = 64;
/// Total hex characters of a ledger address.
pub const ADDRESS_LEN: usize = PREFIX_LEN + ID_HASH_LEN;

/// Deterministic key into the external key/value state store.
///
/// `address = hex(sha512(family_wire_name))[..6] ++ hex(sha512(id))[..64]`,
/// both inputs UTF-8 encoded and both digests lowercase hex. Every client and
/// every validator replica must derive byte-identical addresses; any change
/// to the encoding here breaks consensus with existing state.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LedgerAddress(String);

impl LedgerAddress {
    /// Derive the address of `id` within `family`.
    pub fn derive(family: EntityFamily, id: &str) -> Self {
        let mut address = Self::family_prefix(family);
        address.push_str(&sha512_hex(id.as_bytes())[..ID_HASH_LEN]);
        Self(address)
    }

    /// The namespace prefix shared by every address of `family`.
    pub fn family_prefix(family: EntityFamily) -> String {
        sha512_hex(family.wire_name().as_bytes())[..PREFIX_LEN].to_string()
    }

    /// Parse and validate an address string (70 lowercase hex characters).
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        if s.len() != ADDRESS_LEN {
            return Err(TypeError::InvalidAddress {
                address: s.to_string(),
                reason: format!("expected {ADDRESS_LEN} characters, got {}", s.len()),
            });
        }
        if !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(TypeError::InvalidAddress {
                address: s.to_string(),
                reason: "expected lowercase hex".into(),
            });
        }
        Ok(Self(s.to_string()))
    }

    /// The 6-character namespace prefix.
    pub fn prefix(&self) -> &str {
        &self.0[..PREFIX_LEN]
    }

    /// The family owning this address, if its prefix is a known namespace.
    pub fn family(&self) -> Option<EntityFamily> {
        EntityFamily::from_prefix(self.prefix())
    }

    /// Returns `true` if this address lies in `family`'s namespace.
    pub fn belongs_to(&self, family: EntityFamily) -> bool {
        self.prefix() == LedgerAddress::family_prefix(family)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form for logs (prefix + first 8 id-hash characters).
    pub fn short(&self) -> String {
        format!("{}:{}", &self.0[..PREFIX_LEN], &self.0[PREFIX_LEN..PREFIX_LEN + 8])
    }
}

fn sha512_hex(data: &[u8]) -> String {
    hex::encode(Sha512::digest(data))
}

impl fmt::Debug for LedgerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LedgerAddress({})", self.short())
    }
}

impl fmt::Display for LedgerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LedgerAddress {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LedgerAddress {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LedgerAddress> for String {
    fn from(value: LedgerAddress) -> Self {
        value.0
    }
}

impl AsRef<str> for LedgerAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
