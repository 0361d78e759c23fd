use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::address::LedgerAddress;
use crate::error::TypeError;

/// The closed set of entity kinds recorded on the ledger.
///
/// Each family owns its own address namespace (a 6-hex-character prefix
/// derived from its wire name) and its own transaction family name in the
/// signed envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityFamily {
    Artifact,
    Category,
    Organization,
    Part,
    Supplier,
    User,
}

impl EntityFamily {
    /// Every family, in a stable order.
    pub const ALL: [EntityFamily; 6] = [
        Self::Artifact,
        Self::Category,
        Self::Organization,
        Self::Part,
        Self::Supplier,
        Self::User,
    ];

    /// Transaction family version carried in every header.
    pub const VERSION: &'static str = "1.0";

    /// The name used on the wire: in address derivation and in the
    /// transaction header. Part keeps its historical short name `pt`.
    pub const fn wire_name(&self) -> &'static str {
        match self {
            Self::Artifact => "artifact",
            Self::Category => "category",
            Self::Organization => "organization",
            Self::Part => "pt",
            Self::Supplier => "supplier",
            Self::User => "user",
        }
    }

    /// Human-readable name, used in messages and result types.
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Artifact => "Artifact",
            Self::Category => "Category",
            Self::Organization => "Organization",
            Self::Part => "Part",
            Self::Supplier => "Supplier",
            Self::User => "User",
        }
    }

    /// The 6-hex-character namespace prefix of this family.
    pub fn prefix(&self) -> String {
        LedgerAddress::family_prefix(*self)
    }

    /// Derive the state address of `id` within this family.
    pub fn address_of(&self, id: &str) -> LedgerAddress {
        LedgerAddress::derive(*self, id)
    }

    /// Resolve a family from its wire name.
    pub fn from_wire_name(name: &str) -> Result<Self, TypeError> {
        Self::ALL
            .into_iter()
            .find(|f| f.wire_name() == name)
            .ok_or_else(|| TypeError::UnknownFamily(name.to_string()))
    }

    /// Resolve a family from a 6-hex-character address prefix.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.prefix() == prefix)
    }
}

impl fmt::Display for EntityFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for EntityFamily {
    type Err = TypeError;

    /// Accepts the wire name (`pt`) as well as the lowercase display name (`part`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.wire_name() == lower || f.display_name().to_ascii_lowercase() == lower)
            .ok_or_else(|| TypeError::UnknownFamily(s.to_string()))
    }
}
