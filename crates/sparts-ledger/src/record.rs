use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use sparts_types::{BlockRef, EntityFamily, EntityId, LedgerAddress, Timestamp};

use crate::error::{LedgerResult, Rejected};
use crate::schema::{FamilySchema, RelationTarget};

/// Embedded URI record carried in an artifact's `uri_list`.
///
/// URIs have no entity of their own; two entries are the same entry when
/// every field matches.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UriEntry {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub uri_type: String,
    #[serde(default)]
    pub location: String,
}

/// One element of a relation list.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationEntry {
    /// Id of an entity in the relation's target family.
    Ref(String),
    Uri(UriEntry),
}

impl RelationEntry {
    pub fn reference(id: impl Into<String>) -> Self {
        Self::Ref(id.into())
    }

    pub fn as_ref_id(&self) -> Option<&str> {
        match self {
            Self::Ref(id) => Some(id),
            Self::Uri(_) => None,
        }
    }

    /// Returns `true` if this entry has the right shape for `target`.
    pub fn fits(&self, target: RelationTarget) -> bool {
        matches!(
            (self, target),
            (Self::Ref(_), RelationTarget::Family(_)) | (Self::Uri(_), RelationTarget::Uri)
        )
    }
}

impl fmt::Display for RelationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ref(id) => f.write_str(id),
            Self::Uri(uri) => write!(f, "{} ({})", uri.location, uri.version),
        }
    }
}

/// The value stored at an entity's address: its newest version.
///
/// Besides the family's data fields and relation lists every record carries
/// its version-chain links. `prev_block` is the `cur_block` of the record it
/// replaced, or [`BlockRef::GENESIS`] for the creation record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateRecord {
    pub family: EntityFamily,
    pub id: EntityId,
    pub fields: BTreeMap<String, String>,
    pub relations: BTreeMap<String, Vec<RelationEntry>>,
    pub prev_block: BlockRef,
    pub cur_block: BlockRef,
    pub timestamp: Timestamp,
}

impl StateRecord {
    pub fn schema(&self) -> &'static FamilySchema {
        FamilySchema::of(self.family)
    }

    pub fn address(&self) -> LedgerAddress {
        self.id.address(self.family)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Entries of relation list `name`; empty if the family has no such list.
    pub fn relation(&self, name: &str) -> &[RelationEntry] {
        self.relations.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns `true` for the first record of an entity's chain.
    pub fn is_creation(&self) -> bool {
        self.prev_block.is_genesis()
    }

    /// Flat JSON object: id key, data fields, relation lists and chain keys.
    pub fn to_json_map(&self) -> Map<String, Value> {
        let schema = self.schema();
        let mut map = Map::new();
        map.insert(schema.id_key.into(), Value::String(self.id.to_string()));
        for (name, value) in &self.fields {
            map.insert(name.clone(), Value::String(value.clone()));
        }
        for spec in schema.relations {
            let entries = self
                .relation(spec.name)
                .iter()
                .map(|entry| match entry {
                    RelationEntry::Ref(id) => Value::String(id.clone()),
                    RelationEntry::Uri(uri) => serde_json::to_value(uri).unwrap_or(Value::Null),
                })
                .collect();
            map.insert(spec.name.into(), Value::Array(entries));
        }
        map.insert("prev_block".into(), Value::String(self.prev_block.to_string()));
        map.insert("cur_block".into(), Value::String(self.cur_block.to_string()));
        map.insert("timestamp".into(), Value::String(self.timestamp.to_string()));
        sorted(map)
    }

    /// Bytes stored at the record's address.
    pub fn encode(&self) -> Vec<u8> {
        Value::Object(self.to_json_map()).to_string().into_bytes()
    }

    /// Decode a stored record.
    ///
    /// Keys outside the family schema are ignored, so a transaction payload
    /// (which adds `action` and possibly `target`) decodes as the record it
    /// produced.
    pub fn decode(family: EntityFamily, bytes: &[u8]) -> LedgerResult<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| Rejected::InvalidPayload(format!("record is not JSON: {e}")))?;
        match value {
            Value::Object(map) => Self::from_json_map(family, &map),
            _ => Err(Rejected::InvalidPayload("record is not a JSON object".into())),
        }
    }

    pub fn from_json_map(family: EntityFamily, map: &Map<String, Value>) -> LedgerResult<Self> {
        let schema = FamilySchema::of(family);
        let id = EntityId::new(string_key(map, schema.id_key)?)
            .map_err(|e| Rejected::InvalidPayload(e.to_string()))?;

        let mut fields = BTreeMap::new();
        for name in schema.fields() {
            let value = match map.get(name) {
                None | Some(Value::Null) => String::new(),
                Some(_) => string_key(map, name)?,
            };
            fields.insert(name.to_string(), value);
        }

        let mut relations = BTreeMap::new();
        for spec in schema.relations {
            let entries = match map.get(spec.name) {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items
                    .iter()
                    .map(|item| decode_entry(spec.name, spec.target, item))
                    .collect::<LedgerResult<Vec<_>>>()?,
                Some(_) => {
                    return Err(Rejected::InvalidPayload(format!(
                        "`{}` is not a list",
                        spec.name
                    )))
                }
            };
            relations.insert(spec.name.to_string(), entries);
        }

        let prev_block: BlockRef = string_key(map, "prev_block")?
            .parse()
            .map_err(|e: sparts_types::TypeError| Rejected::InvalidPayload(e.to_string()))?;
        let cur_block: BlockRef = string_key(map, "cur_block")?
            .parse()
            .map_err(|e: sparts_types::TypeError| Rejected::InvalidPayload(e.to_string()))?;
        let timestamp = Timestamp::parse(&string_key(map, "timestamp")?)
            .map_err(|e| Rejected::InvalidPayload(e.to_string()))?;

        Ok(Self {
            family,
            id,
            fields,
            relations,
            prev_block,
            cur_block,
            timestamp,
        })
    }

    /// Data fields and relation lists equal, ignoring chain keys.
    pub fn same_content(&self, other: &StateRecord) -> bool {
        self.family == other.family
            && self.id == other.id
            && self.fields == other.fields
            && self.relations == other.relations
    }
}

impl Serialize for StateRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_map().serialize(serializer)
    }
}

/// Re-insert keys in lexical order, whatever map flavour serde_json was built with.
pub(crate) fn sorted(map: Map<String, Value>) -> Map<String, Value> {
    let ordered: BTreeMap<String, Value> = map.into_iter().collect();
    ordered.into_iter().collect()
}

fn string_key(map: &Map<String, Value>, key: &str) -> LedgerResult<String> {
    match map.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(_) => Err(Rejected::InvalidPayload(format!("`{key}` is not a string"))),
        None => Err(Rejected::InvalidPayload(format!("`{key}` is missing"))),
    }
}

fn decode_entry(list: &str, target: RelationTarget, item: &Value) -> LedgerResult<RelationEntry> {
    let entry: RelationEntry = serde_json::from_value(item.clone())
        .map_err(|e| Rejected::InvalidPayload(format!("bad entry in `{list}`: {e}")))?;
    if !entry.fits(target) {
        return Err(Rejected::InvalidPayload(format!(
            "entry of the wrong shape in `{list}`"
        )));
    }
    Ok(entry)
}
