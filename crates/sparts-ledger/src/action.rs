use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::RelationEntry;
use crate::schema::{FamilySchema, AMEND_ACTION};

/// Amend value for one field: keep the prior value or replace it.
///
/// Stands in for the legacy `"null"` string sentinel, so `"null"` itself is
/// an ordinary value that can be stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Patch {
    #[default]
    Unchanged,
    Set(String),
}

impl Patch {
    pub fn set(value: impl Into<String>) -> Self {
        Self::Set(value.into())
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }

    /// The value to store, given the prior value.
    pub fn resolve<'a>(&'a self, prior: &'a str) -> &'a str {
        match self {
            Self::Unchanged => prior,
            Self::Set(value) => value,
        }
    }
}

impl From<Option<String>> for Patch {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Unchanged, Self::Set)
    }
}

/// A requested change to one entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Create the entity with the given data fields.
    Create { fields: BTreeMap<String, String> },
    /// Replace some data fields; fields absent from the map are unchanged.
    Amend { fields: BTreeMap<String, Patch> },
    AddRelation {
        relation: String,
        target: RelationEntry,
    },
    RemoveRelation {
        relation: String,
        target: RelationEntry,
    },
}

impl Action {
    pub fn create<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Create {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn amend<K: Into<String>>(fields: impl IntoIterator<Item = (K, Patch)>) -> Self {
        Self::Amend {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn add(relation: impl Into<String>, target: RelationEntry) -> Self {
        Self::AddRelation {
            relation: relation.into(),
            target,
        }
    }

    pub fn remove(relation: impl Into<String>, target: RelationEntry) -> Self {
        Self::RemoveRelation {
            relation: relation.into(),
            target,
        }
    }

    /// Relation target, for relation actions.
    pub fn target(&self) -> Option<&RelationEntry> {
        match self {
            Self::AddRelation { target, .. } | Self::RemoveRelation { target, .. } => Some(target),
            Self::Create { .. } | Self::Amend { .. } => None,
        }
    }

    /// Name carried in the transaction payload's `action` key, or `None` if
    /// the family has no relation of that name.
    pub fn wire_name(&self, schema: &FamilySchema) -> Option<&'static str> {
        match self {
            Self::Create { .. } => Some(schema.create_action),
            Self::Amend { .. } => Some(AMEND_ACTION),
            Self::AddRelation { relation, .. } => schema.relation(relation).map(|r| r.add_action),
            Self::RemoveRelation { relation, .. } => {
                schema.relation(relation).map(|r| r.remove_action)
            }
        }
    }
}
