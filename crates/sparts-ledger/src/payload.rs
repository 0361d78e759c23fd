use serde_json::{Map, Value};
use sparts_types::EntityFamily;

use crate::action::{Action, Patch};
use crate::error::{LedgerResult, Rejected};
use crate::record::{sorted, RelationEntry, StateRecord};
use crate::schema::{FamilySchema, RelationOp, AMEND_ACTION};

/// Transaction payload: the record an action produces, plus the action.
///
/// Encoded as one flat JSON object with lexically sorted keys: the record's
/// keys, `action`, and for relation actions `target`. Because the record is
/// carried whole, a history walk decodes any past version straight from the
/// payload of the transaction that wrote it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionPayload {
    pub action: Action,
    pub record: StateRecord,
}

impl TransactionPayload {
    /// Pair an accepted action with the record it produced.
    pub fn new(action: Action, record: StateRecord) -> LedgerResult<Self> {
        let schema = record.schema();
        if action.wire_name(schema).is_none() {
            return Err(unsupported(record.family, &action));
        }
        Ok(Self { action, record })
    }

    pub fn family(&self) -> EntityFamily {
        self.record.family
    }

    /// Wire name of the action.
    pub fn action_name(&self) -> &'static str {
        // Checked on construction.
        self.action.wire_name(self.record.schema()).unwrap_or(AMEND_ACTION)
    }

    /// Canonical bytes, hashed into the transaction header.
    pub fn encode(&self) -> Vec<u8> {
        let mut map = self.record.to_json_map();
        map.insert("action".into(), Value::String(self.action_name().into()));
        if let Some(target) = self.action.target() {
            let value = serde_json::to_value(target).unwrap_or(Value::Null);
            map.insert("target".into(), value);
        }
        Value::Object(sorted(map)).to_string().into_bytes()
    }

    /// Decode a payload of `family`.
    ///
    /// An amend is recovered as "set every field to the recorded value", which
    /// replays to the same record as the original partial amend.
    pub fn decode(family: EntityFamily, bytes: &[u8]) -> LedgerResult<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| Rejected::InvalidPayload(format!("payload is not JSON: {e}")))?;
        let Value::Object(map) = value else {
            return Err(Rejected::InvalidPayload("payload is not a JSON object".into()));
        };
        let record = StateRecord::from_json_map(family, &map)?;
        let action = decode_action(family, &map, &record)?;
        Ok(Self { action, record })
    }
}

fn decode_action(
    family: EntityFamily,
    map: &Map<String, Value>,
    record: &StateRecord,
) -> LedgerResult<Action> {
    let schema = FamilySchema::of(family);
    let name = match map.get("action") {
        Some(Value::String(name)) => name.as_str(),
        _ => return Err(Rejected::InvalidPayload("`action` is missing".into())),
    };

    if name == schema.create_action {
        return Ok(Action::Create {
            fields: record.fields.clone(),
        });
    }
    if name == AMEND_ACTION {
        return Ok(Action::Amend {
            fields: record
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), Patch::Set(v.clone())))
                .collect(),
        });
    }
    let Some((spec, op)) = schema.relation_action(name) else {
        return Err(Rejected::UnsupportedAction {
            family,
            action: name.to_string(),
        });
    };
    let target: RelationEntry = match map.get("target") {
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| Rejected::InvalidPayload(format!("bad `target`: {e}")))?,
        None => return Err(Rejected::InvalidPayload("`target` is missing".into())),
    };
    Ok(match op {
        RelationOp::Add => Action::add(spec.name, target),
        RelationOp::Remove => Action::remove(spec.name, target),
    })
}

fn unsupported(family: EntityFamily, action: &Action) -> Rejected {
    let name = match action {
        Action::AddRelation { relation, .. } | Action::RemoveRelation { relation, .. } => {
            relation.clone()
        }
        Action::Create { .. } => "create".into(),
        Action::Amend { .. } => AMEND_ACTION.into(),
    };
    Rejected::UnsupportedAction { family, action: name }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{KnownTargets, TransitionContext, TransitionEngine};
    use sparts_types::{BlockRef, EntityId, Timestamp};

    fn ctx(block: u64) -> TransitionContext {
        TransitionContext::new(
            EntityFamily::Part,
            EntityId::new("p1").unwrap(),
            BlockRef::new(block),
            Timestamp::parse("2024-06-01 08:30:00.250000").unwrap(),
        )
    }

    fn created() -> TransactionPayload {
        let action = Action::create([("name", "Widget")]);
        let record = TransitionEngine::apply(None, &action, &ctx(5), &KnownTargets::new()).unwrap();
        TransactionPayload::new(action, record).unwrap()
    }

    #[test]
    fn encodes_record_keys_and_action() {
        let json: Value = serde_json::from_slice(&created().encode()).unwrap();
        assert_eq!(json["action"], "create");
        assert_eq!(json["uuid"], "p1");
        assert_eq!(json["name"], "Widget");
        assert_eq!(json["prev_block"], "0");
        assert_eq!(json["cur_block"], "5");
        assert_eq!(json["artifact_list"], Value::Array(vec![]));
        assert!(json.get("target").is_none());
    }

    #[test]
    fn encoding_is_byte_stable() {
        assert_eq!(created().encode(), created().encode());
        let text = String::from_utf8(created().encode()).unwrap();
        let map: Map<String, Value> = serde_json::from_str(&text).unwrap();
        assert_eq!(map.len(), 15);
        assert!(text.starts_with("{\"action\":\"create\",\"alias\":\"\""));
    }

    #[test]
    fn decodes_as_record_and_action() {
        let payload = created();
        let decoded = TransactionPayload::decode(EntityFamily::Part, &payload.encode()).unwrap();
        assert_eq!(decoded.record, payload.record);
        assert_eq!(
            decoded.action,
            Action::Create {
                fields: payload.record.fields.clone()
            }
        );

        let as_record = StateRecord::decode(EntityFamily::Part, &payload.encode()).unwrap();
        assert_eq!(as_record, payload.record);
    }

    #[test]
    fn relation_payloads_carry_target() {
        let base = created();
        let action = Action::add("artifact_list", RelationEntry::reference("a1"));
        let record = TransitionEngine::apply(
            Some(&base.record),
            &action,
            &ctx(6),
            &KnownTargets::new().with(EntityFamily::Artifact, "a1"),
        )
        .unwrap();
        let payload = TransactionPayload::new(action, record).unwrap();
        let json: Value = serde_json::from_slice(&payload.encode()).unwrap();
        assert_eq!(json["action"], "AddArtifact");
        assert_eq!(json["target"], "a1");
        let decoded = TransactionPayload::decode(EntityFamily::Part, &payload.encode()).unwrap();
        assert_eq!(decoded.action, payload.action);
    }

    #[test]
    fn amend_decodes_as_full_patch() {
        let base = created();
        let action = Action::amend([("name", Patch::set("Gadget"))]);
        let record =
            TransitionEngine::apply(Some(&base.record), &action, &ctx(6), &KnownTargets::new()).unwrap();
        let payload = TransactionPayload::new(action, record.clone()).unwrap();
        let decoded = TransactionPayload::decode(EntityFamily::Part, &payload.encode()).unwrap();
        let replayed =
            TransitionEngine::apply(Some(&base.record), &decoded.action, &ctx(6), &KnownTargets::new())
                .unwrap();
        assert_eq!(replayed, record);
    }

    #[test]
    fn rejects_unknown_or_missing_action() {
        let payload = created();
        let mut map: Map<String, Value> = serde_json::from_slice(&payload.encode()).unwrap();
        map.insert("action".into(), Value::String("AddURI".into()));
        let err = TransactionPayload::decode(EntityFamily::Part, Value::Object(map.clone()).to_string().as_bytes())
            .unwrap_err();
        assert_eq!(err.kind(), sparts_types::ErrorKind::UnsupportedAction);

        map.remove("action");
        let err = TransactionPayload::decode(EntityFamily::Part, Value::Object(map).to_string().as_bytes())
            .unwrap_err();
        assert_eq!(err.kind(), sparts_types::ErrorKind::InvalidPayload);
    }

    #[test]
    fn relation_action_requires_target() {
        let mut map: Map<String, Value> = serde_json::from_slice(&created().encode()).unwrap();
        map.insert("action".into(), Value::String("RemoveArtifact".into()));
        let err = TransactionPayload::decode(EntityFamily::Part, Value::Object(map).to_string().as_bytes())
            .unwrap_err();
        assert_eq!(err.kind(), sparts_types::ErrorKind::InvalidPayload);
    }

    #[test]
    fn new_rejects_relation_the_family_lacks() {
        let base = created();
        let err = TransactionPayload::new(
            Action::add("pt_list", RelationEntry::reference("x")),
            base.record,
        )
        .unwrap_err();
        assert_eq!(err.kind(), sparts_types::ErrorKind::UnsupportedAction);
    }
}
