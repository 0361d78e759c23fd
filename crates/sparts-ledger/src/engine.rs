//! The transition engine.
//!
//! A single function, [`TransitionEngine::apply`], covers all six families by
//! consulting their [`FamilySchema`]. It reads nothing but its arguments and
//! the target lookup, and never consults a clock: the new record's
//! `cur_block` and `timestamp` come from the [`TransitionContext`].

use std::collections::{BTreeMap, BTreeSet};

use sparts_state::StateReader;
use sparts_types::{BlockRef, EntityFamily, EntityId, LedgerAddress, Timestamp};

use crate::action::Action;
use crate::error::{LedgerResult, Rejected};
use crate::record::{RelationEntry, StateRecord};
use crate::schema::{FamilySchema, RelationTarget};

/// Existence check for relation targets.
///
/// Implemented for every [`StateReader`], so the processor passes the state it
/// is applying against.
pub trait TargetLookup {
    fn exists(&self, family: EntityFamily, id: &str) -> LedgerResult<bool>;
}

impl<S: StateReader + ?Sized> TargetLookup for S {
    fn exists(&self, family: EntityFamily, id: &str) -> LedgerResult<bool> {
        Ok(self.contains(&LedgerAddress::derive(family, id))?)
    }
}

/// Targets already confirmed to exist by the caller.
///
/// Clients check a target with one ledger read before building a relation
/// transaction, then hand the result to the engine through this set.
#[derive(Clone, Debug, Default)]
pub struct KnownTargets(BTreeSet<LedgerAddress>);

impl KnownTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, family: EntityFamily, id: &str) {
        self.0.insert(LedgerAddress::derive(family, id));
    }

    pub fn with(mut self, family: EntityFamily, id: &str) -> Self {
        self.insert(family, id);
        self
    }
}

impl TargetLookup for KnownTargets {
    fn exists(&self, family: EntityFamily, id: &str) -> LedgerResult<bool> {
        Ok(self.0.contains(&LedgerAddress::derive(family, id)))
    }
}

/// Inputs to a transition besides the prior record and the action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionContext {
    pub family: EntityFamily,
    pub id: EntityId,
    /// Block the new record is written for.
    pub cur_block: BlockRef,
    pub timestamp: Timestamp,
}

impl TransitionContext {
    pub fn new(family: EntityFamily, id: EntityId, cur_block: BlockRef, timestamp: Timestamp) -> Self {
        Self {
            family,
            id,
            cur_block,
            timestamp,
        }
    }

    pub fn address(&self) -> LedgerAddress {
        self.id.address(self.family)
    }
}

/// Deterministic state transitions for every family.
pub struct TransitionEngine;

impl TransitionEngine {
    /// Compute the record that replaces `prior` once `action` is accepted.
    ///
    /// Rejections:
    /// - `AlreadyExists` for a create over an existing record
    /// - `NotFound` for any other action without a prior record
    /// - `MissingField` when a required field is blank
    /// - `DanglingReference`, `Duplicate`, `NotPresent`, `EmptyRelation` for
    ///   relation changes
    /// - `UnsupportedAction` for actions the family does not accept
    /// - `InvalidPayload` for unknown fields, mis-shaped relation entries, a
    ///   prior record of another entity, or a `cur_block` that does not advance
    pub fn apply<L: TargetLookup + ?Sized>(
        prior: Option<&StateRecord>,
        action: &Action,
        ctx: &TransitionContext,
        targets: &L,
    ) -> LedgerResult<StateRecord> {
        let schema = FamilySchema::of(ctx.family);
        if let Some(prior) = prior {
            if prior.family != ctx.family || prior.id != ctx.id {
                return Err(Rejected::InvalidPayload(format!(
                    "prior record belongs to {} {}, not {} {}",
                    prior.family, prior.id, ctx.family, ctx.id
                )));
            }
        }
        check_block(prior, ctx.cur_block)?;

        let (fields, relations) = match action {
            Action::Create { fields } => {
                if prior.is_some() {
                    return Err(Rejected::AlreadyExists {
                        family: ctx.family,
                        id: ctx.id.to_string(),
                    });
                }
                create_fields(schema, fields)?
            }
            Action::Amend { fields } => {
                if !schema.amendable {
                    return Err(unsupported(ctx.family, "amend"));
                }
                let prior = existing(prior, ctx)?;
                let mut merged = prior.fields.clone();
                for (name, patch) in fields {
                    if !schema.is_field(name) {
                        return Err(unknown_field(ctx.family, name));
                    }
                    let current = merged.get(name).map(String::as_str).unwrap_or("");
                    let value = patch.resolve(current).to_string();
                    if schema.is_required(name) && value.trim().is_empty() {
                        return Err(Rejected::MissingField { field: name.clone() });
                    }
                    merged.insert(name.clone(), value);
                }
                (merged, prior.relations.clone())
            }
            Action::AddRelation { relation, target } => {
                let spec = schema
                    .relation(relation)
                    .ok_or_else(|| unsupported(ctx.family, relation))?;
                let prior = existing(prior, ctx)?;
                if !target.fits(spec.target) {
                    return Err(Rejected::InvalidPayload(format!(
                        "entry of the wrong shape for `{relation}`"
                    )));
                }
                if let (RelationTarget::Family(family), RelationEntry::Ref(id)) = (spec.target, target) {
                    if !targets.exists(family, id)? {
                        return Err(Rejected::DanglingReference {
                            family,
                            id: id.clone(),
                        });
                    }
                }
                let mut relations = prior.relations.clone();
                let list = relations.entry(spec.name.to_string()).or_default();
                if list.contains(target) {
                    return Err(Rejected::Duplicate {
                        relation: spec.name.to_string(),
                        target: target.to_string(),
                    });
                }
                list.push(target.clone());
                (prior.fields.clone(), relations)
            }
            Action::RemoveRelation { relation, target } => {
                let spec = schema
                    .relation(relation)
                    .ok_or_else(|| unsupported(ctx.family, relation))?;
                let prior = existing(prior, ctx)?;
                let mut relations = prior.relations.clone();
                let list = relations.entry(spec.name.to_string()).or_default();
                if list.is_empty() {
                    return Err(Rejected::EmptyRelation {
                        relation: spec.name.to_string(),
                    });
                }
                let Some(position) = list.iter().position(|entry| entry == target) else {
                    return Err(Rejected::NotPresent {
                        relation: spec.name.to_string(),
                        target: target.to_string(),
                    });
                };
                list.remove(position);
                (prior.fields.clone(), relations)
            }
        };

        Ok(StateRecord {
            family: ctx.family,
            id: ctx.id.clone(),
            fields,
            relations,
            prev_block: prior.map(|p| p.cur_block).unwrap_or(BlockRef::GENESIS),
            cur_block: ctx.cur_block,
            timestamp: ctx.timestamp,
        })
    }
}

type Content = (BTreeMap<String, String>, BTreeMap<String, Vec<RelationEntry>>);

fn create_fields(schema: &FamilySchema, supplied: &BTreeMap<String, String>) -> LedgerResult<Content> {
    if let Some(name) = supplied.keys().find(|name| !schema.is_field(name)) {
        return Err(unknown_field(schema.family, name));
    }
    for name in schema.required {
        let blank = supplied.get(*name).map_or(true, |v| v.trim().is_empty());
        if blank {
            return Err(Rejected::MissingField {
                field: (*name).to_string(),
            });
        }
    }
    let fields = schema
        .fields()
        .map(|name| {
            let value = supplied
                .get(name)
                .cloned()
                .unwrap_or_else(|| schema.default_for(name).to_string());
            (name.to_string(), value)
        })
        .collect();
    let relations = schema
        .relations
        .iter()
        .map(|spec| (spec.name.to_string(), Vec::new()))
        .collect();
    Ok((fields, relations))
}

/// A record's `cur_block` identifies the block holding its transaction, so a
/// new version must land strictly after the one it replaces.
fn check_block(prior: Option<&StateRecord>, cur_block: BlockRef) -> LedgerResult<()> {
    if cur_block.is_genesis() {
        return Err(Rejected::InvalidPayload("cur_block must not be \"0\"".into()));
    }
    if let Some(prior) = prior {
        if cur_block <= prior.cur_block {
            return Err(Rejected::InvalidPayload(format!(
                "cur_block {cur_block} does not advance past {}",
                prior.cur_block
            )));
        }
    }
    Ok(())
}

fn existing<'a>(prior: Option<&'a StateRecord>, ctx: &TransitionContext) -> LedgerResult<&'a StateRecord> {
    prior.ok_or_else(|| Rejected::NotFound {
        family: ctx.family,
        id: ctx.id.to_string(),
    })
}

fn unsupported(family: EntityFamily, action: &str) -> Rejected {
    Rejected::UnsupportedAction {
        family,
        action: action.to_string(),
    }
}

fn unknown_field(family: EntityFamily, name: &str) -> Rejected {
    Rejected::InvalidPayload(format!("{family} has no field `{name}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Patch;
    use crate::record::UriEntry;
    use proptest::prelude::*;
    use sparts_state::{InMemoryState, StateWriter};
    use sparts_types::ErrorKind;

    fn ts(n: u32) -> Timestamp {
        Timestamp::parse(&format!("2024-03-{:02} 12:00:00.000000", n.clamp(1, 28))).unwrap()
    }

    fn ctx(family: EntityFamily, id: &str, block: u64) -> TransitionContext {
        TransitionContext::new(family, EntityId::new(id).unwrap(), BlockRef::new(block), ts(block as u32))
    }

    fn targets() -> KnownTargets {
        KnownTargets::new()
            .with(EntityFamily::Artifact, "a1")
            .with(EntityFamily::Artifact, "a2")
            .with(EntityFamily::Category, "c1")
    }

    fn widget() -> StateRecord {
        TransitionEngine::apply(
            None,
            &Action::create([("name", "Widget")]),
            &ctx(EntityFamily::Part, "p1", 1),
            &targets(),
        )
        .unwrap()
    }

    fn kind(result: LedgerResult<StateRecord>) -> ErrorKind {
        result.unwrap_err().kind()
    }

    #[test]
    fn create_fills_schema_defaults() {
        let record = widget();
        assert_eq!(record.field("name"), Some("Widget"));
        assert_eq!(record.field("licensing"), Some(""));
        assert_eq!(record.prev_block, BlockRef::GENESIS);
        assert_eq!(record.cur_block, BlockRef::new(1));
        assert!(record.relation("artifact_list").is_empty());
        assert_eq!(record.relations.len(), 3);

        let user = TransitionEngine::apply(
            None,
            &Action::create([("user_name", "ann"), ("email_address", "ann@example.org")]),
            &ctx(EntityFamily::User, "02aa", 1),
            &targets(),
        )
        .unwrap();
        assert_eq!(user.field("authorized"), Some("deny"));
    }

    #[test]
    fn create_rejections() {
        let existing = widget();
        assert_eq!(
            kind(TransitionEngine::apply(
                Some(&existing),
                &Action::create([("name", "Again")]),
                &ctx(EntityFamily::Part, "p1", 2),
                &targets(),
            )),
            ErrorKind::AlreadyExists
        );
        assert_eq!(
            kind(TransitionEngine::apply(
                None,
                &Action::create([("name", "  ")]),
                &ctx(EntityFamily::Part, "p2", 2),
                &targets(),
            )),
            ErrorKind::MissingField
        );
        assert_eq!(
            kind(TransitionEngine::apply(
                None,
                &Action::create([("name", "x"), ("colour", "red")]),
                &ctx(EntityFamily::Part, "p2", 2),
                &targets(),
            )),
            ErrorKind::InvalidPayload
        );
    }

    #[test]
    fn amend_merges_and_keeps_relations() {
        let prior = widget();
        let prior = TransitionEngine::apply(
            Some(&prior),
            &Action::add("artifact_list", RelationEntry::reference("a1")),
            &ctx(EntityFamily::Part, "p1", 2),
            &targets(),
        )
        .unwrap();
        let amended = TransitionEngine::apply(
            Some(&prior),
            &Action::amend([("name", Patch::set("Gadget")), ("version", Patch::Unchanged)]),
            &ctx(EntityFamily::Part, "p1", 3),
            &targets(),
        )
        .unwrap();
        assert_eq!(amended.field("name"), Some("Gadget"));
        assert_eq!(amended.relation("artifact_list"), prior.relation("artifact_list"));
        assert_eq!(amended.prev_block, prior.cur_block);
    }

    #[test]
    fn amend_rejections() {
        assert_eq!(
            kind(TransitionEngine::apply(
                None,
                &Action::amend([("name", Patch::set("x"))]),
                &ctx(EntityFamily::Part, "p1", 2),
                &targets(),
            )),
            ErrorKind::NotFound
        );
        assert_eq!(
            kind(TransitionEngine::apply(
                Some(&widget()),
                &Action::amend([("name", Patch::set(""))]),
                &ctx(EntityFamily::Part, "p1", 2),
                &targets(),
            )),
            ErrorKind::MissingField
        );
        let user = TransitionEngine::apply(
            None,
            &Action::create([("user_name", "u"), ("email_address", "e")]),
            &ctx(EntityFamily::User, "02bb", 1),
            &targets(),
        )
        .unwrap();
        assert_eq!(
            kind(TransitionEngine::apply(
                Some(&user),
                &Action::amend([("role", Patch::set("admin"))]),
                &ctx(EntityFamily::User, "02bb", 2),
                &targets(),
            )),
            ErrorKind::UnsupportedAction
        );
    }

    #[test]
    fn relation_rejections() {
        let p1 = widget();
        let add = |id: &str| Action::add("artifact_list", RelationEntry::reference(id));
        let remove = |id: &str| Action::remove("artifact_list", RelationEntry::reference(id));

        assert_eq!(
            kind(TransitionEngine::apply(None, &add("a1"), &ctx(EntityFamily::Part, "p1", 2), &targets())),
            ErrorKind::NotFound
        );
        assert_eq!(
            kind(TransitionEngine::apply(Some(&p1), &add("ghost"), &ctx(EntityFamily::Part, "p1", 2), &targets())),
            ErrorKind::DanglingReference
        );
        assert_eq!(
            kind(TransitionEngine::apply(Some(&p1), &remove("a1"), &ctx(EntityFamily::Part, "p1", 2), &targets())),
            ErrorKind::EmptyRelation
        );

        let with_a1 =
            TransitionEngine::apply(Some(&p1), &add("a1"), &ctx(EntityFamily::Part, "p1", 2), &targets()).unwrap();
        assert_eq!(
            kind(TransitionEngine::apply(Some(&with_a1), &add("a1"), &ctx(EntityFamily::Part, "p1", 3), &targets())),
            ErrorKind::Duplicate
        );
        assert_eq!(
            kind(TransitionEngine::apply(Some(&with_a1), &remove("a2"), &ctx(EntityFamily::Part, "p1", 3), &targets())),
            ErrorKind::NotPresent
        );
        assert_eq!(
            kind(TransitionEngine::apply(
                Some(&with_a1),
                &Action::add("pt_list", RelationEntry::reference("a1")),
                &ctx(EntityFamily::Part, "p1", 3),
                &targets()
            )),
            ErrorKind::UnsupportedAction
        );
    }

    #[test]
    fn block_must_advance() {
        let p1 = widget();
        assert_eq!(
            kind(TransitionEngine::apply(
                Some(&p1),
                &Action::amend([("name", Patch::set("x"))]),
                &ctx(EntityFamily::Part, "p1", 1),
                &targets(),
            )),
            ErrorKind::InvalidPayload
        );
        assert_eq!(
            kind(TransitionEngine::apply(
                None,
                &Action::create([("name", "x")]),
                &ctx(EntityFamily::Part, "p9", 0),
                &targets(),
            )),
            ErrorKind::InvalidPayload
        );
    }

    #[test]
    fn uri_entries_need_no_target_entity() {
        let artifact = TransitionEngine::apply(
            None,
            &Action::create([("name", "tarball")]),
            &ctx(EntityFamily::Artifact, "a1", 1),
            &KnownTargets::new(),
        )
        .unwrap();
        let uri = RelationEntry::Uri(UriEntry {
            location: "https://example.org/a.tgz".into(),
            ..UriEntry::default()
        });
        let updated = TransitionEngine::apply(
            Some(&artifact),
            &Action::add("uri_list", uri.clone()),
            &ctx(EntityFamily::Artifact, "a1", 2),
            &KnownTargets::new(),
        )
        .unwrap();
        assert_eq!(updated.relation("uri_list"), &[uri]);

        assert_eq!(
            kind(TransitionEngine::apply(
                Some(&updated),
                &Action::add("uri_list", RelationEntry::reference("a2")),
                &ctx(EntityFamily::Artifact, "a1", 3),
                &KnownTargets::new(),
            )),
            ErrorKind::InvalidPayload
        );
    }

    #[test]
    fn state_reader_serves_as_target_lookup() {
        let state = InMemoryState::new();
        state
            .set(&LedgerAddress::derive(EntityFamily::Category, "c1"), b"{}".to_vec())
            .unwrap();
        assert!(state.exists(EntityFamily::Category, "c1").unwrap());
        assert!(!state.exists(EntityFamily::Category, "c2").unwrap());
        assert!(!state.exists(EntityFamily::Part, "c1").unwrap());
    }

    #[test]
    fn example_scenario() {
        let p1 = widget();
        assert_eq!(p1.field("name"), Some("Widget"));
        assert!(p1.relation("artifact_list").is_empty());
        assert_eq!(p1.prev_block, BlockRef::GENESIS);

        let amended = TransitionEngine::apply(
            Some(&p1),
            &Action::amend([("name", Patch::set("Gadget"))]),
            &ctx(EntityFamily::Part, "p1", 2),
            &targets(),
        )
        .unwrap();
        assert_eq!(amended.field("name"), Some("Gadget"));
        assert_eq!(amended.prev_block, p1.cur_block);

        let related = TransitionEngine::apply(
            Some(&amended),
            &Action::add("artifact_list", RelationEntry::reference("a1")),
            &ctx(EntityFamily::Part, "p1", 3),
            &targets(),
        )
        .unwrap();
        assert_eq!(related.relation("artifact_list"), &[RelationEntry::reference("a1")]);

        let again = TransitionEngine::apply(
            Some(&related),
            &Action::add("artifact_list", RelationEntry::reference("a1")),
            &ctx(EntityFamily::Part, "p1", 4),
            &targets(),
        );
        assert_eq!(kind(again), ErrorKind::Duplicate);

        let missing = TransitionEngine::apply(
            Some(&related),
            &Action::remove("artifact_list", RelationEntry::reference("a2")),
            &ctx(EntityFamily::Part, "p1", 4),
            &targets(),
        );
        assert_eq!(kind(missing), ErrorKind::NotPresent);
    }

    proptest! {
        #[test]
        fn apply_is_deterministic(name in "[A-Za-z0-9 ]{1,24}", label in ".{0,16}", block in 1u64..1000) {
            let action = Action::create([("name", name.clone()), ("label", label)]);
            let c = ctx(EntityFamily::Part, "p1", block);
            let a = TransitionEngine::apply(None, &action, &c, &targets());
            let b = TransitionEngine::apply(None, &action, &c, &targets());
            match (a, b) {
                (Ok(a), Ok(b)) => prop_assert_eq!(a.encode(), b.encode()),
                (Err(a), Err(b)) => prop_assert_eq!(a, b),
                _ => prop_assert!(false, "diverging outcomes"),
            }
        }

        #[test]
        fn unchanged_amend_keeps_content(fields in proptest::collection::btree_map(
            prop_oneof![Just("checksum"), Just("version"), Just("alias"), Just("label")],
            "[a-z0-9]{0,8}",
            0..4,
        )) {
            let mut supplied: Vec<(&str, String)> = fields.into_iter().collect();
            supplied.push(("name", "Widget".into()));
            let prior = TransitionEngine::apply(
                None,
                &Action::create(supplied),
                &ctx(EntityFamily::Part, "p1", 1),
                &targets(),
            ).unwrap();
            let patch = FamilySchema::of(EntityFamily::Part)
                .fields()
                .map(|f| (f, Patch::Unchanged));
            let amended = TransitionEngine::apply(
                Some(&prior),
                &Action::amend(patch),
                &ctx(EntityFamily::Part, "p1", 2),
                &targets(),
            ).unwrap();
            prop_assert!(amended.same_content(&prior));
            prop_assert_eq!(amended.prev_block, prior.cur_block);
        }

        #[test]
        fn add_then_remove_restores_relations(
            existing in proptest::collection::btree_set("[a-z]{1,3}", 0..5),
            extra in "[A-Z]{1,3}",
        ) {
            let mut lookup = targets();
            for id in existing.iter().chain(std::iter::once(&extra)) {
                lookup.insert(EntityFamily::Artifact, id);
            }
            let mut record = widget();
            let mut block = 1;
            for id in &existing {
                block += 1;
                record = TransitionEngine::apply(
                    Some(&record),
                    &Action::add("artifact_list", RelationEntry::reference(id.clone())),
                    &ctx(EntityFamily::Part, "p1", block),
                    &lookup,
                ).unwrap();
            }
            let before: BTreeSet<RelationEntry> = record.relation("artifact_list").iter().cloned().collect();
            let added = TransitionEngine::apply(
                Some(&record),
                &Action::add("artifact_list", RelationEntry::reference(extra.clone())),
                &ctx(EntityFamily::Part, "p1", block + 1),
                &lookup,
            ).unwrap();
            let removed = TransitionEngine::apply(
                Some(&added),
                &Action::remove("artifact_list", RelationEntry::reference(extra)),
                &ctx(EntityFamily::Part, "p1", block + 2),
                &lookup,
            ).unwrap();
            let after: BTreeSet<RelationEntry> = removed.relation("artifact_list").iter().cloned().collect();
            prop_assert_eq!(before, after);
        }
    }
}
