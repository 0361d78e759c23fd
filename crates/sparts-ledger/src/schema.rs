//! Per-family field and relation tables.
//!
//! One [`FamilySchema`] per [`EntityFamily`] drives the single transition
//! engine: which fields are required, which default to what, which relation
//! lists exist and which actions are accepted.

use sparts_types::EntityFamily;

/// What a relation list points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelationTarget {
    /// Ids of entities in another (or the same) family.
    Family(EntityFamily),
    /// Embedded URI records with no backing entity.
    Uri,
}

/// One relation list of a family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelationSpec {
    /// Key of the list in the stored record, e.g. `artifact_list`.
    pub name: &'static str,
    pub target: RelationTarget,
    /// Wire action adding an entry, e.g. `AddArtifact`.
    pub add_action: &'static str,
    /// Wire action removing an entry, e.g. `RemoveArtifact`.
    pub remove_action: &'static str,
}

/// Whether a relation action grows or shrinks its list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelationOp {
    Add,
    Remove,
}

/// Field schema and allowed actions of one family.
#[derive(Debug)]
pub struct FamilySchema {
    pub family: EntityFamily,
    /// Record key holding the entity id (`uuid`, or `public_key` for users).
    pub id_key: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
    /// Values for optional fields absent on create; anything not listed is `""`.
    pub defaults: &'static [(&'static str, &'static str)],
    pub relations: &'static [RelationSpec],
    /// Wire name of the create action (`create`, or `register` for users).
    pub create_action: &'static str,
    pub amendable: bool,
}

/// Wire name of the amend action.
pub const AMEND_ACTION: &str = "amend";

const ARTIFACT_LIST: RelationSpec = RelationSpec {
    name: "artifact_list",
    target: RelationTarget::Family(EntityFamily::Artifact),
    add_action: "AddArtifact",
    remove_action: "RemoveArtifact",
};

static ARTIFACT: FamilySchema = FamilySchema {
    family: EntityFamily::Artifact,
    id_key: "uuid",
    required: &["name"],
    optional: &["alias", "label", "checksum", "content_type", "openchain"],
    defaults: &[],
    relations: &[
        ARTIFACT_LIST,
        RelationSpec {
            name: "uri_list",
            target: RelationTarget::Uri,
            add_action: "AddURI",
            remove_action: "RemoveURI",
        },
    ],
    create_action: "create",
    amendable: true,
};

static CATEGORY: FamilySchema = FamilySchema {
    family: EntityFamily::Category,
    id_key: "uuid",
    required: &["name"],
    optional: &["description"],
    defaults: &[],
    relations: &[],
    create_action: "create",
    amendable: true,
};

static ORGANIZATION: FamilySchema = FamilySchema {
    family: EntityFamily::Organization,
    id_key: "uuid",
    required: &["name"],
    optional: &["alias", "type", "description", "url"],
    defaults: &[],
    relations: &[RelationSpec {
        name: "pt_list",
        target: RelationTarget::Family(EntityFamily::Part),
        add_action: "AddPart",
        remove_action: "RemovePart",
    }],
    create_action: "create",
    amendable: true,
};

static PART: FamilySchema = FamilySchema {
    family: EntityFamily::Part,
    id_key: "uuid",
    required: &["name"],
    optional: &["checksum", "version", "alias", "licensing", "label", "description"],
    defaults: &[],
    relations: &[
        ARTIFACT_LIST,
        RelationSpec {
            name: "category_list",
            target: RelationTarget::Family(EntityFamily::Category),
            add_action: "AddCategory",
            remove_action: "RemoveCategory",
        },
        RelationSpec {
            name: "organization_list",
            target: RelationTarget::Family(EntityFamily::Organization),
            add_action: "AddOrganization",
            remove_action: "RemoveOrganization",
        },
    ],
    create_action: "create",
    amendable: true,
};

static SUPPLIER: FamilySchema = FamilySchema {
    family: EntityFamily::Supplier,
    id_key: "uuid",
    required: &["name"],
    optional: &["short_id", "url"],
    defaults: &[],
    relations: &[RelationSpec {
        name: "part_list",
        target: RelationTarget::Family(EntityFamily::Part),
        add_action: "AddPart",
        remove_action: "RemovePart",
    }],
    create_action: "create",
    amendable: true,
};

static USER: FamilySchema = FamilySchema {
    family: EntityFamily::User,
    id_key: "public_key",
    required: &["user_name", "email_address"],
    optional: &["authorized", "role"],
    defaults: &[("authorized", "deny")],
    relations: &[],
    create_action: "register",
    amendable: false,
};

impl FamilySchema {
    /// Schema of `family`.
    pub fn of(family: EntityFamily) -> &'static FamilySchema {
        match family {
            EntityFamily::Artifact => &ARTIFACT,
            EntityFamily::Category => &CATEGORY,
            EntityFamily::Organization => &ORGANIZATION,
            EntityFamily::Part => &PART,
            EntityFamily::Supplier => &SUPPLIER,
            EntityFamily::User => &USER,
        }
    }

    /// All data fields (required first, then optional), in schema order.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.required.iter().chain(self.optional.iter()).copied()
    }

    pub fn is_field(&self, name: &str) -> bool {
        self.fields().any(|f| f == name)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.contains(&name)
    }

    /// Value stored for an optional field absent on create.
    pub fn default_for(&self, field: &str) -> &'static str {
        self.defaults
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| *value)
            .unwrap_or("")
    }

    pub fn relation(&self, name: &str) -> Option<&'static RelationSpec> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// The relation list pointing at `family`, if this family has one.
    pub fn relation_to(&self, family: EntityFamily) -> Option<&'static RelationSpec> {
        self.relations
            .iter()
            .find(|r| r.target == RelationTarget::Family(family))
    }

    /// Resolve a wire action name to the relation it changes.
    pub fn relation_action(&self, action: &str) -> Option<(&'static RelationSpec, RelationOp)> {
        self.relations.iter().find_map(|r| {
            if r.add_action == action {
                Some((r, RelationOp::Add))
            } else if r.remove_action == action {
                Some((r, RelationOp::Remove))
            } else {
                None
            }
        })
    }

    /// Keys a stored record of this family carries besides its data fields.
    pub fn is_reserved_key(&self, key: &str) -> bool {
        key == self.id_key
            || matches!(key, "prev_block" | "cur_block" | "timestamp")
            || self.relation(key).is_some()
    }
}
