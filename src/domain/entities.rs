//! Domain entities: category records, procedures and their links

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a category record (short alphanumeric token).
pub type CategoryId = String;

/// Identifier of a procedure.
pub type ProcedureId = String;

/// District tag used to scope what non-admin viewers can see.
pub type District = String;

/// A node in the self-referencing category hierarchy, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: CategoryId,
    pub title: String,
    /// Parent category; `None` means root level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CategoryId>,
    /// Sibling ranking, higher sorts first
    #[serde(default)]
    pub importance: i64,
    #[serde(default = "default_true")]
    pub active: bool,
    /// UI hint only
    #[serde(default)]
    pub default_open: bool,
    /// Empty set means no district restriction
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub allowed_districts: BTreeSet<District>,
    /// Opaque display key, never interpreted here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

fn default_true() -> bool {
    true
}

impl CategoryRecord {
    /// Active root-level record with default attributes.
    pub fn new(id: impl Into<CategoryId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            parent_id: None,
            importance: 0,
            active: true,
            default_open: false,
            allowed_districts: BTreeSet::new(),
            icon: None,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<CategoryId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_importance(mut self, importance: i64) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_districts<I, S>(mut self, districts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<District>,
    {
        self.allowed_districts = districts.into_iter().map(Into::into).collect();
        self
    }

    /// True if the record names itself as parent.
    pub fn is_self_parented(&self) -> bool {
        self.parent_id.as_deref() == Some(self.id.as_str())
    }
}

impl fmt::Display for CategoryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.title, self.id)
    }
}

/// A knowledge-base procedure (the payload listed under categories).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Procedure {
    pub id: ProcedureId,
    pub title: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Procedure {
    pub fn new(id: impl Into<ProcedureId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.title, self.id)
    }
}

/// Many-to-many association between a procedure and a category.
///
/// Keyed by `(procedure_id, category_id)`. The `procedure` field is only
/// populated when the store was asked to hydrate links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureLink {
    pub procedure_id: ProcedureId,
    pub category_id: CategoryId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure: Option<Procedure>,
}

impl ProcedureLink {
    pub fn new(procedure_id: impl Into<ProcedureId>, category_id: impl Into<CategoryId>) -> Self {
        Self {
            procedure_id: procedure_id.into(),
            category_id: category_id.into(),
            procedure: None,
        }
    }

    pub fn hydrated(procedure: Procedure, category_id: impl Into<CategoryId>) -> Self {
        Self {
            procedure_id: procedure.id.clone(),
            category_id: category_id.into(),
            procedure: Some(procedure),
        }
    }

    /// Hydrated procedure, if present and active.
    pub fn active_procedure(&self) -> Option<&Procedure> {
        self.procedure.as_ref().filter(|p| p.active)
    }
}

/// Who is looking at the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    /// Sees inactive and district-restricted categories
    Admin,
    /// Sees active categories open to one of the given districts
    Member { districts: BTreeSet<District> },
}

impl Default for Viewer {
    fn default() -> Self {
        Viewer::Member {
            districts: BTreeSet::new(),
        }
    }
}

impl Viewer {
    pub fn member<I, S>(districts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<District>,
    {
        Viewer::Member {
            districts: districts.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Viewer::Admin)
    }

    /// Visibility of a single record, ignoring its ancestors.
    pub fn can_see(&self, record: &CategoryRecord) -> bool {
        match self {
            Viewer::Admin => true,
            Viewer::Member { districts } => {
                record.active
                    && (record.allowed_districts.is_empty()
                        || !record.allowed_districts.is_disjoint(districts))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_record_pointing_at_itself_when_checking_then_is_self_parented() {
        let record = CategoryRecord::new("X", "x").with_parent("X");
        assert!(record.is_self_parented());
        assert!(!CategoryRecord::new("Y", "y").with_parent("X").is_self_parented());
    }

    #[test]
    fn given_toml_without_optional_fields_when_deserializing_then_uses_defaults() {
        let record: CategoryRecord = toml::from_str("id = \"A\"\ntitle = \"Alpha\"\n").unwrap();
        assert!(record.active);
        assert_eq!(record.importance, 0);
        assert!(record.parent_id.is_none());
        assert!(record.allowed_districts.is_empty());
    }

    #[test]
    fn given_member_without_matching_district_when_checking_then_hidden() {
        let record = CategoryRecord::new("A", "a").with_districts(["north"]);
        assert!(!Viewer::member(["south"]).can_see(&record));
        assert!(Viewer::member(["south", "north"]).can_see(&record));
        assert!(Viewer::Admin.can_see(&record));
        assert!(!Viewer::default().can_see(&record));
    }

    #[test]
    fn given_inactive_record_when_checking_then_only_admin_sees_it() {
        let record = CategoryRecord::new("A", "a").with_active(false);
        assert!(Viewer::Admin.can_see(&record));
        assert!(!Viewer::member(["north"]).can_see(&record));
    }

    #[test]
    fn given_link_with_inactive_procedure_when_asking_active_then_none() {
        let link = ProcedureLink::hydrated(Procedure::new("P1", "p").inactive(), "A");
        assert!(link.active_procedure().is_none());
        assert!(ProcedureLink::new("P1", "A").active_procedure().is_none());
    }
}
