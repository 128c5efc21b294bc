//! Relationship definitions - how one class links to another

use serde::{Deserialize, Serialize};

use super::class::{ClassId, ClassRef, RelationshipId};

/// Whether a relationship leads to one object or a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    Single,
    Multiple,
}

impl Cardinality {
    pub fn is_multiple(self) -> bool {
        matches!(self, Self::Multiple)
    }
}

/// What deleting the owner does to related objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeleteParentAction {
    /// Refuse to delete while related objects exist
    #[default]
    Prevent,
    DeleteRelated,
    /// Null out the related objects' foreign keys
    DereferenceRelated,
    DoNothing,
}

/// One owner/related property pair of a relationship key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelPropDef {
    pub owner_property: String,
    pub related_property: String,
}

impl RelPropDef {
    pub fn new(owner_property: impl Into<String>, related_property: impl Into<String>) -> Self {
        Self {
            owner_property: owner_property.into(),
            related_property: related_property.into(),
        }
    }
}

/// Ordered pairs linking owner properties to related properties
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelKeyDef {
    props: Vec<RelPropDef>,
}

impl RelKeyDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-pair key
    pub fn single(owner_property: &str, related_property: &str) -> Self {
        Self::new().with(owner_property, related_property)
    }

    pub fn with(mut self, owner_property: &str, related_property: &str) -> Self {
        self.props.push(RelPropDef::new(owner_property, related_property));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelPropDef> {
        self.props.iter()
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn owner_property_names(&self) -> Vec<&str> {
        self.props.iter().map(|p| p.owner_property.as_str()).collect()
    }

    pub fn related_property_names(&self) -> Vec<&str> {
        self.props.iter().map(|p| p.related_property.as_str()).collect()
    }

    /// True when `other` holds exactly the swapped pairs of this key
    pub fn is_mirror_of(&self, other: &RelKeyDef) -> bool {
        let mut swapped: Vec<(&str, &str)> = self
            .props
            .iter()
            .map(|p| (p.related_property.as_str(), p.owner_property.as_str()))
            .collect();
        let mut theirs: Vec<(&str, &str)> = other
            .props
            .iter()
            .map(|p| (p.owner_property.as_str(), p.related_property.as_str()))
            .collect();
        swapped.sort_unstable();
        theirs.sort_unstable();
        swapped == theirs
    }
}

/// A named relationship from the owning class to a related class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDef {
    pub name: String,
    pub related_class: ClassRef,
    pub rel_key: RelKeyDef,
    pub cardinality: Cardinality,

    /// The owning object physically stores the foreign key
    pub owning_bo_has_foreign_key: bool,

    /// The owning object's primary key is the relationship key (set by validation)
    #[serde(default)]
    pub owning_bo_has_primary_key: bool,

    #[serde(default)]
    pub reverse_relationship_name: Option<String>,

    /// Cache the related object or collection between reads
    #[serde(default)]
    pub keep_reference: bool,

    #[serde(default)]
    pub delete_parent_action: DeleteParentAction,

    /// Properties ordering a loaded collection
    #[serde(default)]
    pub order_by: Vec<String>,

    #[serde(skip)]
    pub(crate) related_class_id: Option<ClassId>,

    #[serde(skip)]
    pub(crate) reverse: Option<RelationshipId>,
}

impl RelationshipDef {
    fn new(name: &str, related_class: ClassRef, rel_key: RelKeyDef, cardinality: Cardinality) -> Self {
        Self {
            name: name.to_string(),
            related_class,
            rel_key,
            cardinality,
            owning_bo_has_foreign_key: cardinality == Cardinality::Single,
            owning_bo_has_primary_key: false,
            reverse_relationship_name: None,
            keep_reference: true,
            delete_parent_action: DeleteParentAction::default(),
            order_by: Vec::new(),
            related_class_id: None,
            reverse: None,
        }
    }

    /// Single relationship; the owner holds the foreign key unless told otherwise
    pub fn single(name: &str, related_class: ClassRef, rel_key: RelKeyDef) -> Self {
        Self::new(name, related_class, rel_key, Cardinality::Single)
    }

    /// Multiple relationship; the related objects hold the foreign key
    pub fn multiple(name: &str, related_class: ClassRef, rel_key: RelKeyDef) -> Self {
        Self::new(name, related_class, rel_key, Cardinality::Multiple)
    }

    pub fn with_reverse(mut self, reverse_relationship_name: &str) -> Self {
        self.reverse_relationship_name = Some(reverse_relationship_name.to_string());
        self
    }

    pub fn with_owning_bo_has_foreign_key(mut self, owns: bool) -> Self {
        self.owning_bo_has_foreign_key = owns;
        self
    }

    pub fn with_keep_reference(mut self, keep_reference: bool) -> Self {
        self.keep_reference = keep_reference;
        self
    }

    pub fn with_delete_parent_action(mut self, action: DeleteParentAction) -> Self {
        self.delete_parent_action = action;
        self
    }

    pub fn with_order_by(mut self, properties: &[&str]) -> Self {
        self.order_by = properties.iter().map(|p| (*p).to_string()).collect();
        self
    }

    /// Related class, resolved by validation
    pub fn related_class_id(&self) -> Option<ClassId> {
        self.related_class_id
    }

    /// Reverse relationship, resolved by validation
    pub fn reverse_relationship(&self) -> Option<RelationshipId> {
        self.reverse
    }

    pub fn is_multiple(&self) -> bool {
        self.cardinality.is_multiple()
    }
}
