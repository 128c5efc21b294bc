//! Class definitions and the collection they are registered in
//!
//! Superclasses are referenced by name in the loaded metadata and resolved to
//! a [`ClassId`] by validation; all lookups that walk the inheritance chain go
//! through repeated index lookups on [`ClassDefCol`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::key::{KeyDef, PrimaryKeyDef};
use super::property::{PropDef, PropDefCol};
use super::relationship::RelationshipDef;
use crate::error::{ConfigurationError, ModelResult};

/// Index of a class within its [`ClassDefCol`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub(crate) usize);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A relationship definition: owning class plus position in its relationship list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipId {
    pub class: ClassId,
    pub(crate) index: usize,
}

/// Name-based reference to a class, as written in metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassRef {
    pub assembly_name: String,
    pub class_name: String,
}

impl ClassRef {
    pub fn new(assembly_name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            assembly_name: assembly_name.into(),
            class_name: class_name.into(),
        }
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.assembly_name, self.class_name)
    }
}

/// Definition of one business-object class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    pub assembly_name: String,
    pub class_name: String,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub props: PropDefCol,
    #[serde(default)]
    pub primary_key: Option<PrimaryKeyDef>,
    #[serde(default)]
    pub keys: Vec<KeyDef>,
    #[serde(default)]
    pub relationships: Vec<RelationshipDef>,
    #[serde(default)]
    pub superclass: Option<ClassRef>,
    #[serde(skip)]
    pub(crate) superclass_id: Option<ClassId>,
}

impl ClassDef {
    pub fn new(assembly_name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            assembly_name: assembly_name.into(),
            class_name: class_name.into(),
            table_name: None,
            is_abstract: false,
            props: PropDefCol::new(),
            primary_key: None,
            keys: Vec::new(),
            relationships: Vec::new(),
            superclass: None,
            superclass_id: None,
        }
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn with_prop(mut self, prop: PropDef) -> Self {
        self.props.add(prop);
        self
    }

    pub fn with_primary_key(mut self, primary_key: PrimaryKeyDef) -> Self {
        self.primary_key = Some(primary_key);
        self
    }

    pub fn with_key(mut self, key: KeyDef) -> Self {
        self.keys.push(key);
        self
    }

    pub fn with_relationship(mut self, relationship: RelationshipDef) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn with_superclass(mut self, superclass: ClassRef) -> Self {
        self.superclass = Some(superclass);
        self
    }

    pub fn class_ref(&self) -> ClassRef {
        ClassRef::new(&self.assembly_name, &self.class_name)
    }

    /// Table the class persists to, defaulting to the class name
    pub fn table_name(&self) -> &str {
        self.table_name.as_deref().unwrap_or(&self.class_name)
    }

    /// Superclass, resolved by validation
    pub fn superclass_id(&self) -> Option<ClassId> {
        self.superclass_id
    }

    /// Own relationship by name (inherited ones are found through the collection)
    pub fn relationship(&self, name: &str) -> Option<&RelationshipDef> {
        self.relationships.iter().find(|r| r.name == name)
    }
}

/// All class definitions of an application, indexed by assembly and class name
#[derive(Debug, Clone, Default)]
pub struct ClassDefCol {
    classes: Vec<ClassDef>,
    index: HashMap<ClassRef, ClassId>,
}

impl ClassDefCol {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class; the same assembly/class name may only appear once
    pub fn add(&mut self, class_def: ClassDef) -> ModelResult<ClassId> {
        let class_ref = class_def.class_ref();
        if self.index.contains_key(&class_ref) {
            return Err(ConfigurationError::DuplicateClass {
                class: class_def.class_name,
            }
            .into());
        }
        let id = ClassId(self.classes.len());
        self.classes.push(class_def);
        self.index.insert(class_ref, id);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ClassId> {
        (0..self.classes.len()).map(ClassId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClassId, &ClassDef)> {
        self.classes.iter().enumerate().map(|(i, c)| (ClassId(i), c))
    }

    /// Panics on an id from another collection; ids are only minted by `add`.
    pub fn class_def(&self, id: ClassId) -> &ClassDef {
        &self.classes[id.0]
    }

    pub(crate) fn class_def_mut(&mut self, id: ClassId) -> &mut ClassDef {
        &mut self.classes[id.0]
    }

    pub fn find(&self, class_ref: &ClassRef) -> Option<ClassId> {
        self.index.get(class_ref).copied()
    }

    /// First class registered under this class name, in any assembly
    pub fn find_by_name(&self, class_name: &str) -> Option<ClassId> {
        self.iter()
            .find(|(_, c)| c.class_name == class_name)
            .map(|(id, _)| id)
    }

    /// The class followed by its resolved ancestors, nearest first.
    ///
    /// Stops after visiting every class once, so a cycle cannot loop forever.
    pub fn lineage(&self, id: ClassId) -> Vec<ClassId> {
        let mut lineage = vec![id];
        let mut current = self.class_def(id).superclass_id;
        while let Some(parent) = current {
            if lineage.contains(&parent) || lineage.len() > self.classes.len() {
                break;
            }
            lineage.push(parent);
            current = self.class_def(parent).superclass_id;
        }
        lineage
    }

    pub fn is_same_or_subclass(&self, class: ClassId, ancestor: ClassId) -> bool {
        self.lineage(class).contains(&ancestor)
    }

    /// Finds a property on the class or the nearest ancestor defining it
    pub fn find_property(&self, id: ClassId, name: &str) -> Option<&Arc<PropDef>> {
        self.lineage(id)
            .into_iter()
            .find_map(|class| self.class_def(class).props.get(name))
    }

    /// The class in the lineage that owns the named property
    pub fn find_property_owner(&self, id: ClassId, name: &str) -> Option<ClassId> {
        self.lineage(id)
            .into_iter()
            .find(|class| self.class_def(*class).props.contains(name))
    }

    /// All properties visible on a class: own first, then inherited
    pub fn all_properties(&self, id: ClassId) -> Vec<&Arc<PropDef>> {
        let mut props: Vec<&Arc<PropDef>> = Vec::new();
        for class in self.lineage(id) {
            for prop in self.class_def(class).props.iter() {
                if !props.iter().any(|p| p.name == prop.name) {
                    props.push(prop);
                }
            }
        }
        props
    }

    /// Own primary key, or the nearest ancestor's
    pub fn primary_key_of(&self, id: ClassId) -> Option<&PrimaryKeyDef> {
        self.lineage(id)
            .into_iter()
            .find_map(|class| self.class_def(class).primary_key.as_ref())
    }

    pub fn relationship(&self, id: RelationshipId) -> &RelationshipDef {
        &self.class_def(id.class).relationships[id.index]
    }

    /// Finds a relationship on the class or the nearest ancestor defining it
    pub fn find_relationship(&self, id: ClassId, name: &str) -> Option<RelationshipId> {
        self.lineage(id).into_iter().find_map(|class| {
            self.class_def(class)
                .relationships
                .iter()
                .position(|r| r.name == name)
                .map(|index| RelationshipId { class, index })
        })
    }

    /// Own relationships followed by inherited ones not overridden by name
    pub fn relationships_of(&self, id: ClassId) -> Vec<RelationshipId> {
        let mut ids: Vec<RelationshipId> = Vec::new();
        for class in self.lineage(id) {
            for (index, rel) in self.class_def(class).relationships.iter().enumerate() {
                if !ids.iter().any(|existing| self.relationship(*existing).name == rel.name) {
                    ids.push(RelationshipId { class, index });
                }
            }
        }
        ids
    }

    pub fn relationship_count(&self) -> usize {
        self.classes.iter().map(|c| c.relationships.len()).sum()
    }
}
