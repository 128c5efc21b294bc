//! Builds query sources from validated class metadata

use super::source::{Join, Source};
use super::types::{JoinKind, QueryField};
use crate::error::{ConfigurationError, ModelResult};
use crate::metadata::{ClassId, ValidatedClassDefs};

/// Derives [`Source`] graphs from class inheritance and relationship paths
pub struct SourceBuilder<'a> {
    defs: &'a ValidatedClassDefs,
}

impl<'a> SourceBuilder<'a> {
    pub fn new(defs: &'a ValidatedClassDefs) -> Self {
        Self { defs }
    }

    /// Source for a class, with inner inheritance joins up to its root ancestor
    pub fn for_class(&self, class_id: ClassId) -> Source {
        let name = self.defs.class_def(class_id).class_name.clone();
        self.named_class_source(&name, &self.defs.lineage(class_id))
    }

    /// Source for `class_id` joined along a dotted relationship path,
    /// e.g. `"Customer.Region"`
    pub fn for_relationship_path(&self, class_id: ClassId, path: &str) -> ModelResult<Source> {
        let names: Vec<&str> = path.split('.').filter(|part| !part.is_empty()).collect();
        let root_name = self.defs.class_def(class_id).class_name.clone();
        self.path_source(&root_name, class_id, &names)
    }

    fn path_source(&self, name: &str, class_id: ClassId, path: &[&str]) -> ModelResult<Source> {
        let mut source = self.named_class_source(name, &self.defs.lineage(class_id));
        let Some((first, rest)) = path.split_first() else {
            return Ok(source);
        };

        let rel_id = self.defs.find_relationship(class_id, first).ok_or_else(|| {
            ConfigurationError::RelationshipNotFound {
                class: self.defs.class_def(class_id).class_name.clone(),
                relationship: (*first).to_string(),
            }
        })?;
        let related_id = self.defs.related_class_of(rel_id);
        let child = self.path_source(first, related_id, rest)?;

        let rel = self.defs.relationship(rel_id);
        if let Some(join) = source.join_to(child, JoinKind::LeftOuter) {
            for prop in rel.rel_key.iter() {
                let from = self.field(class_id, &prop.owner_property, name);
                let to = self.field(related_id, &prop.related_property, first);
                join.add_field(from, to);
            }
        }
        Ok(source)
    }

    /// `lineage[0]` named `name`, inheriting from the rest of the lineage
    fn named_class_source(&self, name: &str, lineage: &[ClassId]) -> Source {
        let class_def = self.defs.class_def(lineage[0]);
        let mut source = Source::new(name, class_def.table_name());

        if let Some((parent, _)) = lineage[1..].split_first() {
            let parent_name = self.defs.class_def(*parent).class_name.clone();
            let parent_source = self.named_class_source(&parent_name, &lineage[1..]);
            if let Some(join) = source.inherit_from(parent_source, JoinKind::Inner) {
                self.add_primary_key_fields(join, lineage[0], *parent, name, &parent_name);
            }
        }
        source.set_prepared(true);
        source
    }

    fn add_primary_key_fields(
        &self,
        join: &mut Join,
        child: ClassId,
        parent: ClassId,
        child_name: &str,
        parent_name: &str,
    ) {
        let Some(pk) = self.defs.primary_key_of(parent) else {
            return;
        };
        for property in pk.property_names() {
            let from = self.field(child, property, child_name);
            let to = self.field(parent, property, parent_name);
            join.add_field(from, to);
        }
    }

    fn field(&self, class_id: ClassId, property: &str, source_name: &str) -> QueryField {
        let field_name = self
            .defs
            .find_property(class_id, property)
            .map(|prop| prop.field_name().to_string())
            .unwrap_or_else(|| property.to_string());
        QueryField::new(property)
            .with_field_name(field_name)
            .with_source(source_name)
    }
}
