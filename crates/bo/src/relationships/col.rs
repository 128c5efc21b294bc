//! The relationships of one business object

use super::context::RelationshipContext;
use super::multiple::MultipleRelationship;
use super::single::SingleRelationship;
use crate::error::{ConfigurationError, ModelResult};
use crate::metadata::Cardinality;
use crate::object::BoRef;

#[derive(Debug)]
pub enum Relationship {
    Single(SingleRelationship),
    Multiple(MultipleRelationship),
}

impl Relationship {
    pub fn name(&self) -> &str {
        match self {
            Relationship::Single(rel) => rel.name(),
            Relationship::Multiple(rel) => rel.name(),
        }
    }
}

/// One relationship instance per relationship visible on the owner's class,
/// inherited ones included
#[derive(Debug)]
pub struct RelationshipCol {
    owner: BoRef,
    relationships: Vec<Relationship>,
}

impl RelationshipCol {
    pub fn for_object(owner: &BoRef, ctx: &RelationshipContext) -> Self {
        let defs = owner.defs();
        let relationships = defs
            .relationships_of(owner.class_id())
            .into_iter()
            .map(|rel_id| match defs.relationship(rel_id).cardinality {
                Cardinality::Single => Relationship::Single(SingleRelationship::with_id(
                    owner.clone(),
                    rel_id,
                    ctx.clone(),
                )),
                Cardinality::Multiple => Relationship::Multiple(MultipleRelationship::with_id(
                    owner.clone(),
                    rel_id,
                    ctx.clone(),
                )),
            })
            .collect();
        Self {
            owner: owner.clone(),
            relationships,
        }
    }

    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.relationships.iter().map(Relationship::name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter()
    }

    pub fn get_mut(&mut self, name: &str) -> ModelResult<&mut Relationship> {
        let class = self.owner.class_name().to_string();
        self.relationships
            .iter_mut()
            .find(|rel| rel.name() == name)
            .ok_or_else(|| {
                ConfigurationError::RelationshipNotFound {
                    class,
                    relationship: name.to_string(),
                }
                .into()
            })
    }

    pub fn single(&mut self, name: &str) -> ModelResult<&mut SingleRelationship> {
        let class = self.owner.class_name().to_string();
        match self.get_mut(name)? {
            Relationship::Single(rel) => Ok(rel),
            Relationship::Multiple(_) => Err(wrong_cardinality(class, name, "single")),
        }
    }

    pub fn multiple(&mut self, name: &str) -> ModelResult<&mut MultipleRelationship> {
        let class = self.owner.class_name().to_string();
        match self.get_mut(name)? {
            Relationship::Multiple(rel) => Ok(rel),
            Relationship::Single(_) => Err(wrong_cardinality(class, name, "multiple")),
        }
    }

    /// Single relationships with a detached object awaiting persistence
    pub fn removed(&self) -> Vec<&SingleRelationship> {
        self.relationships
            .iter()
            .filter_map(|rel| match rel {
                Relationship::Single(single) if single.is_removed() => Some(single),
                _ => None,
            })
            .collect()
    }

    pub fn mark_persisted(&mut self) {
        for rel in &mut self.relationships {
            if let Relationship::Single(single) = rel {
                single.mark_persisted();
            }
        }
    }
}

fn wrong_cardinality(class: String, name: &str, expected: &str) -> crate::error::ModelError {
    ConfigurationError::WrongCardinality {
        relationship: name.to_string(),
        class,
        expected: expected.to_string(),
    }
    .into()
}
