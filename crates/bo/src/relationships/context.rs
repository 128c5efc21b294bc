//! Collaborators shared by the relationships of one unit of work

use std::sync::Arc;

use crate::error::{ConfigurationError, ModelResult};
use crate::loader::BusinessObjectLoader;
use crate::metadata::{Cardinality, RelationshipId};
use crate::object::{BusinessObject, ObjectManager};

#[derive(Clone)]
pub struct RelationshipContext {
    pub loader: Arc<dyn BusinessObjectLoader>,
    pub objects: Arc<ObjectManager>,
}

impl std::fmt::Debug for RelationshipContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationshipContext")
            .field("objects", &self.objects.len())
            .finish()
    }
}

impl RelationshipContext {
    pub fn new(loader: Arc<dyn BusinessObjectLoader>, objects: Arc<ObjectManager>) -> Self {
        Self { loader, objects }
    }

    pub(crate) fn find(
        &self,
        owner: &BusinessObject,
        name: &str,
        cardinality: Cardinality,
    ) -> ModelResult<RelationshipId> {
        let defs = owner.defs();
        let rel_id = defs.find_relationship(owner.class_id(), name).ok_or_else(|| {
            ConfigurationError::RelationshipNotFound {
                class: owner.class_name().to_string(),
                relationship: name.to_string(),
            }
        })?;
        if defs.relationship(rel_id).cardinality != cardinality {
            let expected = match cardinality {
                Cardinality::Single => "single",
                Cardinality::Multiple => "multiple",
            };
            return Err(ConfigurationError::WrongCardinality {
                relationship: name.to_string(),
                class: owner.class_name().to_string(),
                expected: expected.to_string(),
            }
            .into());
        }
        Ok(rel_id)
    }
}
