//! Multiple relationships - an owner related to a collection

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::context::RelationshipContext;
use super::events::{ObserverRegistry, RelationshipEvent};
use super::rel_key::RelKey;
use crate::error::{ConfigurationError, ModelResult};
use crate::metadata::{Cardinality, ClassId, RelationshipDef, RelationshipId};
use crate::object::{BoRef, BusinessObjectCollection};
use crate::query::Criteria;

#[derive(Debug)]
pub struct MultipleRelationship {
    owner: BoRef,
    rel_id: RelationshipId,
    rel_key: RelKey,
    ctx: RelationshipContext,
    collection: Option<BusinessObjectCollection>,
    observers: ObserverRegistry,
}

impl MultipleRelationship {
    pub fn new(owner: BoRef, name: &str, ctx: RelationshipContext) -> ModelResult<Self> {
        let rel_id = ctx.find(&owner, name, Cardinality::Multiple)?;
        Ok(Self::with_id(owner, rel_id, ctx))
    }

    pub(crate) fn with_id(owner: BoRef, rel_id: RelationshipId, ctx: RelationshipContext) -> Self {
        let rel_key = RelKey::from_owner(&owner.defs().relationship(rel_id).rel_key, &owner);
        Self {
            owner,
            rel_id,
            rel_key,
            ctx,
            collection: None,
            observers: ObserverRegistry::new(),
        }
    }

    pub fn def(&self) -> &RelationshipDef {
        self.owner.defs().relationship(self.rel_id)
    }

    pub fn name(&self) -> &str {
        &self.def().name
    }

    pub fn owner(&self) -> &BoRef {
        &self.owner
    }

    pub fn observers_mut(&mut self) -> &mut ObserverRegistry {
        &mut self.observers
    }

    /// Related objects of the declared class
    pub async fn get_related_collection(&mut self) -> ModelResult<BusinessObjectCollection> {
        let related_class = self.owner.defs().related_class_of(self.rel_id);
        self.load_collection(related_class).await
    }

    /// Related objects of a named class, which must be the declared class
    /// or a concrete subclass of it
    pub async fn get_related_collection_of(
        &mut self,
        class_name: &str,
    ) -> ModelResult<BusinessObjectCollection> {
        let defs = Arc::clone(self.owner.defs());
        let declared = defs.related_class_of(self.rel_id);

        let requested = defs
            .find_by_name(class_name)
            .ok_or_else(|| ConfigurationError::UnknownType {
                type_name: class_name.to_string(),
                cause: "no class definition is registered under this name".to_string(),
            })?;
        if !defs.is_same_or_subclass(requested, declared) {
            return Err(ConfigurationError::InvalidCollectionType {
                relationship: self.name().to_string(),
                class: self.owner.class_name().to_string(),
                requested: class_name.to_string(),
                declared: defs.class_def(declared).class_name.clone(),
            }
            .into());
        }
        if defs.class_def(requested).is_abstract {
            return Err(ConfigurationError::UnknownType {
                type_name: class_name.to_string(),
                cause: "the class is abstract and cannot be instantiated".to_string(),
            }
            .into());
        }
        self.load_collection(requested).await
    }

    async fn load_collection(&mut self, class_id: ClassId) -> ModelResult<BusinessObjectCollection> {
        self.rel_key.refresh(&self.owner);
        let criteria = self.rel_key.related_criteria();
        let loaded = self.fetch(class_id, &criteria).await?;

        if !self.def().keep_reference {
            return Ok(BusinessObjectCollection::new(class_id, criteria).with_items(loaded));
        }

        let mut items = loaded;
        if let Some(cached) = self.collection.as_ref().filter(|c| c.class_id() == class_id) {
            // unsaved members are not in the store yet
            let pending = cached
                .iter()
                .filter(|bo| bo.is_new() && criteria.matches(&bo.values()))
                .filter(|bo| !items.iter().any(|item| Arc::ptr_eq(item, bo)))
                .cloned()
                .collect::<Vec<_>>();
            items.extend(pending);
        }

        let collection = BusinessObjectCollection::new(class_id, criteria).with_items(items);
        self.collection = Some(collection.clone());
        Ok(collection)
    }

    /// Loads matching objects and keeps only those whose resident values
    /// still point at this owner
    async fn fetch(&self, class_id: ClassId, criteria: &Criteria) -> ModelResult<Vec<BoRef>> {
        if self.rel_key.has_null() {
            return Ok(Vec::new());
        }
        let defs = Arc::clone(self.owner.defs());
        let loaded = self
            .ctx
            .loader
            .load_collection(&defs, class_id, criteria, &self.def().order_by)
            .await?;

        let items: Vec<BoRef> = loaded
            .into_iter()
            .map(|bo| self.ctx.objects.register(bo))
            .filter(|bo| criteria.matches(&bo.values()))
            .collect();
        debug!(
            "Loaded {} {} object(s) for {}.{}",
            items.len(),
            defs.class_def(class_id).class_name,
            self.owner.class_name(),
            self.name()
        );
        Ok(items)
    }

    /// Points `related` at the owner and adds it to the cached collection
    pub async fn add_related(&mut self, related: BoRef) -> ModelResult<()> {
        self.check_related_type(&related)?;
        self.rel_key.refresh(&self.owner);
        for prop in self.rel_key.iter() {
            related.set_value(&prop.related_property, prop.value.clone())?;
        }
        if let Some(collection) = &mut self.collection {
            collection.push(Arc::clone(&related));
        }

        let event = RelationshipEvent::Added {
            relationship: self.name().to_string(),
            related,
        };
        self.observers.trigger(&self.owner, &event).await;
        Ok(())
    }

    /// Clears the foreign key of `related` and drops it from the cached collection
    pub async fn remove_related(&mut self, related: &BoRef) -> ModelResult<()> {
        self.check_related_type(related)?;
        for prop in self.rel_key.iter() {
            related.set_value(&prop.related_property, Value::Null)?;
        }
        if let Some(collection) = &mut self.collection {
            collection.remove(related);
        }

        let event = RelationshipEvent::Removed {
            relationship: self.name().to_string(),
            related: Arc::clone(related),
        };
        self.observers.trigger(&self.owner, &event).await;
        Ok(())
    }

    fn check_related_type(&self, related: &BoRef) -> ModelResult<()> {
        let defs = self.owner.defs();
        let declared = defs.related_class_of(self.rel_id);
        if defs.is_same_or_subclass(related.class_id(), declared) {
            return Ok(());
        }
        Err(ConfigurationError::WrongRelatedType {
            relationship: self.name().to_string(),
            class: self.owner.class_name().to_string(),
            expected: defs.class_def(declared).class_name.clone(),
            actual: related.class_name().to_string(),
        }
        .into())
    }
}
