//! Single relationships - an owner related to at most one object

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::context::RelationshipContext;
use super::events::{ObserverRegistry, RelationshipEvent};
use super::rel_key::RelKey;
use crate::error::{ConfigurationError, ModelResult};
use crate::metadata::{Cardinality, RelationshipDef, RelationshipId};
use crate::object::{BoRef, PrimaryKeyValue};

#[derive(Debug)]
pub struct SingleRelationship {
    owner: BoRef,
    rel_id: RelationshipId,
    rel_key: RelKey,
    ctx: RelationshipContext,
    related: Option<BoRef>,
    loaded_key: Option<RelKey>,
    removed: Option<BoRef>,
    observers: ObserverRegistry,
}

impl SingleRelationship {
    pub fn new(owner: BoRef, name: &str, ctx: RelationshipContext) -> ModelResult<Self> {
        let rel_id = ctx.find(&owner, name, Cardinality::Single)?;
        Ok(Self::with_id(owner, rel_id, ctx))
    }

    pub(crate) fn with_id(owner: BoRef, rel_id: RelationshipId, ctx: RelationshipContext) -> Self {
        let rel_key = RelKey::from_owner(&owner.defs().relationship(rel_id).rel_key, &owner);
        Self {
            owner,
            rel_id,
            rel_key,
            ctx,
            related: None,
            loaded_key: None,
            removed: None,
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

    pub fn rel_key(&self) -> &RelKey {
        &self.rel_key
    }

    pub fn observers_mut(&mut self) -> &mut ObserverRegistry {
        &mut self.observers
    }

    /// The related object, or `None` when the key is empty or matches nothing
    pub async fn get_related_object(&mut self) -> ModelResult<Option<BoRef>> {
        self.rel_key.refresh(&self.owner);
        if self.def().keep_reference && self.loaded_key.as_ref() == Some(&self.rel_key) {
            return Ok(self.related.clone());
        }

        let found = if self.rel_key.has_null() {
            None
        } else {
            self.load_related().await?
        };

        self.related = found.clone();
        self.loaded_key = Some(self.rel_key.clone());
        Ok(found)
    }

    async fn load_related(&self) -> ModelResult<Option<BoRef>> {
        let defs = Arc::clone(self.owner.defs());
        let related_class = defs.related_class_of(self.rel_id);
        let def = self.def();

        let found = match self.related_primary_key() {
            Some(key) if def.owning_bo_has_foreign_key => {
                match self.ctx.objects.find(&defs, related_class, &key) {
                    Some(resident) => Some(resident),
                    None => {
                        self.ctx
                            .loader
                            .load_by_primary_key(&defs, related_class, &key)
                            .await?
                    }
                }
            }
            _ => {
                let criteria = self.rel_key.related_criteria();
                self.ctx
                    .loader
                    .load_one(&defs, related_class, &criteria)
                    .await?
            }
        };

        debug!(
            "Resolved {}.{} -> {}",
            self.owner.class_name(),
            def.name,
            if found.is_some() { "object" } else { "none" }
        );
        Ok(found.map(|bo| self.ctx.objects.register(bo)))
    }

    /// The key as a primary key of the related class, when the related side
    /// of the relationship key is exactly that primary key
    fn related_primary_key(&self) -> Option<PrimaryKeyValue> {
        let defs = self.owner.defs();
        let pk = defs.primary_key_of(defs.related_class_of(self.rel_id))?;
        let names = pk.property_names();
        if names.len() != self.rel_key.iter().count() {
            return None;
        }
        let members = names
            .into_iter()
            .map(|name| {
                self.rel_key
                    .iter()
                    .find(|prop| prop.related_property == name)
                    .map(|prop| (name.to_string(), prop.value.clone()))
            })
            .collect::<Option<Vec<_>>>()?;
        Some(PrimaryKeyValue::new(members))
    }

    /// Points the relationship at `target`, or clears it with `None`
    pub async fn set_related_object(&mut self, target: Option<BoRef>) -> ModelResult<()> {
        let defs = Arc::clone(self.owner.defs());
        let def = defs.relationship(self.rel_id);
        let related_class = defs.related_class_of(self.rel_id);

        if let Some(target) = &target {
            if !defs.is_same_or_subclass(target.class_id(), related_class) {
                return Err(ConfigurationError::WrongRelatedType {
                    relationship: def.name.clone(),
                    class: self.owner.class_name().to_string(),
                    expected: defs.class_def(related_class).class_name.clone(),
                    actual: target.class_name().to_string(),
                }
                .into());
            }
        }

        let reverse = defs.reverse_of(self.rel_id).map(|id| defs.relationship(id));
        let reverse_owns = reverse.is_some_and(|r| r.owning_bo_has_foreign_key);
        let previous = match self.related.clone() {
            Some(previous) => Some(previous),
            None if self.loaded_key.is_none() => self.get_related_object().await?,
            None => None,
        };

        if def.owning_bo_has_foreign_key {
            if reverse_owns {
                return Err(self.both_sides_own_error(def, reverse).into());
            }
            for prop in def.rel_key.iter() {
                let value = target
                    .as_ref()
                    .map_or(Value::Null, |t| t.get_value(&prop.related_property));
                self.owner.set_value(&prop.owner_property, value)?;
            }
        } else {
            // without a reverse the related side is written from this key
            if let Some(reverse) = reverse.filter(|r| !r.owning_bo_has_foreign_key) {
                return Err(ConfigurationError::NoSideOwnsForeignKey {
                    relationship: def.name.clone(),
                    class: self.owner.class_name().to_string(),
                    reverse: reverse.name.clone(),
                    related_class: defs.class_def(related_class).class_name.clone(),
                }
                .into());
            }
            if let Some(previous) = &previous {
                let unchanged = target.as_ref().is_some_and(|t| Arc::ptr_eq(t, previous));
                if !unchanged {
                    for prop in def.rel_key.iter() {
                        previous.set_value(&prop.related_property, Value::Null)?;
                    }
                }
            }
            if let Some(target) = &target {
                for prop in def.rel_key.iter() {
                    target.set_value(&prop.related_property, self.owner.get_value(&prop.owner_property))?;
                }
            }
        }

        match &target {
            Some(_) => self.removed = None,
            None => {
                if let Some(previous) = previous {
                    self.removed = Some(previous);
                }
            }
        }
        self.related = target.clone();
        self.rel_key.refresh(&self.owner);
        self.loaded_key = Some(self.rel_key.clone());

        debug!(
            "Set {}.{} to {}",
            self.owner.class_name(),
            def.name,
            target.as_ref().map_or("none", |t| t.class_name())
        );
        let event = RelationshipEvent::Updated {
            relationship: def.name.clone(),
            related: target,
        };
        self.observers.trigger(&self.owner, &event).await;
        Ok(())
    }

    fn both_sides_own_error(
        &self,
        def: &RelationshipDef,
        reverse: Option<&RelationshipDef>,
    ) -> ConfigurationError {
        let defs = self.owner.defs();
        ConfigurationError::BothSidesOwnForeignKey {
            relationship: def.name.clone(),
            class: self.owner.class_name().to_string(),
            reverse: reverse.map(|r| r.name.clone()).unwrap_or_default(),
            related_class: defs
                .class_def(defs.related_class_of(self.rel_id))
                .class_name
                .clone(),
        }
    }

    /// True while a detached related object is awaiting persistence
    pub fn is_removed(&self) -> bool {
        self.removed.is_some()
    }

    pub fn removed_object(&self) -> Option<&BoRef> {
        self.removed.as_ref()
    }

    /// Forgets the detached object once the owner has been persisted
    pub fn mark_persisted(&mut self) {
        self.removed = None;
    }
}
