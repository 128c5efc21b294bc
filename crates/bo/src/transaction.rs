//! Transaction Committer
//!
//! Persists business objects through a [`ConcurrencyStore`], running the
//! object's concurrency strategy around the write and compensating it when
//! the write fails.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::concurrency::{ConcurrencyControl, ConcurrencyStore};
use crate::error::{ConcurrencyError, ModelResult};
use crate::object::{BoRef, BusinessObject, ObjectManager};
use crate::relationships::RelationshipCol;

pub struct TransactionCommitter {
    store: Arc<dyn ConcurrencyStore>,
    objects: Option<Arc<ObjectManager>>,
}

impl TransactionCommitter {
    pub fn new(store: Arc<dyn ConcurrencyStore>) -> Self {
        Self {
            store,
            objects: None,
        }
    }

    /// Registers persisted objects as resident
    pub fn with_object_manager(mut self, objects: Arc<ObjectManager>) -> Self {
        self.objects = Some(objects);
        self
    }

    /// Writes the object, inserting new objects and updating stored ones.
    /// Stored objects without changes are left alone, strategy included.
    pub async fn persist(&self, bo: &BoRef) -> ModelResult<()> {
        if !bo.is_new() && bo.dirty_values().is_empty() {
            debug!("{} has no changes to persist", bo.class_name());
            return Ok(());
        }
        let mut control = bo.concurrency_control().await;

        if let Some(control) = control.as_mut() {
            if let Err(err) = control.check_before_persist(bo).await {
                control.rollback_compensation(bo);
                return Err(err);
            }
        }

        match self.write(bo, control.as_deref()).await {
            Ok(()) => {
                if let Some(control) = control.as_mut() {
                    control.after_persist(bo);
                }
                bo.mark_persisted();
                if let Some(objects) = &self.objects {
                    objects.register(Arc::clone(bo));
                }
                debug!("Persisted {}", bo.class_name());
                Ok(())
            }
            Err(err) => {
                warn!("Persist of {} failed: {}", bo.class_name(), err);
                if let Some(control) = control.as_mut() {
                    control.rollback_compensation(bo);
                }
                Err(err)
            }
        }
    }

    /// Persists the owner and clears its relationships' detached objects
    pub async fn persist_with_relationships(
        &self,
        bo: &BoRef,
        relationships: &mut RelationshipCol,
    ) -> ModelResult<()> {
        self.persist(bo).await?;
        relationships.mark_persisted();
        Ok(())
    }

    async fn write(
        &self,
        bo: &BusinessObject,
        control: Option<&dyn ConcurrencyControl>,
    ) -> ModelResult<()> {
        let class_def = bo.class_def();
        if bo.is_new() {
            return self.store.insert_row(class_def, &bo.values()).await;
        }

        let values = bo.dirty_values();
        let key = bo.require_primary_key()?;
        let guard = control
            .map(|control| control.persist_criteria(bo))
            .unwrap_or_default();

        let affected = self
            .store
            .update_row(class_def, &key, &values, &guard)
            .await?;
        if affected > 0 {
            return Ok(());
        }
        Err(match control {
            Some(control) => control.resolve_conflict(bo).await,
            None => ConcurrencyError::DeletedConcurrently {
                class: bo.class_name().to_string(),
                object: key.to_string(),
            }
            .into(),
        })
    }
}
