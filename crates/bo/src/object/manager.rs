//! Object Manager - the registry of resident business objects
//!
//! At most one resident instance exists per primary key within a class
//! hierarchy. Entries are weak, so dropping the last handle to an object
//! removes it from residence.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use super::business_object::{BoRef, BusinessObject};
use super::primary_key::PrimaryKeyValue;
use crate::metadata::{ClassId, ValidatedClassDefs};

/// Registrations between sweeps of dead entries
const PURGE_INTERVAL: usize = 256;

#[derive(Debug, Default)]
pub struct ObjectManager {
    objects: DashMap<String, Weak<BusinessObject>>,
    registrations: AtomicUsize,
}

impl ObjectManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subclass instances share their root ancestor's key space. Key values
    /// keep their JSON type, so `"1"` and `1` are different keys.
    fn key_for(defs: &ValidatedClassDefs, class_id: ClassId, key: &PrimaryKeyValue) -> String {
        let root = defs.lineage(class_id).last().copied().unwrap_or(class_id);
        let members: Vec<Value> = key
            .members()
            .iter()
            .map(|(name, value)| Value::Array(vec![Value::String(name.clone()), value.clone()]))
            .collect();
        format!("{}:{}", defs.class_def(root).class_ref(), Value::Array(members))
    }

    /// The resident instance for a key, if it is still alive and of the
    /// requested class or one of its subclasses
    pub fn find(
        &self,
        defs: &ValidatedClassDefs,
        class_id: ClassId,
        key: &PrimaryKeyValue,
    ) -> Option<BoRef> {
        let map_key = Self::key_for(defs, class_id, key);
        let bo = self.objects.get(&map_key)?.upgrade();
        let Some(bo) = bo else {
            self.objects.remove_if(&map_key, |_, weak| weak.strong_count() == 0);
            return None;
        };
        defs.is_same_or_subclass(bo.class_id(), class_id).then_some(bo)
    }

    /// Makes `bo` resident, or returns the instance already resident under
    /// its key. Objects without a valid key are returned unchanged.
    pub fn register(&self, bo: BoRef) -> BoRef {
        let Some(key) = bo.primary_key().filter(PrimaryKeyValue::is_valid) else {
            return bo;
        };
        if self.registrations.fetch_add(1, Ordering::Relaxed) % PURGE_INTERVAL == PURGE_INTERVAL - 1 {
            self.purge();
        }
        let map_key = Self::key_for(bo.defs(), bo.class_id(), &key);
        let mut entry = self.objects.entry(map_key).or_insert_with(Weak::new);
        if let Some(resident) = entry.upgrade() {
            return resident;
        }
        debug!("Registered resident {} {}", bo.class_name(), key);
        *entry = Arc::downgrade(&bo);
        bo
    }

    pub fn remove(&self, bo: &BusinessObject) {
        if let Some(key) = bo.primary_key() {
            self.objects
                .remove_if(&Self::key_for(bo.defs(), bo.class_id(), &key), |_, weak| {
                    weak.upgrade().map_or(true, |resident| resident.id() == bo.id())
                });
        }
    }

    /// Number of live resident objects
    pub fn len(&self) -> usize {
        self.objects.iter().filter(|e| e.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops entries whose objects are gone
    pub fn purge(&self) {
        self.objects.retain(|_, weak| weak.strong_count() > 0);
    }

    pub fn clear(&self) {
        self.objects.clear();
    }
}
