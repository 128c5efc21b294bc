//! Business objects - property values of one instance of a class definition
//!
//! Objects are shared as [`BoRef`] handles so that relationships, the object
//! manager and callers all see the same instance. Property values sit behind
//! a lock and are edited through `&self`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::primary_key::PrimaryKeyValue;
use crate::concurrency::ConcurrencyControl;
use crate::error::{ConfigurationError, ModelError, ModelResult};
use crate::metadata::{ClassDef, ClassId, PropDef, ReadWriteRule, ValidatedClassDefs};

/// Property values keyed by property name
pub type PropertyValues = HashMap<String, Value>;

/// Shared handle to a business object
pub type BoRef = Arc<BusinessObject>;

/// Lifecycle flags of a business object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectStatus {
    pub is_new: bool,
    pub is_editing: bool,
    pub is_dirty: bool,
    pub is_deleted: bool,
}

#[derive(Debug, Default)]
struct ObjectState {
    values: PropertyValues,
    persisted: PropertyValues,
    status: ObjectStatus,
}

type ControlSlot = Option<Box<dyn ConcurrencyControl>>;

/// One instance of a validated class definition
pub struct BusinessObject {
    id: Uuid,
    defs: Arc<ValidatedClassDefs>,
    class_id: ClassId,
    state: RwLock<ObjectState>,
    concurrency: Mutex<ControlSlot>,
}

impl std::fmt::Debug for BusinessObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read_state();
        f.debug_struct("BusinessObject")
            .field("id", &self.id)
            .field("class", &self.class_def().class_name)
            .field("values", &state.values)
            .field("status", &state.status)
            .finish()
    }
}

impl BusinessObject {
    /// A new, unsaved object with every property at its default value.
    ///
    /// An object-id primary key receives a fresh Guid.
    pub fn new(defs: Arc<ValidatedClassDefs>, class_id: ClassId) -> Self {
        let mut values: PropertyValues = defs
            .all_properties(class_id)
            .into_iter()
            .map(|prop| {
                let default = prop.default_value.clone().unwrap_or(Value::Null);
                (prop.name.clone(), default)
            })
            .collect();

        if let Some(pk) = defs.primary_key_of(class_id) {
            if pk.is_guid_object_id {
                for name in pk.property_names() {
                    let value = values.entry(name.to_string()).or_insert(Value::Null);
                    if value.is_null() {
                        *value = Value::String(Uuid::new_v4().to_string());
                    }
                }
            }
        }

        let state = ObjectState {
            values,
            persisted: PropertyValues::new(),
            status: ObjectStatus {
                is_new: true,
                ..ObjectStatus::default()
            },
        };
        Self::with_state(defs, class_id, state)
    }

    /// An object whose values were read from the store
    pub fn from_stored(
        defs: Arc<ValidatedClassDefs>,
        class_id: ClassId,
        stored: PropertyValues,
    ) -> Self {
        let mut values: PropertyValues = defs
            .all_properties(class_id)
            .into_iter()
            .map(|prop| (prop.name.clone(), Value::Null))
            .collect();
        values.extend(stored);

        let state = ObjectState {
            persisted: values.clone(),
            values,
            status: ObjectStatus::default(),
        };
        Self::with_state(defs, class_id, state)
    }

    fn with_state(defs: Arc<ValidatedClassDefs>, class_id: ClassId, state: ObjectState) -> Self {
        Self {
            id: Uuid::new_v4(),
            defs,
            class_id,
            state: RwLock::new(state),
            concurrency: Mutex::new(None),
        }
    }

    /// Attaches the concurrency strategy consulted on edit and persist
    pub fn with_concurrency_control(mut self, control: Box<dyn ConcurrencyControl>) -> Self {
        *self.concurrency.get_mut() = Some(control);
        self
    }

    pub fn into_ref(self) -> BoRef {
        Arc::new(self)
    }

    /// Identity of this in-memory instance
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    pub fn defs(&self) -> &Arc<ValidatedClassDefs> {
        &self.defs
    }

    pub fn class_def(&self) -> &ClassDef {
        self.defs.class_def(self.class_id)
    }

    pub fn class_name(&self) -> &str {
        &self.class_def().class_name
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ObjectState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ObjectState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Current value of a property; null when unset or unknown
    pub fn get_value(&self, property: &str) -> Value {
        self.read_state()
            .values
            .get(property)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Snapshot of every property value
    pub fn values(&self) -> PropertyValues {
        self.read_state().values.clone()
    }

    /// Values that differ from the last persisted state; all values when new
    pub fn dirty_values(&self) -> PropertyValues {
        let state = self.read_state();
        if state.status.is_new {
            return state.values.clone();
        }
        state
            .values
            .iter()
            .filter(|(name, value)| state.persisted.get(*name) != Some(*value))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Sets a property value, honouring its read/write rule
    pub fn set_value(&self, property: &str, value: Value) -> ModelResult<()> {
        let prop = self.prop_def(property)?;
        let mut state = self.write_state();

        let rejection = match prop.read_write_rule {
            ReadWriteRule::ReadWrite => None,
            ReadWriteRule::ReadOnly => Some("the property is read-only"),
            ReadWriteRule::WriteNew if !state.status.is_new => {
                Some("the property can only be set on a new object")
            }
            ReadWriteRule::WriteOnce => match state.persisted.get(property) {
                Some(stored) if !stored.is_null() && *stored != value => {
                    Some("the property has already been written once")
                }
                _ => None,
            },
            ReadWriteRule::WriteNew => None,
        };
        if let Some(reason) = rejection {
            return Err(ModelError::NotEditable {
                class: self.class_name().to_string(),
                property: property.to_string(),
                reason: reason.to_string(),
            });
        }

        Self::store_value(&mut state, property, value);
        Ok(())
    }

    /// Writes a value without consulting its read/write rule. With
    /// `persisted` the value is also recorded as already stored.
    pub(crate) fn set_value_internal(&self, property: &str, value: Value, persisted: bool) {
        let mut state = self.write_state();
        if persisted {
            state.persisted.insert(property.to_string(), value.clone());
        }
        Self::store_value(&mut state, property, value);
    }

    fn store_value(state: &mut ObjectState, property: &str, value: Value) {
        let previous = state.values.insert(property.to_string(), value);
        if previous.as_ref() != state.values.get(property) {
            state.status.is_dirty = state.status.is_new
                || state
                    .values
                    .iter()
                    .any(|(name, v)| state.persisted.get(name) != Some(v));
        }
    }

    fn prop_def(&self, property: &str) -> ModelResult<Arc<PropDef>> {
        self.defs
            .find_property(self.class_id, property)
            .cloned()
            .ok_or_else(|| {
                ConfigurationError::PropertyNotFound {
                    class: self.class_name().to_string(),
                    property: property.to_string(),
                }
                .into()
            })
    }

    /// Current primary key value, if the class has a primary key
    pub fn primary_key(&self) -> Option<PrimaryKeyValue> {
        let pk = self.defs.primary_key_of(self.class_id)?;
        let state = self.read_state();
        let members = pk
            .property_names()
            .into_iter()
            .map(|name| {
                let value = state.values.get(name).cloned().unwrap_or(Value::Null);
                (name.to_string(), value)
            })
            .collect();
        Some(PrimaryKeyValue::new(members))
    }

    /// Primary key value, or an error naming the class when it is incomplete
    pub fn require_primary_key(&self) -> ModelResult<PrimaryKeyValue> {
        match self.primary_key() {
            Some(key) if key.is_valid() => Ok(key),
            Some(key) => Err(ModelError::InvalidKey(format!(
                "{} has an incomplete primary key ({})",
                self.class_name(),
                key
            ))),
            None => Err(ModelError::InvalidKey(format!(
                "{} has no primary key",
                self.class_name()
            ))),
        }
    }

    pub fn status(&self) -> ObjectStatus {
        self.read_state().status
    }

    pub fn is_new(&self) -> bool {
        self.status().is_new
    }

    pub fn is_dirty(&self) -> bool {
        self.status().is_dirty
    }

    pub fn is_editing(&self) -> bool {
        self.status().is_editing
    }

    /// Starts an edit session, consulting the concurrency strategy first
    pub async fn begin_edit(&self) -> ModelResult<()> {
        if self.is_editing() {
            return Ok(());
        }
        let mut control = self.concurrency.lock().await;
        if let Some(control) = control.as_mut() {
            control.check_before_begin_edit(self).await?;
        }
        self.write_state().status.is_editing = true;
        Ok(())
    }

    /// Discards unsaved values and releases any lock held for the edit
    pub async fn cancel_edit(&self) -> ModelResult<()> {
        {
            let mut state = self.write_state();
            if !state.status.is_new {
                state.values = state.persisted.clone();
            }
            state.status.is_editing = false;
            state.status.is_dirty = state.status.is_new;
        }
        self.release_locks().await
    }

    /// Releases any store-side lock the concurrency strategy holds
    pub async fn release_locks(&self) -> ModelResult<()> {
        let mut control = self.concurrency.lock().await;
        match control.as_mut() {
            Some(control) => control.release_locks(self).await,
            None => Ok(()),
        }
    }

    /// Records the current values as stored
    pub fn mark_persisted(&self) {
        let mut state = self.write_state();
        state.persisted = state.values.clone();
        state.status.is_new = false;
        state.status.is_dirty = false;
        state.status.is_editing = false;
    }

    pub fn mark_deleted(&self) {
        self.write_state().status.is_deleted = true;
    }

    pub(crate) async fn concurrency_control(&self) -> MutexGuard<'_, ControlSlot> {
        self.concurrency.lock().await
    }
}
