//! In-memory store and metadata fixtures shared by the unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::concurrency::ConcurrencyStore;
use crate::error::ModelResult;
use crate::loader::BusinessObjectLoader;
use crate::metadata::{ClassDef, ClassId, ValidatedClassDefs};
use crate::object::{BoRef, BusinessObject, PrimaryKeyValue, PropertyValues};
use crate::query::Criteria;

/// Rows per class name; stands in for both the loader and the concurrency store
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<PropertyValues>>>,
    loads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, class_name: &str, row: &[(&str, Value)]) {
        let row = row
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        self.tables
            .lock()
            .unwrap()
            .entry(class_name.to_string())
            .or_default()
            .push(row);
    }

    pub fn row(&self, class_name: &str, key: &PrimaryKeyValue) -> Option<PropertyValues> {
        let criteria = key.to_criteria();
        self.tables
            .lock()
            .unwrap()
            .get(class_name)?
            .iter()
            .find(|row| criteria.matches(row))
            .cloned()
    }

    /// Changes a stored row the way another client would
    pub fn update(&self, class_name: &str, key: &PrimaryKeyValue, property: &str, value: Value) {
        let criteria = key.to_criteria();
        let mut tables = self.tables.lock().unwrap();
        if let Some(row) = tables
            .get_mut(class_name)
            .and_then(|rows| rows.iter_mut().find(|row| criteria.matches(row)))
        {
            row.insert(property.to_string(), value);
        }
    }

    pub fn delete(&self, class_name: &str, key: &PrimaryKeyValue) {
        let criteria = key.to_criteria();
        if let Some(rows) = self.tables.lock().unwrap().get_mut(class_name) {
            rows.retain(|row| !criteria.matches(row));
        }
    }

    /// Number of loader calls served
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn rows_matching(&self, class_name: &str, criteria: &Criteria) -> Vec<PropertyValues> {
        self.tables
            .lock()
            .unwrap()
            .get(class_name)
            .map(|rows| rows.iter().filter(|row| criteria.matches(row)).cloned().collect())
            .unwrap_or_default()
    }
}

fn sort_key(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[async_trait]
impl BusinessObjectLoader for MemoryStore {
    async fn load_by_primary_key(
        &self,
        defs: &Arc<ValidatedClassDefs>,
        class_id: ClassId,
        key: &PrimaryKeyValue,
    ) -> ModelResult<Option<BoRef>> {
        self.load_one(defs, class_id, &key.to_criteria()).await
    }

    async fn load_one(
        &self,
        defs: &Arc<ValidatedClassDefs>,
        class_id: ClassId,
        criteria: &Criteria,
    ) -> ModelResult<Option<BoRef>> {
        let found = self.load_collection(defs, class_id, criteria, &[]).await?;
        Ok(found.into_iter().next())
    }

    async fn load_collection(
        &self,
        defs: &Arc<ValidatedClassDefs>,
        class_id: ClassId,
        criteria: &Criteria,
        order_by: &[String],
    ) -> ModelResult<Vec<BoRef>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let mut rows: Vec<(ClassId, PropertyValues)> = Vec::new();
        for (id, class_def) in defs.iter() {
            if defs.is_same_or_subclass(id, class_id) {
                let matching = self.rows_matching(&class_def.class_name, criteria);
                rows.extend(matching.into_iter().map(|row| (id, row)));
            }
        }
        rows.sort_by(|(_, a), (_, b)| {
            order_by
                .iter()
                .map(|name| sort_key(a.get(name)).cmp(&sort_key(b.get(name))))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(rows
            .into_iter()
            .map(|(id, row)| BusinessObject::from_stored(defs.clone(), id, row).into_ref())
            .collect())
    }
}

#[async_trait]
impl ConcurrencyStore for MemoryStore {
    async fn read_row(
        &self,
        class_def: &ClassDef,
        key: &PrimaryKeyValue,
        properties: &[&str],
    ) -> ModelResult<Option<PropertyValues>> {
        let Some(row) = self.row(&class_def.class_name, key) else {
            return Ok(None);
        };
        if properties.is_empty() {
            return Ok(Some(row));
        }
        Ok(Some(
            row.into_iter()
                .filter(|(name, _)| properties.contains(&name.as_str()))
                .collect(),
        ))
    }

    async fn update_row(
        &self,
        class_def: &ClassDef,
        key: &PrimaryKeyValue,
        values: &PropertyValues,
        guard: &Criteria,
    ) -> ModelResult<u64> {
        let criteria = key.to_criteria();
        let mut tables = self.tables.lock().unwrap();
        let Some(row) = tables
            .get_mut(&class_def.class_name)
            .and_then(|rows| rows.iter_mut().find(|row| criteria.matches(row)))
        else {
            return Ok(0);
        };
        if !guard.matches(row) {
            return Ok(0);
        }
        row.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(1)
    }

    async fn insert_row(&self, class_def: &ClassDef, values: &PropertyValues) -> ModelResult<()> {
        self.tables
            .lock()
            .unwrap()
            .entry(class_def.class_name.clone())
            .or_default()
            .push(values.clone());
        Ok(())
    }
}

pub mod fixtures {
    use std::sync::Arc;

    use serde_json::{json, Value};

    use crate::metadata::{
        validate, ClassDef, ClassDefCol, ClassId, ClassRef, PrimaryKeyDef, PropDef, PropertyType,
        RelKeyDef, RelationshipDef, ValidatedClassDefs,
    };
    use crate::object::{BoRef, BusinessObject};

    const ASSEMBLY: &str = "Garage";

    fn concurrency_props(class: ClassDef) -> ClassDef {
        class
            .with_prop(PropDef::new("VersionNumber", PropertyType::Integer).with_default(json!(0)))
            .with_prop(PropDef::new("DateLastUpdated", PropertyType::DateTime))
            .with_prop(PropDef::new("UserLastUpdated", PropertyType::String))
            .with_prop(PropDef::new("MachineLastUpdated", PropertyType::String))
            .with_prop(PropDef::new("Locked", PropertyType::Boolean).with_default(json!(false)))
            .with_prop(PropDef::new("DateTimeLocked", PropertyType::DateTime))
            .with_prop(PropDef::new("UserLocked", PropertyType::String))
            .with_prop(PropDef::new("MachineLocked", PropertyType::String))
            .with_prop(PropDef::new("OperatingSystemUserLocked", PropertyType::String))
    }

    /// Owners with cars and one licence each.
    ///
    /// `Owner.Cars` / `Car.Owner` is a one-to-many pair with the key on the
    /// car; `Owner.Licence` / `Licence.Holder` is one-to-one with the key on
    /// the licence. `SportsCar` extends `Car`, `Classic` is an abstract `Car`.
    pub fn owner_car_defs() -> Arc<ValidatedClassDefs> {
        let mut col = ClassDefCol::new();
        col.add(concurrency_props(
            ClassDef::new(ASSEMBLY, "Owner")
                .with_prop(PropDef::new("OwnerId", PropertyType::Guid))
                .with_prop(PropDef::new("Name", PropertyType::String))
                .with_primary_key(PrimaryKeyDef::object_id("OwnerId"))
                .with_relationship(
                    RelationshipDef::multiple(
                        "Cars",
                        ClassRef::new(ASSEMBLY, "Car"),
                        RelKeyDef::single("OwnerId", "OwnerId"),
                    )
                    .with_reverse("Owner")
                    .with_order_by(&["Registration"]),
                )
                .with_relationship(
                    RelationshipDef::single(
                        "Licence",
                        ClassRef::new(ASSEMBLY, "Licence"),
                        RelKeyDef::single("OwnerId", "OwnerId"),
                    )
                    .with_reverse("Holder"),
                ),
        ))
        .unwrap();
        col.add(
            ClassDef::new(ASSEMBLY, "Car")
                .with_prop(PropDef::new("CarId", PropertyType::Guid))
                .with_prop(PropDef::new("OwnerId", PropertyType::Guid))
                .with_prop(PropDef::new("Registration", PropertyType::String))
                .with_primary_key(PrimaryKeyDef::object_id("CarId"))
                .with_relationship(
                    RelationshipDef::single(
                        "Owner",
                        ClassRef::new(ASSEMBLY, "Owner"),
                        RelKeyDef::single("OwnerId", "OwnerId"),
                    )
                    .with_reverse("Cars"),
                ),
        )
        .unwrap();
        col.add(
            ClassDef::new(ASSEMBLY, "SportsCar")
                .with_prop(PropDef::new("TopSpeed", PropertyType::Integer))
                .with_superclass(ClassRef::new(ASSEMBLY, "Car")),
        )
        .unwrap();
        col.add(
            ClassDef::new(ASSEMBLY, "Classic")
                .abstract_class()
                .with_superclass(ClassRef::new(ASSEMBLY, "Car")),
        )
        .unwrap();
        col.add(
            ClassDef::new(ASSEMBLY, "Licence")
                .with_prop(PropDef::new("LicenceId", PropertyType::Guid))
                .with_prop(PropDef::new("OwnerId", PropertyType::Guid))
                .with_primary_key(PrimaryKeyDef::object_id("LicenceId"))
                .with_relationship(
                    RelationshipDef::single(
                        "Holder",
                        ClassRef::new(ASSEMBLY, "Owner"),
                        RelKeyDef::single("OwnerId", "OwnerId"),
                    )
                    .with_reverse("Licence"),
                ),
        )
        .unwrap();
        validate(col).unwrap().into_shared()
    }

    /// A stored object with the given values
    pub fn stored(defs: &Arc<ValidatedClassDefs>, class_id: ClassId, values: &[(&str, Value)]) -> BoRef {
        let values = values
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        BusinessObject::from_stored(defs.clone(), class_id, values).into_ref()
    }
}
