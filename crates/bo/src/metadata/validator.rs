//! Class Metadata Validator - whole-collection checks run once after loading
//!
//! Validation consumes a [`ClassDefCol`] and either fails on the first invalid
//! definition or returns [`ValidatedClassDefs`], the only form of metadata the
//! runtime accepts. The passes run in a fixed order:
//!
//! 0. superclass references are resolved to ids,
//! 1. foreign-key ownership is normalised,
//! 2. object-id primary keys are checked and their property locked down,
//! 3. key members are resolved to the property definitions they name,
//! 4. every relationship is checked against its related class and reverse.

use std::ops::Deref;
use std::sync::Arc;

use tracing::{debug, info};

use super::class::{ClassDefCol, ClassId, RelationshipId};
use super::key::KeyMember;
use super::property::{PropDef, PropertyType, ReadWriteRule};
use crate::error::{ConfigurationError, KeySide, ModelResult};

/// Class metadata that passed validation; read-only from here on
#[derive(Debug)]
pub struct ValidatedClassDefs {
    classes: ClassDefCol,
}

impl Deref for ValidatedClassDefs {
    type Target = ClassDefCol;

    fn deref(&self) -> &ClassDefCol {
        &self.classes
    }
}

impl ValidatedClassDefs {
    /// The reverse of a relationship, if one is declared
    pub fn reverse_of(&self, id: RelationshipId) -> Option<RelationshipId> {
        self.relationship(id).reverse
    }

    /// Related class of a relationship; always resolved after validation
    pub fn related_class_of(&self, id: RelationshipId) -> ClassId {
        self.relationship(id)
            .related_class_id
            .unwrap_or(id.class)
    }

    pub fn into_shared(self) -> Arc<ValidatedClassDefs> {
        Arc::new(self)
    }
}

/// Validates a whole class collection
pub fn validate(classes: ClassDefCol) -> ModelResult<ValidatedClassDefs> {
    ClassDefValidator::new(classes).validate()
}

/// Runs the validation passes over a class collection
pub struct ClassDefValidator {
    classes: ClassDefCol,
}

impl ClassDefValidator {
    pub fn new(classes: ClassDefCol) -> Self {
        Self { classes }
    }

    pub fn validate(mut self) -> ModelResult<ValidatedClassDefs> {
        info!(
            "Validating {} class definitions with {} relationships",
            self.classes.len(),
            self.classes.relationship_count()
        );

        self.resolve_superclasses()?;
        self.update_owning_bo_has_foreign_key();
        self.check_object_id_primary_keys()?;
        self.resolve_key_properties()?;
        self.check_relationships()?;

        debug!("Class definitions validated");
        Ok(ValidatedClassDefs {
            classes: self.classes,
        })
    }

    fn class_name(&self, id: ClassId) -> String {
        self.classes.class_def(id).class_name.clone()
    }

    fn resolve_superclasses(&mut self) -> ModelResult<()> {
        debug!("Resolving superclasses");
        let ids: Vec<ClassId> = self.classes.ids().collect();
        for id in &ids {
            let Some(superclass) = self.classes.class_def(*id).superclass.clone() else {
                continue;
            };
            let parent = self.classes.find(&superclass).ok_or_else(|| {
                ConfigurationError::SuperClassNotFound {
                    class: self.class_name(*id),
                    superclass: superclass.to_string(),
                }
            })?;
            self.classes.class_def_mut(*id).superclass_id = Some(parent);
        }

        for id in ids {
            let mut steps = 0;
            let mut current = self.classes.class_def(id).superclass_id;
            while let Some(parent) = current {
                steps += 1;
                if parent == id || steps > self.classes.len() {
                    return Err(ConfigurationError::CircularInheritance {
                        class: self.class_name(id),
                    }
                    .into());
                }
                current = self.classes.class_def(parent).superclass_id;
            }
        }
        Ok(())
    }

    /// Pass 1. Multiple relationships never hold the foreign key on the owning
    /// side. A single relationship flagged as owning whose key is the owner's
    /// own primary key is keyed by that shared primary key instead.
    fn update_owning_bo_has_foreign_key(&mut self) {
        debug!("Updating foreign key ownership");
        let ids: Vec<ClassId> = self.classes.ids().collect();
        for id in ids {
            let primary_key: Option<Vec<String>> = self
                .classes
                .primary_key_of(id)
                .map(|pk| pk.property_names().into_iter().map(str::to_string).collect());

            let class_def = self.classes.class_def_mut(id);
            for rel in class_def.relationships.iter_mut() {
                if rel.is_multiple() {
                    rel.owning_bo_has_foreign_key = false;
                    continue;
                }
                if !rel.owning_bo_has_foreign_key {
                    continue;
                }
                let Some(pk) = &primary_key else {
                    continue;
                };
                let owner_props = rel.rel_key.owner_property_names();
                let keyed_by_primary_key = pk.len() == owner_props.len()
                    && owner_props.iter().all(|name| pk.iter().any(|p| p == name));
                if keyed_by_primary_key {
                    debug!(
                        "Relationship '{}' of '{}' is keyed by the owner's primary key",
                        rel.name, class_def.class_name
                    );
                    rel.owning_bo_has_foreign_key = false;
                    rel.owning_bo_has_primary_key = true;
                }
            }
        }
    }

    /// Pass 2
    fn check_object_id_primary_keys(&mut self) -> ModelResult<()> {
        debug!("Checking object id primary keys");
        let ids: Vec<ClassId> = self.classes.ids().collect();
        for id in ids {
            let Some(pk) = self.classes.class_def(id).primary_key.as_ref() else {
                continue;
            };
            if !pk.is_guid_object_id {
                continue;
            }
            if pk.members.len() != 1 {
                return Err(ConfigurationError::ObjectIdKeyNotSingle {
                    class: self.class_name(id),
                    count: pk.members.len(),
                }
                .into());
            }
            let property = pk.members[0].name().to_string();

            let owner = self
                .classes
                .find_property_owner(id, &property)
                .ok_or_else(|| ConfigurationError::PrimaryKeyPropertyNotFound {
                    class: self.class_name(id),
                    property: property.clone(),
                })?;
            let class_name = self.class_name(id);
            let Some(prop) = self.classes.class_def_mut(owner).props.get_mut(&property) else {
                continue;
            };
            if prop.property_type != PropertyType::Guid {
                return Err(ConfigurationError::ObjectIdKeyWrongType {
                    class: class_name,
                    property,
                    property_type: prop.property_type.to_string(),
                }
                .into());
            }
            prop.compulsory = true;
            prop.read_write_rule = ReadWriteRule::WriteOnce;
        }
        Ok(())
    }

    /// Pass 3. Primary key members are resolved alongside alternate keys.
    fn resolve_key_properties(&mut self) -> ModelResult<()> {
        debug!("Resolving key properties");
        let ids: Vec<ClassId> = self.classes.ids().collect();
        for id in ids {
            let class_def = self.classes.class_def(id);

            let primary_key = match &class_def.primary_key {
                Some(pk) => Some(self.resolve_members(id, &pk.members, |property| {
                    ConfigurationError::PrimaryKeyPropertyNotFound {
                        class: class_def.class_name.clone(),
                        property,
                    }
                })?),
                None => None,
            };

            let mut keys = Vec::with_capacity(class_def.keys.len());
            for key in &class_def.keys {
                keys.push(self.resolve_members(id, &key.members, |property| {
                    ConfigurationError::KeyPropertyNotFound {
                        key: key.name.clone(),
                        class: class_def.class_name.clone(),
                        property,
                    }
                })?);
            }

            let class_def = self.classes.class_def_mut(id);
            if let (Some(pk), Some(members)) = (class_def.primary_key.as_mut(), primary_key) {
                pk.members = members;
            }
            for (key, members) in class_def.keys.iter_mut().zip(keys) {
                key.members = members;
            }
        }
        Ok(())
    }

    fn resolve_members(
        &self,
        id: ClassId,
        members: &[KeyMember],
        not_found: impl Fn(String) -> ConfigurationError,
    ) -> ModelResult<Vec<KeyMember>> {
        members
            .iter()
            .map(|member| -> ModelResult<KeyMember> {
                let prop: &Arc<PropDef> = self
                    .classes
                    .find_property(id, member.name())
                    .ok_or_else(|| not_found(member.name().to_string()))?;
                Ok(KeyMember::Resolved(Arc::clone(prop)))
            })
            .collect()
    }

    /// Pass 4
    fn check_relationships(&mut self) -> ModelResult<()> {
        debug!("Checking relationships");
        let mut resolved: Vec<(RelationshipId, ClassId, Option<RelationshipId>)> = Vec::new();

        for (id, class_def) in self.classes.iter() {
            for (index, rel) in class_def.relationships.iter().enumerate() {
                let related_id = self.classes.find(&rel.related_class).ok_or_else(|| {
                    ConfigurationError::RelatedClassNotFound {
                        relationship: rel.name.clone(),
                        class: class_def.class_name.clone(),
                        related_class: rel.related_class.to_string(),
                        cause: format!(
                            "no class named '{}' is registered in assembly '{}'",
                            rel.related_class.class_name, rel.related_class.assembly_name
                        ),
                    }
                })?;
                let related_name = self.class_name(related_id);

                for prop in rel.rel_key.iter() {
                    if self.classes.find_property(id, &prop.owner_property).is_none() {
                        return Err(ConfigurationError::RelationshipPropertyNotFound {
                            relationship: rel.name.clone(),
                            class: class_def.class_name.clone(),
                            side: KeySide::Owner,
                            property: prop.owner_property.clone(),
                            property_class: class_def.class_name.clone(),
                        }
                        .into());
                    }
                    if self.classes.find_property(related_id, &prop.related_property).is_none() {
                        return Err(ConfigurationError::RelationshipPropertyNotFound {
                            relationship: rel.name.clone(),
                            class: class_def.class_name.clone(),
                            side: KeySide::Related,
                            property: prop.related_property.clone(),
                            property_class: related_name.clone(),
                        }
                        .into());
                    }
                }

                let reverse = match &rel.reverse_relationship_name {
                    None => None,
                    Some(reverse_name) => {
                        let reverse_id = self
                            .classes
                            .find_relationship(related_id, reverse_name)
                            .ok_or_else(|| ConfigurationError::ReverseRelationshipNotFound {
                                relationship: rel.name.clone(),
                                class: class_def.class_name.clone(),
                                reverse: reverse_name.clone(),
                                related_class: related_name.clone(),
                            })?;
                        let reverse_def = self.classes.relationship(reverse_id);

                        if !rel.rel_key.is_mirror_of(&reverse_def.rel_key) {
                            return Err(ConfigurationError::ReverseKeyMismatch {
                                relationship: rel.name.clone(),
                                class: class_def.class_name.clone(),
                                reverse: reverse_name.clone(),
                                related_class: related_name.clone(),
                            }
                            .into());
                        }
                        if rel.owning_bo_has_foreign_key && reverse_def.owning_bo_has_foreign_key {
                            return Err(ConfigurationError::BothSidesOwnForeignKey {
                                relationship: rel.name.clone(),
                                class: class_def.class_name.clone(),
                                reverse: reverse_name.clone(),
                                related_class: related_name.clone(),
                            }
                            .into());
                        }
                        Some(reverse_id)
                    }
                };

                resolved.push((RelationshipId { class: id, index }, related_id, reverse));
            }
        }

        for (rel_id, related_id, reverse) in resolved {
            let rel = &mut self.classes.class_def_mut(rel_id.class).relationships[rel_id.index];
            rel.related_class_id = Some(related_id);
            rel.reverse = reverse;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        ClassDef, ClassRef, KeyDef, PrimaryKeyDef, PropDef, RelKeyDef, RelationshipDef,
    };

    fn customer() -> ClassDef {
        ClassDef::new("Shop", "Customer")
            .with_prop(PropDef::new("CustomerId", PropertyType::Guid))
            .with_prop(PropDef::new("Name", PropertyType::String))
            .with_primary_key(PrimaryKeyDef::object_id("CustomerId"))
    }

    fn order() -> ClassDef {
        ClassDef::new("Shop", "Order")
            .with_prop(PropDef::new("OrderId", PropertyType::Guid))
            .with_prop(PropDef::new("CustomerId", PropertyType::Guid))
            .with_primary_key(PrimaryKeyDef::object_id("OrderId"))
    }

    fn shop(customer: ClassDef, order: ClassDef) -> ClassDefCol {
        let mut col = ClassDefCol::new();
        col.add(customer).unwrap();
        col.add(order).unwrap();
        col
    }

    fn orders_rel() -> RelationshipDef {
        RelationshipDef::multiple(
            "Orders",
            ClassRef::new("Shop", "Order"),
            RelKeyDef::single("CustomerId", "CustomerId"),
        )
        .with_reverse("Customer")
    }

    fn customer_rel() -> RelationshipDef {
        RelationshipDef::single(
            "Customer",
            ClassRef::new("Shop", "Customer"),
            RelKeyDef::single("CustomerId", "CustomerId"),
        )
        .with_reverse("Orders")
    }

    fn config_error(result: ModelResult<ValidatedClassDefs>) -> ConfigurationError {
        result
            .unwrap_err()
            .as_configuration()
            .cloned()
            .expect("expected a configuration error")
    }

    #[test]
    fn test_valid_one_to_many_pair() {
        let defs = validate(shop(
            customer().with_relationship(orders_rel()),
            order().with_relationship(customer_rel()),
        ))
        .unwrap();

        let customer_id = defs.find_by_name("Customer").unwrap();
        let order_id = defs.find_by_name("Order").unwrap();
        let orders = defs.find_relationship(customer_id, "Orders").unwrap();
        let customer_of_order = defs.find_relationship(order_id, "Customer").unwrap();

        assert!(!defs.relationship(orders).owning_bo_has_foreign_key);
        assert!(defs.relationship(customer_of_order).owning_bo_has_foreign_key);
        assert_eq!(defs.reverse_of(orders), Some(customer_of_order));
        assert_eq!(defs.reverse_of(customer_of_order), Some(orders));
        assert_eq!(defs.related_class_of(orders), order_id);
    }

    #[test]
    fn test_multiple_relationship_never_owns_foreign_key() {
        let defs = validate(shop(
            customer().with_relationship(orders_rel().with_owning_bo_has_foreign_key(true)),
            order().with_relationship(customer_rel()),
        ))
        .unwrap();

        let customer_id = defs.find_by_name("Customer").unwrap();
        let orders = defs.find_relationship(customer_id, "Orders").unwrap();
        assert!(!defs.relationship(orders).owning_bo_has_foreign_key);
    }

    #[test]
    fn test_single_relationship_keyed_by_primary_key() {
        let profile = ClassDef::new("Shop", "Profile")
            .with_prop(PropDef::new("CustomerId", PropertyType::Guid))
            .with_primary_key(PrimaryKeyDef::new(&["CustomerId"]))
            .with_relationship(
                RelationshipDef::single(
                    "Customer",
                    ClassRef::new("Shop", "Customer"),
                    RelKeyDef::single("CustomerId", "CustomerId"),
                ),
            );
        let mut col = ClassDefCol::new();
        col.add(customer()).unwrap();
        let profile_id = col.add(profile).unwrap();

        let defs = validate(col).unwrap();
        let rel = defs.relationship(defs.find_relationship(profile_id, "Customer").unwrap());

        assert!(!rel.owning_bo_has_foreign_key);
        assert!(rel.owning_bo_has_primary_key);
    }

    #[test]
    fn test_object_id_key_property_is_locked_down() {
        let defs = validate(shop(customer(), order())).unwrap();
        let customer_id = defs.find_by_name("Customer").unwrap();
        let prop = defs.find_property(customer_id, "CustomerId").unwrap();

        assert!(prop.compulsory);
        assert_eq!(prop.read_write_rule, ReadWriteRule::WriteOnce);
    }

    #[test]
    fn test_object_id_key_must_be_guid() {
        let bad = ClassDef::new("Shop", "Customer")
            .with_prop(PropDef::new("CustomerId", PropertyType::Integer))
            .with_primary_key(PrimaryKeyDef::object_id("CustomerId"));
        let mut col = ClassDefCol::new();
        col.add(bad).unwrap();

        let err = config_error(validate(col));
        assert!(matches!(err, ConfigurationError::ObjectIdKeyWrongType { .. }));
        assert_eq!(err.property_name(), Some("CustomerId"));
    }

    #[test]
    fn test_object_id_key_must_be_single() {
        let mut pk = PrimaryKeyDef::new(&["A", "B"]);
        pk.is_guid_object_id = true;
        let bad = ClassDef::new("Shop", "Pair")
            .with_prop(PropDef::new("A", PropertyType::Guid))
            .with_prop(PropDef::new("B", PropertyType::Guid))
            .with_primary_key(pk);
        let mut col = ClassDefCol::new();
        col.add(bad).unwrap();

        let err = config_error(validate(col));
        assert!(matches!(err, ConfigurationError::ObjectIdKeyNotSingle { count: 2, .. }));
    }

    #[test]
    fn test_key_resolves_inherited_property_by_identity() {
        let person = ClassDef::new("Hr", "Person")
            .with_prop(PropDef::new("PersonId", PropertyType::Guid))
            .with_prop(PropDef::new("Email", PropertyType::String))
            .with_primary_key(PrimaryKeyDef::object_id("PersonId"));
        let employee = ClassDef::new("Hr", "Employee")
            .with_prop(PropDef::new("BadgeNo", PropertyType::String))
            .with_superclass(ClassRef::new("Hr", "Person"))
            .with_key(KeyDef::new("UniqueEmail", &["Email"]));
        let mut col = ClassDefCol::new();
        let person_id = col.add(person).unwrap();
        let employee_id = col.add(employee).unwrap();

        let defs = validate(col).unwrap();
        let key = &defs.class_def(employee_id).keys[0];
        let resolved = key.members[0].prop_def().unwrap();
        let own = defs.class_def(person_id).props.get("Email").unwrap();

        assert!(Arc::ptr_eq(resolved, own));
    }

    #[test]
    fn test_key_with_unknown_property_names_key_class_and_property() {
        let person = customer().with_key(KeyDef::new("UniqueEmail", &["EmailAddress"]));
        let mut col = ClassDefCol::new();
        col.add(person).unwrap();

        let err = config_error(validate(col));
        let message = err.to_string();

        assert!(matches!(err, ConfigurationError::KeyPropertyNotFound { .. }));
        assert!(message.contains("UniqueEmail"));
        assert!(message.contains("Customer"));
        assert!(message.contains("EmailAddress"));
    }

    #[test]
    fn test_unknown_superclass() {
        let mut col = ClassDefCol::new();
        col.add(customer().with_superclass(ClassRef::new("Shop", "Party"))).unwrap();

        let err = config_error(validate(col));
        assert!(matches!(err, ConfigurationError::SuperClassNotFound { .. }));
        assert!(err.to_string().contains("Shop.Party"));
    }

    #[test]
    fn test_circular_inheritance() {
        let mut col = ClassDefCol::new();
        col.add(ClassDef::new("Zoo", "A").with_superclass(ClassRef::new("Zoo", "B"))).unwrap();
        col.add(ClassDef::new("Zoo", "B").with_superclass(ClassRef::new("Zoo", "A"))).unwrap();

        let err = config_error(validate(col));
        assert!(matches!(err, ConfigurationError::CircularInheritance { .. }));
    }

    #[test]
    fn test_related_class_not_found() {
        let rel = RelationshipDef::single(
            "Region",
            ClassRef::new("Shop", "Region"),
            RelKeyDef::single("RegionId", "RegionId"),
        );
        let mut col = ClassDefCol::new();
        col.add(customer().with_relationship(rel)).unwrap();

        let err = config_error(validate(col));
        assert_eq!(err.relationship_name(), Some("Region"));
        assert!(err.to_string().contains("Shop.Region"));
    }

    #[test]
    fn test_missing_owner_property() {
        let rel = RelationshipDef::single(
            "Customer",
            ClassRef::new("Shop", "Customer"),
            RelKeyDef::single("ClientId", "CustomerId"),
        );
        let err = config_error(validate(shop(customer(), order().with_relationship(rel))));

        assert!(matches!(
            err,
            ConfigurationError::RelationshipPropertyNotFound { side: KeySide::Owner, .. }
        ));
        assert_eq!(err.property_name(), Some("ClientId"));
        assert_eq!(err.class_name(), Some("Order"));
    }

    #[test]
    fn test_missing_related_property() {
        let rel = RelationshipDef::single(
            "Customer",
            ClassRef::new("Shop", "Customer"),
            RelKeyDef::single("CustomerId", "Id"),
        );
        let err = config_error(validate(shop(customer(), order().with_relationship(rel))));

        assert!(matches!(
            err,
            ConfigurationError::RelationshipPropertyNotFound { side: KeySide::Related, .. }
        ));
        assert!(err.to_string().contains("'Customer'"));
    }

    #[test]
    fn test_inherited_owner_property_is_visible() {
        let person = ClassDef::new("Hr", "Person")
            .with_prop(PropDef::new("PersonId", PropertyType::Guid))
            .with_prop(PropDef::new("DepartmentId", PropertyType::Guid))
            .with_primary_key(PrimaryKeyDef::object_id("PersonId"));
        let department = ClassDef::new("Hr", "Department")
            .with_prop(PropDef::new("DepartmentId", PropertyType::Guid))
            .with_primary_key(PrimaryKeyDef::object_id("DepartmentId"));
        let employee = ClassDef::new("Hr", "Employee")
            .with_superclass(ClassRef::new("Hr", "Person"))
            .with_relationship(RelationshipDef::single(
                "Department",
                ClassRef::new("Hr", "Department"),
                RelKeyDef::single("DepartmentId", "DepartmentId"),
            ));
        let mut col = ClassDefCol::new();
        col.add(person).unwrap();
        col.add(department).unwrap();
        col.add(employee).unwrap();

        assert!(validate(col).is_ok());
    }

    #[test]
    fn test_reverse_relationship_must_exist() {
        let err = config_error(validate(shop(
            customer().with_relationship(orders_rel()),
            order(),
        )));

        assert!(matches!(err, ConfigurationError::ReverseRelationshipNotFound { .. }));
        assert_eq!(err.reverse_relationship_name(), Some("Customer"));
    }

    #[test]
    fn test_reverse_key_must_mirror() {
        let order = order()
            .with_prop(PropDef::new("ClientId", PropertyType::Guid))
            .with_relationship(
                RelationshipDef::single(
                    "Customer",
                    ClassRef::new("Shop", "Customer"),
                    RelKeyDef::single("ClientId", "CustomerId"),
                )
                .with_reverse("Orders"),
            );
        let err = config_error(validate(shop(customer().with_relationship(orders_rel()), order)));
        let message = err.to_string();

        assert!(matches!(err, ConfigurationError::ReverseKeyMismatch { .. }));
        assert!(message.contains("'Orders'"));
        assert!(message.contains("'Customer'"));
        assert!(message.contains("class 'Customer'"));
        assert!(message.contains("class 'Order'"));
    }

    #[test]
    fn test_both_sides_owning_foreign_key_rejected() {
        let passport = ClassDef::new("Hr", "Passport")
            .with_prop(PropDef::new("PassportId", PropertyType::Guid))
            .with_prop(PropDef::new("HolderId", PropertyType::Guid))
            .with_primary_key(PrimaryKeyDef::object_id("PassportId"))
            .with_relationship(
                RelationshipDef::single(
                    "Holder",
                    ClassRef::new("Hr", "Holder"),
                    RelKeyDef::single("HolderId", "HolderKey"),
                )
                .with_reverse("Passport"),
            );
        let holder = ClassDef::new("Hr", "Holder")
            .with_prop(PropDef::new("HolderKey", PropertyType::Guid))
            .with_prop(PropDef::new("Code", PropertyType::String))
            .with_primary_key(PrimaryKeyDef::new(&["Code"]))
            .with_relationship(
                RelationshipDef::single(
                    "Passport",
                    ClassRef::new("Hr", "Passport"),
                    RelKeyDef::single("HolderKey", "HolderId"),
                )
                .with_reverse("Holder"),
            );
        let mut col = ClassDefCol::new();
        col.add(passport).unwrap();
        col.add(holder).unwrap();

        let err = config_error(validate(col));
        let message = err.to_string();

        assert!(matches!(err, ConfigurationError::BothSidesOwnForeignKey { .. }));
        assert!(message.contains("Holder"));
        assert!(message.contains("Passport"));
    }

    #[test]
    fn test_one_side_owning_foreign_key_accepted() {
        let passport = ClassDef::new("Hr", "Passport")
            .with_prop(PropDef::new("PassportId", PropertyType::Guid))
            .with_prop(PropDef::new("HolderId", PropertyType::Guid))
            .with_primary_key(PrimaryKeyDef::object_id("PassportId"))
            .with_relationship(
                RelationshipDef::single(
                    "Holder",
                    ClassRef::new("Hr", "Holder"),
                    RelKeyDef::single("HolderId", "HolderKey"),
                )
                .with_reverse("Passport"),
            );
        let holder = ClassDef::new("Hr", "Holder")
            .with_prop(PropDef::new("HolderKey", PropertyType::Guid))
            .with_primary_key(PrimaryKeyDef::new(&["HolderKey"]))
            .with_relationship(
                RelationshipDef::single(
                    "Passport",
                    ClassRef::new("Hr", "Passport"),
                    RelKeyDef::single("HolderKey", "HolderId"),
                )
                .with_reverse("Holder"),
            );
        let mut col = ClassDefCol::new();
        col.add(passport).unwrap();
        let holder_id = col.add(holder).unwrap();

        let defs = validate(col).unwrap();
        let rel = defs.relationship(defs.find_relationship(holder_id, "Passport").unwrap());
        assert!(rel.owning_bo_has_primary_key);
        assert!(!rel.owning_bo_has_foreign_key);
    }
}
