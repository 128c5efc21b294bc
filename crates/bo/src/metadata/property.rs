//! Property definitions

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared type of a property
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    String,
    Integer,
    Decimal,
    Boolean,
    DateTime,
    /// Globally unique identifier, the type of object-id primary keys
    Guid,
    Other(String),
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyType::String => write!(f, "String"),
            PropertyType::Integer => write!(f, "Integer"),
            PropertyType::Decimal => write!(f, "Decimal"),
            PropertyType::Boolean => write!(f, "Boolean"),
            PropertyType::DateTime => write!(f, "DateTime"),
            PropertyType::Guid => write!(f, "Guid"),
            PropertyType::Other(name) => write!(f, "{}", name),
        }
    }
}

/// When a property may be written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReadWriteRule {
    #[default]
    ReadWrite,
    ReadOnly,
    /// Writable until the first non-null value has been persisted
    WriteOnce,
    /// Writable only while the object has never been persisted
    WriteNew,
}

/// Definition of one property of a class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropDef {
    pub name: String,
    pub property_type: PropertyType,
    #[serde(default)]
    pub compulsory: bool,
    #[serde(default)]
    pub read_write_rule: ReadWriteRule,
    #[serde(default)]
    pub database_field_name: Option<String>,
    #[serde(default)]
    pub default_value: Option<Value>,
}

impl PropDef {
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
            compulsory: false,
            read_write_rule: ReadWriteRule::ReadWrite,
            database_field_name: None,
            default_value: None,
        }
    }

    pub fn compulsory(mut self) -> Self {
        self.compulsory = true;
        self
    }

    pub fn with_read_write_rule(mut self, rule: ReadWriteRule) -> Self {
        self.read_write_rule = rule;
        self
    }

    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.database_field_name = Some(field_name.into());
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Database field, defaulting to the property name
    pub fn field_name(&self) -> &str {
        self.database_field_name.as_deref().unwrap_or(&self.name)
    }
}

/// Ordered collection of a class's own property definitions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropDefCol {
    props: Vec<Arc<PropDef>>,
}

impl PropDefCol {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the definition with the same name
    pub fn add(&mut self, prop: PropDef) {
        match self.props.iter().position(|p| p.name == prop.name) {
            Some(index) => self.props[index] = Arc::new(prop),
            None => self.props.push(Arc::new(prop)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<PropDef>> {
        self.props.iter().find(|p| p.name == name)
    }

    /// Mutable access for metadata normalisation.
    ///
    /// Copies the definition first if it is already shared, so call this before
    /// handing out references.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut PropDef> {
        self.props
            .iter_mut()
            .find(|p| p.name == name)
            .map(Arc::make_mut)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<PropDef>> {
        self.props.iter()
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }
}

impl FromIterator<PropDef> for PropDefCol {
    fn from_iter<I: IntoIterator<Item = PropDef>>(iter: I) -> Self {
        let mut col = PropDefCol::new();
        for prop in iter {
            col.add(prop);
        }
        col
    }
}
