//! Key definitions - primary and alternate keys of a class

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::property::PropDef;

/// A key member: a property name until validation resolves it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KeyMember {
    Unresolved(String),
    Resolved(Arc<PropDef>),
}

impl KeyMember {
    pub fn name(&self) -> &str {
        match self {
            KeyMember::Unresolved(name) => name,
            KeyMember::Resolved(prop) => &prop.name,
        }
    }

    pub fn prop_def(&self) -> Option<&Arc<PropDef>> {
        match self {
            KeyMember::Unresolved(_) => None,
            KeyMember::Resolved(prop) => Some(prop),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, KeyMember::Resolved(_))
    }
}

fn unresolved(names: &[&str]) -> Vec<KeyMember> {
    names
        .iter()
        .map(|name| KeyMember::Unresolved((*name).to_string()))
        .collect()
}

/// Alternate (unique) key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyDef {
    pub name: String,
    pub members: Vec<KeyMember>,
    /// Skip the uniqueness check while any member is null
    #[serde(default)]
    pub ignore_if_null: bool,
}

impl KeyDef {
    pub fn new(name: impl Into<String>, property_names: &[&str]) -> Self {
        Self {
            name: name.into(),
            members: unresolved(property_names),
            ignore_if_null: false,
        }
    }

    pub fn ignore_if_null(mut self) -> Self {
        self.ignore_if_null = true;
        self
    }

    pub fn property_names(&self) -> Vec<&str> {
        self.members.iter().map(KeyMember::name).collect()
    }
}

/// Primary key of a class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKeyDef {
    pub members: Vec<KeyMember>,
    /// The key is a single generated object identifier
    #[serde(default)]
    pub is_guid_object_id: bool,
}

impl PrimaryKeyDef {
    pub fn new(property_names: &[&str]) -> Self {
        Self {
            members: unresolved(property_names),
            is_guid_object_id: false,
        }
    }

    /// Single-property object identifier key
    pub fn object_id(property_name: &str) -> Self {
        Self {
            members: unresolved(&[property_name]),
            is_guid_object_id: true,
        }
    }

    pub fn property_names(&self) -> Vec<&str> {
        self.members.iter().map(KeyMember::name).collect()
    }

    /// True when the key consists of exactly the given properties, in any order
    pub fn has_properties(&self, names: &[&str]) -> bool {
        let own = self.property_names();
        own.len() == names.len() && names.iter().all(|name| own.contains(name))
    }
}
