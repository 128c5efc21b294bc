//! Primary key values of business objects
//!
//! A key value lists its members in the order the primary key definition
//! declares them, so single and composite keys share one representation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::Criteria;

/// The value of a primary key, one entry per key property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKeyValue {
    members: Vec<(String, Value)>,
}

impl std::fmt::Display for PrimaryKeyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.members.as_slice() {
            [(_, value)] => write!(f, "{}", display_value(value)),
            members => {
                let pairs: Vec<String> = members
                    .iter()
                    .map(|(k, v)| format!("{}:{}", k, display_value(v)))
                    .collect();
                write!(f, "{}", pairs.join(","))
            }
        }
    }
}

pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

impl PrimaryKeyValue {
    pub fn new(members: Vec<(String, Value)>) -> Self {
        Self { members }
    }

    pub fn single(property_name: impl Into<String>, value: Value) -> Self {
        Self::new(vec![(property_name.into(), value)])
    }

    pub fn members(&self) -> &[(String, Value)] {
        &self.members
    }

    pub fn value(&self, property_name: &str) -> Option<&Value> {
        self.members
            .iter()
            .find(|(name, _)| name == property_name)
            .map(|(_, value)| value)
    }

    /// A key is usable only when it has members and none of them is null
    pub fn is_valid(&self) -> bool {
        !self.members.is_empty() && self.members.iter().all(|(_, v)| !v.is_null())
    }

    /// `member = value` for every member
    pub fn to_criteria(&self) -> Criteria {
        self.members
            .iter()
            .fold(Criteria::new(), |criteria, (name, value)| {
                criteria.and_equal(name.clone(), value.clone())
            })
    }
}
