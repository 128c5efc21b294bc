//! Criteria - conjunctions of field comparisons used for lookups and persist guards

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{QueryField, QueryOperator};
use crate::object::PropertyValues;

/// A single field comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub field: QueryField,
    pub operator: QueryOperator,
    pub value: Value,
}

impl Criterion {
    pub fn new(field: QueryField, operator: QueryOperator, value: Value) -> Self {
        Self {
            field,
            operator,
            value,
        }
    }

    /// Evaluates the comparison against in-memory property values
    pub fn matches(&self, values: &PropertyValues) -> bool {
        let actual = values
            .get(&self.field.property_name)
            .unwrap_or(&Value::Null);
        match self.operator {
            QueryOperator::Equal => values_equal(actual, &self.value),
            QueryOperator::NotEqual => !values_equal(actual, &self.value),
            QueryOperator::IsNull => actual.is_null(),
            QueryOperator::IsNotNull => !actual.is_null(),
        }
    }
}

/// Numbers compare by value, so `1` equals `1.0`
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => match (l.as_i64(), r.as_i64()) {
            (Some(l), Some(r)) => l == r,
            _ => l.as_f64() == r.as_f64(),
        },
        _ => left == right,
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            QueryOperator::IsNull | QueryOperator::IsNotNull => {
                write!(f, "{} {}", self.field, self.operator)
            }
            _ => write!(f, "{} {} {}", self.field, self.operator, self.value),
        }
    }
}

/// Conjunction of criteria; empty criteria match everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    criteria: Vec<Criterion>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// `property = value`
    pub fn equal(property: impl Into<String>, value: Value) -> Self {
        Self::new().and_equal(property, value)
    }

    pub fn and(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    pub fn and_equal(self, property: impl Into<String>, value: Value) -> Self {
        self.and(Criterion::new(
            QueryField::new(property),
            QueryOperator::Equal,
            value,
        ))
    }

    pub fn push(&mut self, criterion: Criterion) {
        self.criteria.push(criterion);
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Criterion> {
        self.criteria.iter()
    }

    pub fn matches(&self, values: &PropertyValues) -> bool {
        self.criteria.iter().all(|criterion| criterion.matches(values))
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.criteria.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(" AND "))
    }
}
