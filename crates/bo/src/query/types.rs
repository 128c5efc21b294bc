//! Query Types - Join kinds, operators and fields shared by sources and criteria

use std::fmt;

use serde::{Deserialize, Serialize};

/// Criterion operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOperator {
    Equal,
    NotEqual,
    IsNull,
    IsNotNull,
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOperator::Equal => write!(f, "="),
            QueryOperator::NotEqual => write!(f, "<>"),
            QueryOperator::IsNull => write!(f, "IS NULL"),
            QueryOperator::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

/// Join kinds between two sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    LeftOuter,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinKind::Inner => write!(f, "INNER JOIN"),
            JoinKind::LeftOuter => write!(f, "LEFT JOIN"),
        }
    }
}

/// A property of a source, with the database field it maps to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryField {
    pub property_name: String,
    pub field_name: String,
    /// Name of the source the field belongs to; `None` means the root source
    pub source_name: Option<String>,
}

impl QueryField {
    /// Field whose database name equals the property name
    pub fn new(property_name: impl Into<String>) -> Self {
        let property_name = property_name.into();
        Self {
            field_name: property_name.clone(),
            property_name,
            source_name: None,
        }
    }

    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = field_name.into();
        self
    }

    pub fn with_source(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = Some(source_name.into());
        self
    }
}

impl fmt::Display for QueryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source_name {
            Some(source) => write!(f, "{}.{}", source, self.field_name),
            None => write!(f, "{}", self.field_name),
        }
    }
}
