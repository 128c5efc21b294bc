//! Query Sources - the tables/entities a query spans and how they are joined
//!
//! A [`Source`] owns its joins, and every [`Join`] owns the source it leads
//! to, so a source graph is a tree rooted at the query's main entity. Sources
//! are identified by name: two sources with the same name are the same
//! source, whatever their joins look like.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::types::{JoinKind, QueryField};
use crate::error::{ConfigurationError, ModelResult};

/// One queryable entity occurrence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    name: String,
    entity_name: String,
    joins: Vec<Join>,
    inheritance_joins: Vec<Join>,
    is_prepared: bool,
}

/// A directed edge from one source to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    from_source: String,
    to_source: Source,
    kind: JoinKind,
    fields: Vec<JoinField>,
}

/// Pairs a field of the origin source with a field of the target source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinField {
    pub from_field: QueryField,
    pub to_field: QueryField,
}

impl JoinField {
    pub fn new(from_field: QueryField, to_field: QueryField) -> Self {
        Self {
            from_field,
            to_field,
        }
    }
}

impl Source {
    pub fn new(name: impl Into<String>, entity_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_name: entity_name.into(),
            joins: Vec::new(),
            inheritance_joins: Vec::new(),
            is_prepared: false,
        }
    }

    /// Source whose entity name equals its display name
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone(), name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn inheritance_joins(&self) -> &[Join] {
        &self.inheritance_joins
    }

    pub fn is_prepared(&self) -> bool {
        self.is_prepared
    }

    pub fn set_prepared(&mut self, prepared: bool) {
        self.is_prepared = prepared;
    }

    /// Appends a join to `target` unless a join to a source of that name exists.
    ///
    /// Returns the new join so its fields can be filled in, or `None` when the
    /// join was already present.
    pub fn join_to(&mut self, target: Source, kind: JoinKind) -> Option<&mut Join> {
        add_join(&self.name, &mut self.joins, target, kind)
    }

    /// Same as [`Source::join_to`], for joins that exist because this entity
    /// extends `target`.
    pub fn inherit_from(&mut self, target: Source, kind: JoinKind) -> Option<&mut Join> {
        add_join(&self.name, &mut self.inheritance_joins, target, kind)
    }

    /// The target of the first join
    pub fn child_source(&self) -> Option<&Source> {
        self.joins.first().map(|join| &join.to_source)
    }

    pub fn child_source_mut(&mut self) -> Option<&mut Source> {
        self.joins.first_mut().map(|join| &mut join.to_source)
    }

    /// Follows first joins down to the terminal source
    pub fn child_leaf(&self) -> &Source {
        let mut current = self;
        while let Some(child) = current.child_source() {
            current = child;
        }
        current
    }

    pub fn child_leaf_mut(&mut self) -> &mut Source {
        if self.joins.is_empty() {
            return self;
        }
        self.joins[0].to_source.child_leaf_mut()
    }

    /// Depth-first search for a source by name, through both join lists
    pub fn find_source(&self, name: &str) -> Option<&Source> {
        if self.name == name {
            return Some(self);
        }
        self.joins
            .iter()
            .chain(self.inheritance_joins.iter())
            .find_map(|join| join.to_source.find_source(name))
    }

    pub fn find_source_mut(&mut self, name: &str) -> Option<&mut Source> {
        if self.name == name {
            return Some(self);
        }
        self.joins
            .iter_mut()
            .chain(self.inheritance_joins.iter_mut())
            .find_map(|join| join.to_source.find_source_mut(name))
    }

    /// Unifies the join structure of `other` into this source.
    ///
    /// Both sources must have the same name. Joins of `other` missing here are
    /// created with a copy of their fields, then the grandchild lists are merged
    /// recursively. Merging the same source twice changes nothing the second time.
    pub fn merge(&mut self, other: &Source) -> ModelResult<()> {
        if self.name != other.name {
            return Err(ConfigurationError::SourceMismatch {
                source_name: self.name.clone(),
                other: other.name.clone(),
            }
            .into());
        }
        merge_joins(&self.name, &mut self.joins, &other.joins)?;
        merge_joins(&self.name, &mut self.inheritance_joins, &other.inheritance_joins)?;
        self.is_prepared |= other.is_prepared;
        Ok(())
    }

    /// `name[.child.child...]` following the first join at each level
    pub fn to_display_string(&self) -> String {
        self.to_string()
    }

    fn without_joins(&self) -> Source {
        Source {
            name: self.name.clone(),
            entity_name: self.entity_name.clone(),
            joins: Vec::new(),
            inheritance_joins: Vec::new(),
            is_prepared: self.is_prepared,
        }
    }
}

impl PartialEq for Source {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Source {}

impl Hash for Source {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        let mut current = self.child_source();
        while let Some(child) = current {
            write!(f, ".{}", child.name)?;
            current = child.child_source();
        }
        Ok(())
    }
}

impl Join {
    pub fn new(from_source: impl Into<String>, to_source: Source, kind: JoinKind) -> Self {
        Self {
            from_source: from_source.into(),
            to_source,
            kind,
            fields: Vec::new(),
        }
    }

    pub fn from_source(&self) -> &str {
        &self.from_source
    }

    pub fn to_source(&self) -> &Source {
        &self.to_source
    }

    pub fn to_source_mut(&mut self) -> &mut Source {
        &mut self.to_source
    }

    pub fn kind(&self) -> JoinKind {
        self.kind
    }

    pub fn fields(&self) -> &[JoinField] {
        &self.fields
    }

    pub fn add_field(&mut self, from_field: QueryField, to_field: QueryField) -> &mut Self {
        self.fields.push(JoinField::new(from_field, to_field));
        self
    }
}

fn add_join<'a>(
    origin: &str,
    joins: &'a mut Vec<Join>,
    target: Source,
    kind: JoinKind,
) -> Option<&'a mut Join> {
    if joins.iter().any(|join| join.to_source.name == target.name) {
        return None;
    }
    joins.push(Join::new(origin, target, kind));
    joins.last_mut()
}

fn merge_joins(origin: &str, joins: &mut Vec<Join>, other_joins: &[Join]) -> ModelResult<()> {
    for other_join in other_joins {
        let target_name = other_join.to_source.name.as_str();
        let index = match joins.iter().position(|join| join.to_source.name == target_name) {
            Some(index) => index,
            None => {
                let mut join = Join::new(origin, other_join.to_source.without_joins(), other_join.kind);
                join.fields = other_join.fields.clone();
                joins.push(join);
                joins.len() - 1
            }
        };
        joins[index].to_source.merge(&other_join.to_source)?;
    }
    Ok(())
}
