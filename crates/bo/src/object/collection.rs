//! Collections of business objects loaded for one class and criteria

use std::sync::Arc;

use super::business_object::BoRef;
use crate::metadata::ClassId;
use crate::query::Criteria;

/// Ordered objects of one class, remembering the criteria they were loaded by
#[derive(Debug, Clone)]
pub struct BusinessObjectCollection {
    class_id: ClassId,
    criteria: Criteria,
    items: Vec<BoRef>,
}

impl BusinessObjectCollection {
    pub fn new(class_id: ClassId, criteria: Criteria) -> Self {
        Self {
            class_id,
            criteria,
            items: Vec::new(),
        }
    }

    pub fn with_items(mut self, items: Vec<BoRef>) -> Self {
        self.set_items(items);
        self
    }

    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    pub fn set_criteria(&mut self, criteria: Criteria) {
        self.criteria = criteria;
    }

    pub fn items(&self) -> &[BoRef] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoRef> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&BoRef> {
        self.items.get(index)
    }

    pub fn contains(&self, bo: &BoRef) -> bool {
        self.items.iter().any(|item| Arc::ptr_eq(item, bo))
    }

    /// Appends unless the same instance is already present
    pub fn push(&mut self, bo: BoRef) -> bool {
        if self.contains(&bo) {
            return false;
        }
        self.items.push(bo);
        true
    }

    pub fn remove(&mut self, bo: &BoRef) -> bool {
        let before = self.items.len();
        self.items.retain(|item| !Arc::ptr_eq(item, bo));
        self.items.len() != before
    }

    /// Replaces the contents, dropping repeated instances
    pub fn set_items(&mut self, items: Vec<BoRef>) {
        self.items.clear();
        for item in items {
            self.push(item);
        }
    }
}

impl<'a> IntoIterator for &'a BusinessObjectCollection {
    type Item = &'a BoRef;
    type IntoIter = std::slice::Iter<'a, BoRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
