//! Relationship key values copied from an owner object

use serde_json::Value;

use crate::metadata::RelKeyDef;
use crate::object::BusinessObject;
use crate::query::Criteria;

/// One owner/related property pair with the owner's current value
#[derive(Debug, Clone, PartialEq)]
pub struct RelProp {
    pub owner_property: String,
    pub related_property: String,
    pub value: Value,
}

/// The relationship key of one owner instance
#[derive(Debug, Clone, PartialEq)]
pub struct RelKey {
    props: Vec<RelProp>,
}

impl RelKey {
    pub fn from_owner(def: &RelKeyDef, owner: &BusinessObject) -> Self {
        let props = def
            .iter()
            .map(|prop| RelProp {
                owner_property: prop.owner_property.clone(),
                related_property: prop.related_property.clone(),
                value: owner.get_value(&prop.owner_property),
            })
            .collect();
        Self { props }
    }

    /// Re-reads the owner's values; true when any of them changed
    pub fn refresh(&mut self, owner: &BusinessObject) -> bool {
        let mut changed = false;
        for prop in &mut self.props {
            let current = owner.get_value(&prop.owner_property);
            if current != prop.value {
                prop.value = current;
                changed = true;
            }
        }
        changed
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelProp> {
        self.props.iter()
    }

    pub fn has_null(&self) -> bool {
        self.props.iter().any(|prop| prop.value.is_null())
    }

    /// `related_property = owner value` for every pair
    pub fn related_criteria(&self) -> Criteria {
        self.props.iter().fold(Criteria::new(), |criteria, prop| {
            criteria.and_equal(prop.related_property.clone(), prop.value.clone())
        })
    }
}
