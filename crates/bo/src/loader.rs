//! Loading seam between the relationship engine and the persistence layer

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ModelResult;
use crate::metadata::{ClassId, ValidatedClassDefs};
use crate::object::{BoRef, PrimaryKeyValue};
use crate::query::Criteria;

/// Loads business objects from a store.
///
/// `class_id` may name a class with subclasses; implementations return
/// instances of the most specific class the stored row belongs to.
#[async_trait]
pub trait BusinessObjectLoader: Send + Sync {
    async fn load_by_primary_key(
        &self,
        defs: &Arc<ValidatedClassDefs>,
        class_id: ClassId,
        key: &PrimaryKeyValue,
    ) -> ModelResult<Option<BoRef>>;

    /// The single object matching `criteria`, if any
    async fn load_one(
        &self,
        defs: &Arc<ValidatedClassDefs>,
        class_id: ClassId,
        criteria: &Criteria,
    ) -> ModelResult<Option<BoRef>>;

    /// Every object matching `criteria`, ordered by the named properties
    async fn load_collection(
        &self,
        defs: &Arc<ValidatedClassDefs>,
        class_id: ClassId,
        criteria: &Criteria,
        order_by: &[String],
    ) -> ModelResult<Vec<BoRef>>;
}
