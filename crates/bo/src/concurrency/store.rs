//! Row-level access the concurrency strategies and the committer need

use async_trait::async_trait;

use crate::error::ModelResult;
use crate::metadata::ClassDef;
use crate::object::{PrimaryKeyValue, PropertyValues};
use crate::query::Criteria;

/// The stored rows of business objects, addressed by class and primary key.
///
/// Values are keyed by property name; mapping to fields and tables is up to
/// the implementation.
#[async_trait]
pub trait ConcurrencyStore: Send + Sync {
    /// Current stored values of the named properties, or `None` when the row
    /// no longer exists. An empty property list reads every property.
    async fn read_row(
        &self,
        class_def: &ClassDef,
        key: &PrimaryKeyValue,
        properties: &[&str],
    ) -> ModelResult<Option<PropertyValues>>;

    /// Applies `values` to the row when it also satisfies `guard`; returns
    /// the number of rows changed
    async fn update_row(
        &self,
        class_def: &ClassDef,
        key: &PrimaryKeyValue,
        values: &PropertyValues,
        guard: &Criteria,
    ) -> ModelResult<u64>;

    async fn insert_row(&self, class_def: &ClassDef, values: &PropertyValues) -> ModelResult<()>;
}
