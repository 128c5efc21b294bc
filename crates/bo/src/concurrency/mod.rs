//! Concurrency Control - strategies that detect or prevent conflicting edits
//! of the same stored object by independent clients
//!
//! A strategy is attached to a [`BusinessObject`] and consulted when an edit
//! begins and around every persist. Both strategies read and write through a
//! [`ConcurrencyStore`]; neither coordinates threads within one process.

pub mod optimistic;
pub mod pessimistic;
pub mod store;

pub use optimistic::*;
pub use pessimistic::*;
pub use store::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::object::BusinessObject;
use crate::query::Criteria;

#[async_trait]
pub trait ConcurrencyControl: Send + Sync {
    /// Runs before an edit session starts on a stored object
    async fn check_before_begin_edit(&mut self, bo: &BusinessObject) -> ModelResult<()>;

    /// Runs before the object's values are written; may stage values of its own
    async fn check_before_persist(&mut self, bo: &BusinessObject) -> ModelResult<()>;

    /// Extra criteria the stored row must satisfy for the update to apply
    fn persist_criteria(&self, _bo: &BusinessObject) -> Criteria {
        Criteria::new()
    }

    /// Explains why a guarded update applied to no rows
    async fn resolve_conflict(&self, bo: &BusinessObject) -> ModelError;

    /// Runs after the write succeeded
    fn after_persist(&mut self, bo: &BusinessObject);

    /// Releases store-side locks; a no-op when none are held
    async fn release_locks(&mut self, _bo: &BusinessObject) -> ModelResult<()> {
        Ok(())
    }

    /// Restores whatever `check_before_persist` staged, after a failed write
    fn rollback_compensation(&mut self, bo: &BusinessObject);
}

/// Primary key display, or the instance id for objects without a usable key
pub(crate) fn object_label(bo: &BusinessObject) -> String {
    bo.primary_key()
        .map(|key| key.to_string())
        .unwrap_or_else(|| bo.id().to_string())
}

/// Timestamps are stored as RFC 3339 strings
pub(crate) fn timestamp_value(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339())
}

pub(crate) fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

pub(crate) fn string_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
