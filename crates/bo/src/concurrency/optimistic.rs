//! Optimistic concurrency - a version number guards every update

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    object_label, parse_timestamp, string_value, timestamp_value, ConcurrencyControl,
    ConcurrencyStore,
};
use crate::config::LockIdentity;
use crate::error::{ConcurrencyError, ModelError, ModelResult};
use crate::object::BusinessObject;
use crate::query::Criteria;

/// Properties holding the version and the optional last-update stamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionProperties {
    pub version: String,
    pub date_last_updated: Option<String>,
    pub user_last_updated: Option<String>,
    pub machine_last_updated: Option<String>,
}

impl Default for VersionProperties {
    fn default() -> Self {
        Self {
            version: "VersionNumber".to_string(),
            date_last_updated: None,
            user_last_updated: None,
            machine_last_updated: None,
        }
    }
}

impl VersionProperties {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }

    pub fn with_last_updated(
        mut self,
        date: impl Into<String>,
        user: impl Into<String>,
        machine: impl Into<String>,
    ) -> Self {
        self.date_last_updated = Some(date.into());
        self.user_last_updated = Some(user.into());
        self.machine_last_updated = Some(machine.into());
        self
    }

    fn stamp_properties(&self) -> impl Iterator<Item = &str> {
        [
            &self.date_last_updated,
            &self.user_last_updated,
            &self.machine_last_updated,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
    }
}

#[derive(Debug)]
struct PersistAttempt {
    previous_version: i64,
    previous_stamps: Vec<(String, Value)>,
}

pub struct OptimisticVersionControl {
    store: Arc<dyn ConcurrencyStore>,
    properties: VersionProperties,
    identity: LockIdentity,
    attempt: Option<PersistAttempt>,
}

impl OptimisticVersionControl {
    pub fn new(store: Arc<dyn ConcurrencyStore>, properties: VersionProperties) -> Self {
        Self {
            store,
            properties,
            identity: LockIdentity::current(),
            attempt: None,
        }
    }

    pub fn with_identity(mut self, identity: LockIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn properties(&self) -> &VersionProperties {
        &self.properties
    }

    fn version_of(&self, bo: &BusinessObject) -> i64 {
        bo.get_value(&self.properties.version).as_i64().unwrap_or(0)
    }

    fn deleted(bo: &BusinessObject) -> ModelError {
        ConcurrencyError::DeletedConcurrently {
            class: bo.class_name().to_string(),
            object: object_label(bo),
        }
        .into()
    }
}

#[async_trait::async_trait]
impl ConcurrencyControl for OptimisticVersionControl {
    async fn check_before_begin_edit(&mut self, bo: &BusinessObject) -> ModelResult<()> {
        if bo.is_new() {
            return Ok(());
        }
        let key = bo.require_primary_key()?;
        let row = self
            .store
            .read_row(bo.class_def(), &key, &[self.properties.version.as_str()])
            .await?;
        let Some(row) = row else {
            warn!("{} {} was deleted by another user", bo.class_name(), key);
            return Err(Self::deleted(bo));
        };

        let stored = row
            .get(&self.properties.version)
            .and_then(Value::as_i64)
            .unwrap_or(0);
        let in_memory = self.version_of(bo);
        if stored != in_memory {
            warn!(
                "{} {} is at version {} in the store but {} in memory",
                bo.class_name(),
                key,
                stored,
                in_memory
            );
            return Err(ConcurrencyError::BeginEditConflict {
                class: bo.class_name().to_string(),
                object: key.to_string(),
                in_memory_version: in_memory,
                stored_version: stored,
            }
            .into());
        }
        Ok(())
    }

    async fn check_before_persist(&mut self, bo: &BusinessObject) -> ModelResult<()> {
        let previous_version = self.version_of(bo);
        let previous_stamps = self
            .properties
            .stamp_properties()
            .map(|name| (name.to_string(), bo.get_value(name)))
            .collect();
        self.attempt = Some(PersistAttempt {
            previous_version,
            previous_stamps,
        });

        bo.set_value_internal(&self.properties.version, Value::from(previous_version + 1), false);
        if let Some(date) = &self.properties.date_last_updated {
            bo.set_value_internal(date, timestamp_value(Utc::now()), false);
        }
        if let Some(user) = &self.properties.user_last_updated {
            bo.set_value_internal(user, Value::String(self.identity.user_name.clone()), false);
        }
        if let Some(machine) = &self.properties.machine_last_updated {
            bo.set_value_internal(machine, Value::String(self.identity.machine_name.clone()), false);
        }
        debug!(
            "Persisting {} at version {}",
            bo.class_name(),
            previous_version + 1
        );
        Ok(())
    }

    fn persist_criteria(&self, bo: &BusinessObject) -> Criteria {
        match &self.attempt {
            Some(attempt) if !bo.is_new() => {
                Criteria::equal(self.properties.version.clone(), Value::from(attempt.previous_version))
            }
            _ => Criteria::new(),
        }
    }

    async fn resolve_conflict(&self, bo: &BusinessObject) -> ModelError {
        let key = match bo.require_primary_key() {
            Ok(key) => key,
            Err(err) => return err,
        };
        let mut properties = vec![self.properties.version.as_str()];
        properties.extend(self.properties.stamp_properties());

        let row = match self.store.read_row(bo.class_def(), &key, &properties).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                warn!("{} {} was deleted by another user", bo.class_name(), key);
                return Self::deleted(bo);
            }
            Err(err) => return err,
        };

        let stamp = |name: &Option<String>| {
            name.as_ref()
                .and_then(|name| row.get(name))
                .unwrap_or(&Value::Null)
                .clone()
        };
        let expected_version = self
            .attempt
            .as_ref()
            .map_or_else(|| self.version_of(bo), |a| a.previous_version);
        let stored_version = row.get(&self.properties.version).and_then(Value::as_i64);

        warn!(
            "{} {} was edited by another user (expected version {}, stored {:?})",
            bo.class_name(),
            key,
            expected_version,
            stored_version
        );
        ConcurrencyError::EditedConcurrently {
            class: bo.class_name().to_string(),
            object: key.to_string(),
            expected_version,
            stored_version,
            updated_by: string_value(&stamp(&self.properties.user_last_updated)),
            updated_on: string_value(&stamp(&self.properties.machine_last_updated)),
            updated_at: parse_timestamp(&stamp(&self.properties.date_last_updated)),
        }
        .into()
    }

    fn after_persist(&mut self, _bo: &BusinessObject) {
        self.attempt = None;
    }

    fn rollback_compensation(&mut self, bo: &BusinessObject) {
        let Some(attempt) = self.attempt.take() else {
            return;
        };
        bo.set_value_internal(&self.properties.version, Value::from(attempt.previous_version), false);
        for (name, value) in attempt.previous_stamps {
            bo.set_value_internal(&name, value, false);
        }
        debug!(
            "Rolled {} back to version {}",
            bo.class_name(),
            attempt.previous_version
        );
    }
}
