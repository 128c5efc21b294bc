//! Pessimistic concurrency - a stored lock claimed when an edit begins
//!
//! A lock is held while the locked flag is set and its timestamp is younger
//! than the configured duration. Older locks are abandoned and may be
//! re-claimed by anyone.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{
    object_label, parse_timestamp, string_value, timestamp_value, ConcurrencyControl,
    ConcurrencyStore,
};
use crate::config::ConcurrencyConfig;
use crate::error::{ConcurrencyError, ModelError, ModelResult};
use crate::object::{BusinessObject, PropertyValues};
use crate::query::Criteria;

/// Properties holding the lock state of a stored object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockProperties {
    pub locked: String,
    pub lock_time: String,
    pub user_locked: String,
    pub machine_locked: String,
    pub operating_system_user_locked: Option<String>,
}

impl Default for LockProperties {
    fn default() -> Self {
        Self {
            locked: "Locked".to_string(),
            lock_time: "DateTimeLocked".to_string(),
            user_locked: "UserLocked".to_string(),
            machine_locked: "MachineLocked".to_string(),
            operating_system_user_locked: Some("OperatingSystemUserLocked".to_string()),
        }
    }
}

impl LockProperties {
    fn names(&self) -> Vec<&str> {
        let mut names = vec![
            self.locked.as_str(),
            self.lock_time.as_str(),
            self.user_locked.as_str(),
            self.machine_locked.as_str(),
        ];
        names.extend(self.operating_system_user_locked.as_deref());
        names
    }
}

pub struct PessimisticLockControl {
    store: Arc<dyn ConcurrencyStore>,
    properties: LockProperties,
    config: ConcurrencyConfig,
    holds_lock: bool,
    staged: Option<Vec<(String, Value)>>,
}

impl PessimisticLockControl {
    pub fn new(
        store: Arc<dyn ConcurrencyStore>,
        properties: LockProperties,
        config: ConcurrencyConfig,
    ) -> Self {
        Self {
            store,
            properties,
            config,
            holds_lock: false,
            staged: None,
        }
    }

    pub fn holds_lock(&self) -> bool {
        self.holds_lock
    }

    /// A lock taken at `locked_at` is still in force at `now`
    fn lock_in_force(&self, locked_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        locked_at > now - self.config.lock_duration()
    }

    fn deleted(bo: &BusinessObject) -> ModelError {
        ConcurrencyError::DeletedConcurrently {
            class: bo.class_name().to_string(),
            object: object_label(bo),
        }
        .into()
    }

    fn is_ours(&self, row: &PropertyValues) -> bool {
        let identity = &self.config.identity;
        let field = |name: &str| row.get(name).and_then(string_value);
        self.holds_lock
            && field(&self.properties.user_locked).as_deref() == Some(identity.user_name.as_str())
            && field(&self.properties.machine_locked).as_deref()
                == Some(identity.machine_name.as_str())
    }

    /// Matches the stored row only while it still carries this client's claim
    fn claim_criteria(&self, bo: &BusinessObject) -> Criteria {
        let identity = &self.config.identity;
        Criteria::equal(self.properties.locked.clone(), Value::Bool(true))
            .and_equal(
                self.properties.user_locked.clone(),
                Value::String(identity.user_name.clone()),
            )
            .and_equal(
                self.properties.machine_locked.clone(),
                Value::String(identity.machine_name.clone()),
            )
            .and_equal(
                self.properties.lock_time.clone(),
                bo.get_value(&self.properties.lock_time),
            )
    }

    async fn claim(&mut self, bo: &BusinessObject) -> ModelResult<()> {
        let key = bo.require_primary_key()?;
        let row = self
            .store
            .read_row(bo.class_def(), &key, &self.properties.names())
            .await?;
        let Some(row) = row else {
            warn!("{} {} was deleted by another user", bo.class_name(), key);
            return Err(Self::deleted(bo));
        };

        let now = Utc::now();
        let locked = row
            .get(&self.properties.locked)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let locked_at = row.get(&self.properties.lock_time).and_then(parse_timestamp);
        if let Some(locked_at) = locked_at.filter(|at| locked && self.lock_in_force(*at, now)) {
            if !self.is_ours(&row) {
                let field = |name: &str| row.get(name).and_then(string_value).unwrap_or_default();
                let locked_by = field(&self.properties.user_locked);
                warn!(
                    "{} {} is locked by {} since {}",
                    bo.class_name(),
                    key,
                    locked_by,
                    locked_at
                );
                return Err(ConcurrencyError::LockedByAnotherUser {
                    class: bo.class_name().to_string(),
                    object: key.to_string(),
                    locked_by,
                    locked_on: field(&self.properties.machine_locked),
                    locked_at,
                }
                .into());
            }
        }

        let identity = &self.config.identity;
        let mut claim = PropertyValues::new();
        claim.insert(self.properties.locked.clone(), Value::Bool(true));
        claim.insert(self.properties.lock_time.clone(), timestamp_value(now));
        claim.insert(
            self.properties.user_locked.clone(),
            Value::String(identity.user_name.clone()),
        );
        claim.insert(
            self.properties.machine_locked.clone(),
            Value::String(identity.machine_name.clone()),
        );
        if let Some(os_user) = &self.properties.operating_system_user_locked {
            claim.insert(
                os_user.clone(),
                Value::String(identity.operating_system_user.clone()),
            );
        }

        // TODO: fold the read and this write into one guarded update so two
        // clients cannot both claim an expired lock
        let affected = self
            .store
            .update_row(bo.class_def(), &key, &claim, &Criteria::new())
            .await?;
        if affected == 0 {
            return Err(Self::deleted(bo));
        }
        info!(
            "{} {} locked by {} on {}",
            bo.class_name(),
            key,
            identity.user_name,
            identity.machine_name
        );
        for (name, value) in claim {
            bo.set_value_internal(&name, value, true);
        }
        self.holds_lock = true;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ConcurrencyControl for PessimisticLockControl {
    async fn check_before_begin_edit(&mut self, bo: &BusinessObject) -> ModelResult<()> {
        if bo.is_new() {
            return Ok(());
        }
        self.claim(bo).await
    }

    async fn check_before_persist(&mut self, bo: &BusinessObject) -> ModelResult<()> {
        if bo.is_new() {
            return Ok(());
        }
        if !self.holds_lock {
            self.claim(bo).await?;
        }

        let locked_at = parse_timestamp(&bo.get_value(&self.properties.lock_time));
        let now = Utc::now();
        match locked_at {
            Some(at) if self.lock_in_force(at, now) => {}
            Some(at) => {
                warn!("Lock on {} {} expired", bo.class_name(), object_label(bo));
                return Err(ConcurrencyError::LockDurationExceeded {
                    class: bo.class_name().to_string(),
                    object: object_label(bo),
                    locked_at: at,
                    duration_minutes: self.config.lock_duration_minutes,
                }
                .into());
            }
            None => {
                return Err(ModelError::InvalidKey(format!(
                    "{} {} has no lock timestamp",
                    bo.class_name(),
                    object_label(bo)
                )))
            }
        }

        self.staged = Some(vec![(
            self.properties.locked.clone(),
            bo.get_value(&self.properties.locked),
        )]);
        bo.set_value_internal(&self.properties.locked, Value::Bool(false), false);
        Ok(())
    }

    async fn resolve_conflict(&self, bo: &BusinessObject) -> ModelError {
        let key = match bo.require_primary_key() {
            Ok(key) => key,
            Err(err) => return err,
        };
        match self.store.read_row(bo.class_def(), &key, &[]).await {
            Ok(None) => Self::deleted(bo),
            Ok(Some(_)) => ModelError::Database(format!(
                "Update of {} {} changed no rows",
                bo.class_name(),
                key
            )),
            Err(err) => err,
        }
    }

    fn after_persist(&mut self, bo: &BusinessObject) {
        if self.staged.take().is_some() {
            self.holds_lock = false;
            debug!("{} {} unlocked by persist", bo.class_name(), object_label(bo));
        }
    }

    async fn release_locks(&mut self, bo: &BusinessObject) -> ModelResult<()> {
        if !self.holds_lock {
            return Ok(());
        }
        let key = bo.require_primary_key()?;
        let mut release = PropertyValues::new();
        release.insert(self.properties.locked.clone(), Value::Bool(false));
        let affected = self
            .store
            .update_row(bo.class_def(), &key, &release, &self.claim_criteria(bo))
            .await?;

        self.holds_lock = false;
        bo.set_value_internal(&self.properties.locked, Value::Bool(false), true);
        if affected == 0 {
            debug!(
                "{} {} lock was already released or claimed by another user",
                bo.class_name(),
                key
            );
            return Ok(());
        }
        info!("{} {} unlocked", bo.class_name(), key);
        Ok(())
    }

    fn rollback_compensation(&mut self, bo: &BusinessObject) {
        if let Some(staged) = self.staged.take() {
            for (name, value) in staged {
                bo.set_value_internal(&name, value, false);
            }
        }
    }
}
