//! Concurrency configuration - lock duration and the identity stamped on locks

use serde::{Deserialize, Serialize};

/// Environment variable overriding the pessimistic lock duration
pub const LOCK_DURATION_ENV: &str = "ELIF_BO_LOCK_DURATION_MINUTES";

/// Environment variable overriding the user name stamped on locks and updates
pub const USER_ENV: &str = "ELIF_BO_USER";

/// Default pessimistic lock duration
pub const DEFAULT_LOCK_DURATION_MINUTES: i64 = 20;

/// Who is editing: stamped on pessimistic locks and optimistic update columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockIdentity {
    pub user_name: String,
    pub machine_name: String,
    pub operating_system_user: String,
}

impl LockIdentity {
    pub fn new(user_name: impl Into<String>, machine_name: impl Into<String>) -> Self {
        let user_name = user_name.into();
        Self {
            operating_system_user: user_name.clone(),
            user_name,
            machine_name: machine_name.into(),
        }
    }

    /// Identity of the current process, read from the environment
    pub fn current() -> Self {
        let os_user = first_env(&["USER", "USERNAME"]);
        let user_name = std::env::var(USER_ENV)
            .ok()
            .filter(|value| !value.is_empty())
            .or_else(|| os_user.clone())
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            user_name,
            machine_name: first_env(&["HOSTNAME", "COMPUTERNAME"])
                .unwrap_or_else(|| "unknown".to_string()),
            operating_system_user: os_user.unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

impl Default for LockIdentity {
    fn default() -> Self {
        Self::current()
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.is_empty())
}

/// Configuration shared by the concurrency control strategies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// How long a pessimistic lock stays valid
    pub lock_duration_minutes: i64,
    /// Identity stamped on locks and update columns
    #[serde(default)]
    pub identity: LockIdentity,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            lock_duration_minutes: DEFAULT_LOCK_DURATION_MINUTES,
            identity: LockIdentity::current(),
        }
    }
}

impl ConcurrencyConfig {
    /// Defaults overridden by `ELIF_BO_LOCK_DURATION_MINUTES` when it parses
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(LOCK_DURATION_ENV) {
            match raw.trim().parse::<i64>() {
                Ok(minutes) if minutes > 0 => config.lock_duration_minutes = minutes,
                _ => tracing::warn!(
                    "Ignoring invalid {} value '{}', using {} minutes",
                    LOCK_DURATION_ENV,
                    raw,
                    config.lock_duration_minutes
                ),
            }
        }
        config
    }

    pub fn with_lock_duration_minutes(mut self, minutes: i64) -> Self {
        self.lock_duration_minutes = minutes;
        self
    }

    pub fn with_identity(mut self, identity: LockIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn lock_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.lock_duration_minutes)
    }
}
