use serde::{Deserialize, Serialize};

use super::defaults;
use crate::errors::{VigilError, VigilResult};

/// Notification dispatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Maximum delivery attempts per (alert, recipient) pair before the
    /// pair is marked permanently failed.
    pub max_attempts: u32,
    /// Bound on any single outbound send call (seconds).
    pub send_timeout_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::DEFAULT_MAX_SEND_ATTEMPTS,
            send_timeout_secs: defaults::DEFAULT_SEND_TIMEOUT_SECS,
        }
    }
}

impl NotificationConfig {
    pub fn validate(&self) -> VigilResult<()> {
        if self.max_attempts == 0 {
            return Err(VigilError::config("max_attempts must be > 0"));
        }
        if self.send_timeout_secs == 0 {
            return Err(VigilError::config("send_timeout_secs must be > 0"));
        }
        Ok(())
    }
}
