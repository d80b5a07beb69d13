use serde::{Deserialize, Serialize};

use super::defaults;
use crate::errors::{VigilError, VigilResult};

/// Ingress rate-limit configuration (fixed window per sender key).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per window per key.
    pub limit: u32,
    /// Window length (seconds).
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: defaults::DEFAULT_RATE_LIMIT,
            window_secs: defaults::DEFAULT_RATE_WINDOW_SECS,
        }
    }
}

impl RateLimitConfig {
    pub fn validate(&self) -> VigilResult<()> {
        if self.limit == 0 {
            return Err(VigilError::config("rate limit must be > 0"));
        }
        if self.window_secs == 0 {
            return Err(VigilError::config("rate window must be > 0"));
        }
        Ok(())
    }
}
