//! Fixed-window request gate. Intentionally not a sliding window or
//! token bucket: the requirement is bounded abuse protection, not
//! precision. The counter backend is a trait so a multi-instance
//! deployment can swap the process-local map for a shared store.

mod memory_counter;

pub use memory_counter::InMemoryCounterStore;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use vigil_core::config::RateLimitConfig;
use vigil_core::errors::{VigilError, VigilResult};
use vigil_core::traits::IRateCounterStore;

/// Outcome of one rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests left in the current window (0 when rejected).
    pub remaining: u32,
    /// Time until the current window resets.
    pub reset_in: Duration,
}

pub struct RateLimiter {
    counters: Arc<dyn IRateCounterStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(counters: Arc<dyn IRateCounterStore>, config: RateLimitConfig) -> Self {
        Self { counters, config }
    }

    /// Process-local counters, the default single-instance setup.
    pub fn in_memory(config: RateLimitConfig) -> Self {
        Self::new(Arc::new(InMemoryCounterStore::new()), config)
    }

    /// Count this request and decide. The request is counted even when
    /// rejected; an abuser keeps their window saturated.
    pub fn check(&self, key: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let window = Duration::seconds(self.config.window_secs as i64);
        let state = self.counters.increment(key, window, now);

        let elapsed = now - state.window_started_at;
        let reset_in = std::cmp::max(window - elapsed, Duration::zero());

        if state.count <= self.config.limit {
            RateLimitDecision {
                allowed: true,
                remaining: self.config.limit - state.count,
                reset_in,
            }
        } else {
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_in,
            }
        }
    }

    /// [`Self::check`], mapped to the ingress error with a retry-after.
    pub fn enforce(&self, key: &str, now: DateTime<Utc>) -> VigilResult<()> {
        let decision = self.check(key, now);
        if decision.allowed {
            Ok(())
        } else {
            Err(VigilError::RateLimit {
                retry_after_secs: decision.reset_in.num_seconds().max(0) as u64,
            })
        }
    }
}
