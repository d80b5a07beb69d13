//! Default values for all config sections.

/// Silence duration before a check-in prompt is issued (4 hours).
pub const DEFAULT_SOFT_THRESHOLD_SECS: u64 = 4 * 3600;

/// Additional silence after the check-in prompt before caregiver
/// escalation (1 hour).
pub const DEFAULT_ESCALATION_WINDOW_SECS: u64 = 3600;

/// Maximum delivery attempts per (alert, recipient) pair.
pub const DEFAULT_MAX_SEND_ATTEMPTS: u32 = 3;

/// Bound on any single outbound send call.
pub const DEFAULT_SEND_TIMEOUT_SECS: u64 = 10;

/// Ingress rate limit: requests per window per sender key.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// Ingress rate-limit window length.
pub const DEFAULT_RATE_WINDOW_SECS: u64 = 60;
