use chrono::{DateTime, Duration, Utc};

/// Counter state for one key's current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    /// Requests counted in the window, including the one just recorded.
    pub count: u32,
    pub window_started_at: DateTime<Utc>,
}

/// Backend for the fixed-window rate limiter. Process-local by default;
/// a multi-instance deployment swaps in a shared store behind the same
/// increment-and-get contract.
pub trait IRateCounterStore: Send + Sync {
    /// Record one request for `key` at `now`. If the key's window has
    /// elapsed, the counter resets to 1 and a new window starts at `now`.
    fn increment(&self, key: &str, window: Duration, now: DateTime<Utc>) -> WindowState;
}
