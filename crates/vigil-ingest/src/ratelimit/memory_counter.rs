//! Process-local counter backend over a concurrent map. Windows are
//! created lazily on first request and reset in place once elapsed.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use vigil_core::traits::{IRateCounterStore, WindowState};

#[derive(Default)]
pub struct InMemoryCounterStore {
    windows: DashMap<String, WindowState>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IRateCounterStore for InMemoryCounterStore {
    fn increment(&self, key: &str, window: Duration, now: DateTime<Utc>) -> WindowState {
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert(WindowState {
                count: 0,
                window_started_at: now,
            });
        if now - entry.window_started_at >= window {
            entry.count = 1;
            entry.window_started_at = now;
        } else {
            entry.count += 1;
        }
        *entry
    }
}
