//! Rolling aggregation of tick summaries for health reporting.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use vigil_core::models::TickSummary;

/// Totals across the retained window.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickTotals {
    pub ticks: usize,
    pub alerts_created: usize,
    pub check_ins_sent: usize,
    pub escalations_sent: usize,
    pub resolved: usize,
    pub errored_ticks: usize,
}

/// Keeps recent tick summaries for dashboards and health checks.
#[derive(Debug, Default)]
pub struct TickMetrics {
    entries: Vec<(DateTime<Utc>, TickSummary)>,
}

impl TickMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, at: DateTime<Utc>, summary: TickSummary) {
        self.entries.push((at, summary));
    }

    /// Drop entries older than the retention window.
    pub fn prune(&mut self, now: DateTime<Utc>, retention: Duration) {
        let cutoff = now - retention;
        self.entries.retain(|(at, _)| *at > cutoff);
    }

    pub fn totals(&self) -> TickTotals {
        let mut totals = TickTotals {
            ticks: self.entries.len(),
            ..Default::default()
        };
        for (_, summary) in &self.entries {
            totals.alerts_created += summary.alerts_created;
            totals.check_ins_sent += summary.check_ins_sent;
            totals.escalations_sent += summary.escalations_sent;
            totals.resolved += summary.resolved;
            if !summary.errors.is_empty() {
                totals.errored_ticks += 1;
            }
        }
        totals
    }

    /// Ticks with at least one per-patient error in the last window.
    pub fn errored_recent(&self, now: DateTime<Utc>, window: Duration) -> usize {
        let cutoff = now - window;
        self.entries
            .iter()
            .filter(|(at, summary)| *at > cutoff && !summary.errors.is_empty())
            .count()
    }
}
