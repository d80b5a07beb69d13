//! Scheduler trigger entry point: shared-secret check, tick execution,
//! and tick metrics recording.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

use vigil_core::errors::{VigilError, VigilResult};
use vigil_core::models::TickSummary;
use vigil_observability::metrics::{TickMetrics, TickTotals};

use crate::evaluator::ThresholdEvaluator;

pub struct TickHandler {
    evaluator: ThresholdEvaluator,
    /// Shared secret the caller must present. None disables the check.
    secret: Option<String>,
    metrics: Mutex<TickMetrics>,
}

impl TickHandler {
    pub fn new(evaluator: ThresholdEvaluator, secret: Option<String>) -> Self {
        Self {
            evaluator,
            secret,
            metrics: Mutex::new(TickMetrics::new()),
        }
    }

    /// Handle one scheduler invocation. Auth is checked before any
    /// processing; the summary is the response body.
    pub fn handle(
        &self,
        provided_secret: Option<&str>,
        now: DateTime<Utc>,
    ) -> VigilResult<TickSummary> {
        if let Some(expected) = &self.secret {
            if provided_secret != Some(expected.as_str()) {
                return Err(VigilError::Auth {
                    message: "missing or invalid scheduler secret".to_string(),
                });
            }
        }

        let summary = self.evaluator.run_tick(now)?;
        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.record(now, summary.clone());
        }
        Ok(summary)
    }

    pub fn metrics_totals(&self) -> TickTotals {
        self.metrics
            .lock()
            .map(|m| m.totals())
            .unwrap_or_default()
    }
}
