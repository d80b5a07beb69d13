use std::collections::HashMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::defaults;
use crate::errors::{VigilError, VigilResult};
use crate::models::AlertKind;

/// Resolved thresholds for one patient, after overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub soft_threshold: Duration,
    pub escalation_window: Duration,
}

/// Per-patient threshold overrides. Absent fields fall back to the
/// deployment-wide values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientThresholds {
    pub soft_threshold_secs: Option<u64>,
    pub escalation_window_secs: Option<u64>,
}

/// Monitoring thresholds and escalation policy. Read-only to the engine
/// at evaluation time; externally managed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Silence duration before a check-in prompt (seconds).
    pub soft_threshold_secs: u64,
    /// Additional silence after the check-in prompt before caregiver
    /// escalation (seconds).
    pub escalation_window_secs: u64,
    /// How long an ESCALATED alert may sit unacknowledged before the
    /// caregiver notification is re-issued. None disables re-notification.
    pub escalated_renotify_secs: Option<u64>,
    /// Alert kinds that skip the soft check-in stage entirely.
    pub bypass_soft_stage: Vec<AlertKind>,
    /// Per-patient overrides, keyed by patient id.
    pub patient_overrides: HashMap<String, PatientThresholds>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            soft_threshold_secs: defaults::DEFAULT_SOFT_THRESHOLD_SECS,
            escalation_window_secs: defaults::DEFAULT_ESCALATION_WINDOW_SECS,
            escalated_renotify_secs: None,
            bypass_soft_stage: vec![AlertKind::FallDetected],
            patient_overrides: HashMap::new(),
        }
    }
}

impl MonitoringConfig {
    /// Thresholds for one patient, applying any override.
    pub fn thresholds_for(&self, patient_id: &str) -> Thresholds {
        let ov = self.patient_overrides.get(patient_id);
        let soft = ov
            .and_then(|o| o.soft_threshold_secs)
            .unwrap_or(self.soft_threshold_secs);
        let window = ov
            .and_then(|o| o.escalation_window_secs)
            .unwrap_or(self.escalation_window_secs);
        Thresholds {
            soft_threshold: Duration::seconds(soft as i64),
            escalation_window: Duration::seconds(window as i64),
        }
    }

    pub fn bypasses_soft_stage(&self, kind: AlertKind) -> bool {
        self.bypass_soft_stage.contains(&kind)
    }

    /// Reject unusable thresholds. Proceeding with a zero threshold would
    /// open an alert on every tick.
    pub fn validate(&self) -> VigilResult<()> {
        if self.soft_threshold_secs == 0 {
            return Err(VigilError::config("soft_threshold_secs must be > 0"));
        }
        if self.escalation_window_secs == 0 {
            return Err(VigilError::config("escalation_window_secs must be > 0"));
        }
        if self.escalated_renotify_secs == Some(0) {
            return Err(VigilError::config("escalated_renotify_secs must be > 0"));
        }
        for (patient_id, ov) in &self.patient_overrides {
            if ov.soft_threshold_secs == Some(0) || ov.escalation_window_secs == Some(0) {
                return Err(VigilError::config(format!(
                    "zero threshold override for patient {patient_id}"
                )));
            }
        }
        Ok(())
    }
}
