use serde::{Deserialize, Serialize};

use crate::constants::MAX_TICK_ERRORS;

/// One per-patient failure surfaced by a tick. Evaluation of the
/// remaining population continues past it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickError {
    pub patient_id: String,
    pub message: String,
}

/// Result of one threshold-evaluation tick. Serialized as the scheduler
/// trigger's JSON response. Never a hard failure unless the store itself
/// was unreachable or configuration was invalid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickSummary {
    pub alerts_created: usize,
    pub check_ins_sent: usize,
    pub escalations_sent: usize,
    pub resolved: usize,
    pub errors: Vec<TickError>,
}

impl TickSummary {
    pub fn record_error(&mut self, patient_id: impl Into<String>, message: impl Into<String>) {
        if self.errors.len() < MAX_TICK_ERRORS {
            self.errors.push(TickError {
                patient_id: patient_id.into(),
                message: message.into(),
            });
        }
    }
}
