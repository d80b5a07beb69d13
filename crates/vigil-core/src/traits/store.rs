use chrono::{DateTime, Utc};

use crate::errors::VigilResult;
use crate::models::{
    ActivityRecord, Alert, AlertKind, AlertState, AttemptOutcome, NotificationAttempt, Patient,
    RecipientKind, Resolution,
};

/// Result of an atomic create-if-none-active.
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    /// This caller created the alert.
    Created(Alert),
    /// A non-terminal alert already existed for (patient, kind); the
    /// existing row is returned and nothing was written.
    AlreadyActive(Alert),
}

impl CreateOutcome {
    pub fn alert(&self) -> &Alert {
        match self {
            Self::Created(a) | Self::AlreadyActive(a) => a,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Result of an atomic transition-if-current-state-matches.
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    /// The precondition held and the transition was applied.
    Applied(Alert),
    /// The alert was no longer in the expected state. The current row is
    /// returned; nothing was written. A lost race is a no-op, not an error.
    PreconditionFailed(Alert),
}

impl TransitionOutcome {
    pub fn alert(&self) -> &Alert {
        match self {
            Self::Applied(a) | Self::PreconditionFailed(a) => a,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Persistence interface consumed by the engine. The store is the single
/// source of truth and the only shared mutable resource; the two alert
/// mutations below are the compare-and-set operations every concurrency
/// guarantee rests on.
pub trait IEngineStore: Send + Sync {
    // --- Patients (read-only to the engine) ---
    fn patients_with_monitoring_enabled(&self) -> VigilResult<Vec<Patient>>;
    fn get_patient(&self, patient_id: &str) -> VigilResult<Option<Patient>>;
    fn find_patient_by_device(&self, device_id: &str) -> VigilResult<Option<Patient>>;
    fn find_patient_by_contact(&self, address: &str) -> VigilResult<Option<Patient>>;
    /// Upsert used by the external profile sync and by tests.
    fn put_patient(&self, patient: &Patient) -> VigilResult<()>;

    // --- Activity (append-only) ---
    fn append_activity(&self, record: &ActivityRecord) -> VigilResult<()>;
    /// Newest record for one patient across all sources.
    fn latest_activity(&self, patient_id: &str) -> VigilResult<Option<ActivityRecord>>;
    /// Newest record per patient, for the tick's bulk read.
    fn latest_activity_per_patient(&self) -> VigilResult<Vec<ActivityRecord>>;

    // --- Alerts (mutated only through CAS) ---
    /// Insert `alert` unless a non-terminal alert already exists for
    /// (patient, kind). Atomic: a losing concurrent writer observes
    /// `AlreadyActive` with the winner's row.
    fn create_alert_if_none_active(&self, alert: &Alert) -> VigilResult<CreateOutcome>;
    /// Move the alert from `expected` to `to`, stamping `entered_at`,
    /// only if it is still in `expected`.
    fn transition_alert(
        &self,
        alert_id: &str,
        expected: AlertState,
        to: AlertState,
        entered_at: DateTime<Utc>,
        resolution: Option<&Resolution>,
    ) -> VigilResult<TransitionOutcome>;
    fn get_alert(&self, alert_id: &str) -> VigilResult<Option<Alert>>;
    /// The non-terminal alert for (patient, kind), if one exists.
    fn active_alert(&self, patient_id: &str, kind: AlertKind) -> VigilResult<Option<Alert>>;
    fn alerts_for_patient(&self, patient_id: &str) -> VigilResult<Vec<Alert>>;
    /// Append-only free-text note on an alert. The only write allowed
    /// once a terminal state is entered.
    fn append_resolution_note(&self, alert_id: &str, note: &str) -> VigilResult<()>;

    // --- Notification attempts (append-only) ---
    fn append_attempt(&self, attempt: &NotificationAttempt) -> VigilResult<()>;
    /// Finalize a pending attempt. Terminal outcomes are immutable.
    fn finish_attempt(
        &self,
        attempt_id: &str,
        outcome: AttemptOutcome,
        provider_message_id: Option<&str>,
    ) -> VigilResult<()>;
    fn attempts_for(
        &self,
        alert_id: &str,
        recipient: RecipientKind,
    ) -> VigilResult<Vec<NotificationAttempt>>;
}
