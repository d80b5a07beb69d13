//! In-memory implementation of the engine store. A single mutex around
//! the whole state gives the same atomicity the SQLite store gets from
//! its write transactions, which is exactly what the CAS contract needs.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use vigil_core::errors::{StorageError, VigilResult};
use vigil_core::models::{
    ActivityRecord, Alert, AlertKind, AlertState, AttemptOutcome, NotificationAttempt, Patient,
    RecipientKind, Resolution,
};
use vigil_core::traits::{CreateOutcome, IEngineStore, TransitionOutcome};

#[derive(Default)]
struct Inner {
    patients: HashMap<String, Patient>,
    activity: Vec<ActivityRecord>,
    alerts: HashMap<String, Alert>,
    attempts: Vec<NotificationAttempt>,
    notes: HashMap<String, Vec<String>>,
    /// Patient ids whose reads fail, for error-isolation tests.
    poisoned: HashSet<String>,
}

/// In-memory [`IEngineStore`] for unit and integration tests.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read for this patient fail with a storage error.
    pub fn poison_patient(&self, patient_id: &str) {
        self.inner
            .lock()
            .unwrap()
            .poisoned
            .insert(patient_id.to_string());
    }

    /// All notification attempts, in append order.
    pub fn all_attempts(&self) -> Vec<NotificationAttempt> {
        self.inner.lock().unwrap().attempts.clone()
    }

    /// All alerts, in unspecified order.
    pub fn all_alerts(&self) -> Vec<Alert> {
        self.inner.lock().unwrap().alerts.values().cloned().collect()
    }

    pub fn notes_for(&self, alert_id: &str) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .notes
            .get(alert_id)
            .cloned()
            .unwrap_or_default()
    }

    fn check_poisoned(inner: &Inner, patient_id: &str) -> VigilResult<()> {
        if inner.poisoned.contains(patient_id) {
            return Err(StorageError::Sqlite {
                message: format!("poisoned read for {patient_id}"),
            }
            .into());
        }
        Ok(())
    }
}

impl IEngineStore for InMemoryStore {
    fn patients_with_monitoring_enabled(&self) -> VigilResult<Vec<Patient>> {
        let inner = self.inner.lock().unwrap();
        let mut patients: Vec<Patient> = inner
            .patients
            .values()
            .filter(|p| p.monitoring_enabled)
            .cloned()
            .collect();
        patients.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(patients)
    }

    fn get_patient(&self, patient_id: &str) -> VigilResult<Option<Patient>> {
        Ok(self.inner.lock().unwrap().patients.get(patient_id).cloned())
    }

    fn find_patient_by_device(&self, device_id: &str) -> VigilResult<Option<Patient>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .patients
            .values()
            .find(|p| p.device_ids.iter().any(|d| d == device_id))
            .cloned())
    }

    fn find_patient_by_contact(&self, address: &str) -> VigilResult<Option<Patient>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .patients
            .values()
            .find(|p| {
                p.contacts.iter().any(|c| c.address == address)
                    || p.caregiver_contacts.iter().any(|c| c.address == address)
            })
            .cloned())
    }

    fn put_patient(&self, patient: &Patient) -> VigilResult<()> {
        self.inner
            .lock()
            .unwrap()
            .patients
            .insert(patient.id.clone(), patient.clone());
        Ok(())
    }

    fn append_activity(&self, record: &ActivityRecord) -> VigilResult<()> {
        self.inner.lock().unwrap().activity.push(record.clone());
        Ok(())
    }

    fn latest_activity(&self, patient_id: &str) -> VigilResult<Option<ActivityRecord>> {
        let inner = self.inner.lock().unwrap();
        Self::check_poisoned(&inner, patient_id)?;
        Ok(inner
            .activity
            .iter()
            .filter(|r| r.patient_id == patient_id)
            .max_by_key(|r| r.recorded_at)
            .cloned())
    }

    fn latest_activity_per_patient(&self) -> VigilResult<Vec<ActivityRecord>> {
        let inner = self.inner.lock().unwrap();
        let mut latest: HashMap<String, ActivityRecord> = HashMap::new();
        for record in &inner.activity {
            match latest.get(&record.patient_id) {
                Some(existing) if existing.recorded_at >= record.recorded_at => {}
                _ => {
                    latest.insert(record.patient_id.clone(), record.clone());
                }
            }
        }
        Ok(latest.into_values().collect())
    }

    fn create_alert_if_none_active(&self, alert: &Alert) -> VigilResult<CreateOutcome> {
        let mut inner = self.inner.lock().unwrap();
        let existing = inner
            .alerts
            .values()
            .find(|a| {
                a.patient_id == alert.patient_id && a.kind == alert.kind && !a.state.is_terminal()
            })
            .cloned();
        if let Some(existing) = existing {
            return Ok(CreateOutcome::AlreadyActive(existing));
        }
        inner.alerts.insert(alert.id.clone(), alert.clone());
        Ok(CreateOutcome::Created(alert.clone()))
    }

    fn transition_alert(
        &self,
        alert_id: &str,
        expected: AlertState,
        to: AlertState,
        entered_at: DateTime<Utc>,
        resolution: Option<&Resolution>,
    ) -> VigilResult<TransitionOutcome> {
        let mut inner = self.inner.lock().unwrap();
        let alert = inner.alerts.get_mut(alert_id).ok_or_else(|| {
            vigil_core::VigilError::not_found(format!("alert {alert_id}"))
        })?;
        if alert.state != expected {
            return Ok(TransitionOutcome::PreconditionFailed(alert.clone()));
        }
        alert.state = to;
        alert.state_entered_at = entered_at;
        if let Some(res) = resolution {
            alert.resolution = Some(res.clone());
        }
        Ok(TransitionOutcome::Applied(alert.clone()))
    }

    fn get_alert(&self, alert_id: &str) -> VigilResult<Option<Alert>> {
        Ok(self.inner.lock().unwrap().alerts.get(alert_id).cloned())
    }

    fn active_alert(&self, patient_id: &str, kind: AlertKind) -> VigilResult<Option<Alert>> {
        let inner = self.inner.lock().unwrap();
        Self::check_poisoned(&inner, patient_id)?;
        Ok(inner
            .alerts
            .values()
            .find(|a| a.patient_id == patient_id && a.kind == kind && !a.state.is_terminal())
            .cloned())
    }

    fn alerts_for_patient(&self, patient_id: &str) -> VigilResult<Vec<Alert>> {
        let inner = self.inner.lock().unwrap();
        let mut alerts: Vec<Alert> = inner
            .alerts
            .values()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect();
        alerts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(alerts)
    }

    fn append_resolution_note(&self, alert_id: &str, note: &str) -> VigilResult<()> {
        self.inner
            .lock()
            .unwrap()
            .notes
            .entry(alert_id.to_string())
            .or_default()
            .push(note.to_string());
        Ok(())
    }

    fn append_attempt(&self, attempt: &NotificationAttempt) -> VigilResult<()> {
        self.inner.lock().unwrap().attempts.push(attempt.clone());
        Ok(())
    }

    fn finish_attempt(
        &self,
        attempt_id: &str,
        outcome: AttemptOutcome,
        provider_message_id: Option<&str>,
    ) -> VigilResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(attempt) = inner.attempts.iter_mut().find(|a| a.id == attempt_id) {
            // Terminal outcomes are immutable.
            if attempt.outcome == AttemptOutcome::Pending {
                attempt.outcome = outcome;
                attempt.provider_message_id = provider_message_id.map(str::to_string);
            }
        }
        Ok(())
    }

    fn attempts_for(
        &self,
        alert_id: &str,
        recipient: RecipientKind,
    ) -> VigilResult<Vec<NotificationAttempt>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .attempts
            .iter()
            .filter(|a| a.alert_id == alert_id && a.recipient == recipient)
            .cloned()
            .collect())
    }
}
