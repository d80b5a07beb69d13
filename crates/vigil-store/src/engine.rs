//! StorageEngine — owns the write connection, runs migrations on open,
//! and implements the engine's persistence interface.

use std::path::Path;

use chrono::{DateTime, Utc};

use vigil_core::errors::VigilResult;
use vigil_core::models::{
    ActivityRecord, Alert, AlertKind, AlertState, AttemptOutcome, NotificationAttempt, Patient,
    RecipientKind, Resolution,
};
use vigil_core::traits::{CreateOutcome, IEngineStore, TransitionOutcome};

use crate::migrations;
use crate::pool::WriteConnection;
use crate::queries::{activity_ops, alert_ops, notification_ops, patient_ops};

/// SQLite-backed [`IEngineStore`].
pub struct StorageEngine {
    writer: WriteConnection,
}

impl StorageEngine {
    /// Open a storage engine backed by a file on disk.
    pub fn open(path: &Path) -> VigilResult<Self> {
        let writer = WriteConnection::open(path)?;
        let engine = Self { writer };
        engine.initialize()?;
        Ok(engine)
    }

    /// Open an in-memory storage engine (for testing).
    pub fn open_in_memory() -> VigilResult<Self> {
        let writer = WriteConnection::open_in_memory()?;
        let engine = Self { writer };
        engine.initialize()?;
        Ok(engine)
    }

    fn initialize(&self) -> VigilResult<()> {
        self.writer.with_conn(|conn| {
            migrations::run_migrations(conn)?;
            if !crate::pool::pragmas::verify_wal_mode(conn)? {
                tracing::warn!("journal mode is not WAL");
            }
            Ok(())
        })
    }
}

impl IEngineStore for StorageEngine {
    // --- Patients ---
    fn patients_with_monitoring_enabled(&self) -> VigilResult<Vec<Patient>> {
        self.writer.with_conn(patient_ops::monitoring_enabled)
    }

    fn get_patient(&self, patient_id: &str) -> VigilResult<Option<Patient>> {
        self.writer.with_conn(|conn| patient_ops::get(conn, patient_id))
    }

    fn find_patient_by_device(&self, device_id: &str) -> VigilResult<Option<Patient>> {
        self.writer
            .with_conn(|conn| patient_ops::find_by_device(conn, device_id))
    }

    fn find_patient_by_contact(&self, address: &str) -> VigilResult<Option<Patient>> {
        self.writer
            .with_conn(|conn| patient_ops::find_by_contact(conn, address))
    }

    fn put_patient(&self, patient: &Patient) -> VigilResult<()> {
        self.writer.with_conn(|conn| patient_ops::upsert(conn, patient))
    }

    // --- Activity ---
    fn append_activity(&self, record: &ActivityRecord) -> VigilResult<()> {
        self.writer.with_conn(|conn| activity_ops::append(conn, record))
    }

    fn latest_activity(&self, patient_id: &str) -> VigilResult<Option<ActivityRecord>> {
        self.writer
            .with_conn(|conn| activity_ops::latest_for_patient(conn, patient_id))
    }

    fn latest_activity_per_patient(&self) -> VigilResult<Vec<ActivityRecord>> {
        self.writer.with_conn(activity_ops::latest_per_patient)
    }

    // --- Alerts ---
    fn create_alert_if_none_active(&self, alert: &Alert) -> VigilResult<CreateOutcome> {
        self.writer
            .with_conn(|conn| alert_ops::create_if_none_active(conn, alert))
    }

    fn transition_alert(
        &self,
        alert_id: &str,
        expected: AlertState,
        to: AlertState,
        entered_at: DateTime<Utc>,
        resolution: Option<&Resolution>,
    ) -> VigilResult<TransitionOutcome> {
        self.writer.with_conn(|conn| {
            alert_ops::transition(conn, alert_id, expected, to, entered_at, resolution)
        })
    }

    fn get_alert(&self, alert_id: &str) -> VigilResult<Option<Alert>> {
        self.writer.with_conn(|conn| alert_ops::get(conn, alert_id))
    }

    fn active_alert(&self, patient_id: &str, kind: AlertKind) -> VigilResult<Option<Alert>> {
        self.writer
            .with_conn(|conn| alert_ops::active_for(conn, patient_id, kind))
    }

    fn alerts_for_patient(&self, patient_id: &str) -> VigilResult<Vec<Alert>> {
        self.writer
            .with_conn(|conn| alert_ops::for_patient(conn, patient_id))
    }

    fn append_resolution_note(&self, alert_id: &str, note: &str) -> VigilResult<()> {
        self.writer
            .with_conn(|conn| alert_ops::append_note(conn, alert_id, note))
    }

    // --- Notification attempts ---
    fn append_attempt(&self, attempt: &NotificationAttempt) -> VigilResult<()> {
        self.writer
            .with_conn(|conn| notification_ops::append(conn, attempt))
    }

    fn finish_attempt(
        &self,
        attempt_id: &str,
        outcome: AttemptOutcome,
        provider_message_id: Option<&str>,
    ) -> VigilResult<()> {
        self.writer.with_conn(|conn| {
            notification_ops::finish(conn, attempt_id, outcome, provider_message_id)
        })
    }

    fn attempts_for(
        &self,
        alert_id: &str,
        recipient: RecipientKind,
    ) -> VigilResult<Vec<NotificationAttempt>> {
        self.writer
            .with_conn(|conn| notification_ops::for_alert_recipient(conn, alert_id, recipient))
    }
}
