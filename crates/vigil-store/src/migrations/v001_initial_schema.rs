//! v001: patients, activity_records, alerts, alert_notes.

use rusqlite::Connection;

use vigil_core::errors::VigilResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> VigilResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS patients (
            id                  TEXT PRIMARY KEY,
            display_name        TEXT NOT NULL,
            monitoring_enabled  INTEGER NOT NULL DEFAULT 1,
            contacts            TEXT NOT NULL DEFAULT '[]',
            caregiver_contacts  TEXT NOT NULL DEFAULT '[]',
            device_ids          TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS activity_records (
            id          TEXT PRIMARY KEY,
            patient_id  TEXT NOT NULL,
            source      TEXT NOT NULL,
            recorded_at TEXT NOT NULL,
            detail      TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_activity_patient_time
            ON activity_records(patient_id, recorded_at DESC);

        CREATE TABLE IF NOT EXISTS alerts (
            id                 TEXT PRIMARY KEY,
            patient_id         TEXT NOT NULL,
            kind               TEXT NOT NULL,
            severity           TEXT NOT NULL,
            state              TEXT NOT NULL,
            created_at         TEXT NOT NULL,
            state_entered_at   TEXT NOT NULL,
            cause_activity_id  TEXT,
            resolved_by        TEXT,
            resolved_at        TEXT,
            resolution_reason  TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_alerts_patient ON alerts(patient_id);

        -- The single-active-alert invariant, enforced at the schema level:
        -- at most one non-terminal row per (patient, kind).
        CREATE UNIQUE INDEX IF NOT EXISTS idx_alerts_one_active
            ON alerts(patient_id, kind)
            WHERE state IN ('awaiting_checkin', 'escalated');

        CREATE TABLE IF NOT EXISTS alert_notes (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            alert_id    TEXT NOT NULL,
            note        TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_notes_alert ON alert_notes(alert_id);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
