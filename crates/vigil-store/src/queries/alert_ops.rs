//! Alert rows and the two compare-and-set operations.
//!
//! Both mutations run in an explicit transaction and are backed by the
//! partial unique index on non-terminal (patient, kind): a losing
//! concurrent writer observes the winner's row, never a duplicate.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

use vigil_core::errors::VigilResult;
use vigil_core::models::{Alert, AlertKind, AlertState, Resolution, Severity};
use vigil_core::traits::{CreateOutcome, TransitionOutcome};
use vigil_core::VigilError;

use crate::to_storage_err;

const ALERT_COLS: &str = "id, patient_id, kind, severity, state, created_at, state_entered_at, \
                          cause_activity_id, resolved_by, resolved_at, resolution_reason";

fn enum_err(idx: usize, what: &str, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unknown {what} {raw:?}").into(),
    )
}

fn row_to_alert(row: &Row<'_>) -> rusqlite::Result<Alert> {
    let kind_raw: String = row.get(2)?;
    let severity_raw: String = row.get(3)?;
    let state_raw: String = row.get(4)?;
    let created_raw: String = row.get(5)?;
    let entered_raw: String = row.get(6)?;

    let parse_time = |raw: &str, idx: usize| {
        chrono::DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    };

    let resolved_by: Option<String> = row.get(8)?;
    let resolution = match resolved_by {
        Some(resolved_by) => {
            let resolved_at_raw: String = row.get(9)?;
            Some(Resolution {
                resolved_by,
                resolved_at: parse_time(&resolved_at_raw, 9)?,
                reason: row.get(10)?,
            })
        }
        None => None,
    };

    Ok(Alert {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        kind: AlertKind::parse(&kind_raw).ok_or_else(|| enum_err(2, "alert kind", &kind_raw))?,
        severity: Severity::parse(&severity_raw)
            .ok_or_else(|| enum_err(3, "severity", &severity_raw))?,
        state: AlertState::parse(&state_raw).ok_or_else(|| enum_err(4, "alert state", &state_raw))?,
        created_at: parse_time(&created_raw, 5)?,
        state_entered_at: parse_time(&entered_raw, 6)?,
        cause_activity_id: row.get(7)?,
        resolution,
    })
}

pub fn get(conn: &Connection, alert_id: &str) -> VigilResult<Option<Alert>> {
    let sql = format!("SELECT {ALERT_COLS} FROM alerts WHERE id = ?1");
    let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
    let mut rows = stmt
        .query_map(params![alert_id], row_to_alert)
        .map_err(|e| to_storage_err(e.to_string()))?;
    match rows.next() {
        Some(row) => Ok(Some(row.map_err(|e| to_storage_err(e.to_string()))?)),
        None => Ok(None),
    }
}

pub fn active_for(
    conn: &Connection,
    patient_id: &str,
    kind: AlertKind,
) -> VigilResult<Option<Alert>> {
    let sql = format!(
        "SELECT {ALERT_COLS} FROM alerts
         WHERE patient_id = ?1 AND kind = ?2 AND state IN ('awaiting_checkin', 'escalated')"
    );
    let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
    let mut rows = stmt
        .query_map(params![patient_id, kind.as_str()], row_to_alert)
        .map_err(|e| to_storage_err(e.to_string()))?;
    match rows.next() {
        Some(row) => Ok(Some(row.map_err(|e| to_storage_err(e.to_string()))?)),
        None => Ok(None),
    }
}

pub fn for_patient(conn: &Connection, patient_id: &str) -> VigilResult<Vec<Alert>> {
    let sql = format!(
        "SELECT {ALERT_COLS} FROM alerts WHERE patient_id = ?1 ORDER BY created_at"
    );
    let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![patient_id], row_to_alert)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut alerts = Vec::new();
    for row in rows {
        alerts.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    Ok(alerts)
}

/// Insert unless a non-terminal alert already exists for (patient, kind).
///
/// `INSERT OR IGNORE` against the partial unique index makes the losing
/// writer's insert a no-op; the follow-up select returns the winner's row.
pub fn create_if_none_active(conn: &Connection, alert: &Alert) -> VigilResult<CreateOutcome> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("create_alert begin: {e}")))?;

    let inserted = tx
        .execute(
            "INSERT OR IGNORE INTO alerts (
                id, patient_id, kind, severity, state, created_at, state_entered_at,
                cause_activity_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                alert.id,
                alert.patient_id,
                alert.kind.as_str(),
                alert.severity.as_str(),
                alert.state.as_str(),
                alert.created_at.to_rfc3339(),
                alert.state_entered_at.to_rfc3339(),
                alert.cause_activity_id,
            ],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let outcome = if inserted > 0 {
        CreateOutcome::Created(alert.clone())
    } else {
        let existing = active_for(&tx, &alert.patient_id, alert.kind)?.ok_or_else(|| {
            to_storage_err("insert ignored but no active alert found")
        })?;
        CreateOutcome::AlreadyActive(existing)
    };

    tx.commit()
        .map_err(|e| to_storage_err(format!("create_alert commit: {e}")))?;
    Ok(outcome)
}

/// Move the alert from `expected` to `to` only if it is still in
/// `expected`. Zero rows updated means the precondition no longer holds;
/// the current row is returned and nothing was written.
pub fn transition(
    conn: &Connection,
    alert_id: &str,
    expected: AlertState,
    to: AlertState,
    entered_at: DateTime<Utc>,
    resolution: Option<&Resolution>,
) -> VigilResult<TransitionOutcome> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("transition begin: {e}")))?;

    let updated = tx
        .execute(
            "UPDATE alerts SET
                state = ?1,
                state_entered_at = ?2,
                resolved_by = COALESCE(?3, resolved_by),
                resolved_at = COALESCE(?4, resolved_at),
                resolution_reason = COALESCE(?5, resolution_reason)
             WHERE id = ?6 AND state = ?7",
            params![
                to.as_str(),
                entered_at.to_rfc3339(),
                resolution.map(|r| r.resolved_by.clone()),
                resolution.map(|r| r.resolved_at.to_rfc3339()),
                resolution.map(|r| r.reason.clone()),
                alert_id,
                expected.as_str(),
            ],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let current = get(&tx, alert_id)?
        .ok_or_else(|| VigilError::not_found(format!("alert {alert_id}")))?;

    tx.commit()
        .map_err(|e| to_storage_err(format!("transition commit: {e}")))?;

    if updated > 0 {
        Ok(TransitionOutcome::Applied(current))
    } else {
        Ok(TransitionOutcome::PreconditionFailed(current))
    }
}

pub fn append_note(conn: &Connection, alert_id: &str, note: &str) -> VigilResult<()> {
    conn.execute(
        "INSERT INTO alert_notes (alert_id, note) VALUES (?1, ?2)",
        params![alert_id, note],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
