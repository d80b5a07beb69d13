//! Patient reads plus the upsert used by the external profile sync.

use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

use vigil_core::errors::VigilResult;
use vigil_core::models::Patient;

use crate::to_storage_err;

const PATIENT_COLS: &str =
    "id, display_name, monitoring_enabled, contacts, caregiver_contacts, device_ids";

fn json_col<T: serde::de::DeserializeOwned>(raw: String, idx: usize) -> rusqlite::Result<T> {
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_patient(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        display_name: row.get(1)?,
        monitoring_enabled: row.get::<_, i64>(2)? != 0,
        contacts: json_col(row.get(3)?, 3)?,
        caregiver_contacts: json_col(row.get(4)?, 4)?,
        device_ids: json_col(row.get(5)?, 5)?,
    })
}

fn query_patients(
    conn: &Connection,
    sql: &str,
    args: &[&dyn rusqlite::ToSql],
) -> VigilResult<Vec<Patient>> {
    let mut stmt = conn.prepare(sql).map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(args, row_to_patient)
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    Ok(patients)
}

pub fn upsert(conn: &Connection, patient: &Patient) -> VigilResult<()> {
    let contacts = serde_json::to_string(&patient.contacts)?;
    let caregivers = serde_json::to_string(&patient.caregiver_contacts)?;
    let devices = serde_json::to_string(&patient.device_ids)?;
    conn.execute(
        "INSERT INTO patients (id, display_name, monitoring_enabled, contacts, caregiver_contacts, device_ids)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
            display_name = excluded.display_name,
            monitoring_enabled = excluded.monitoring_enabled,
            contacts = excluded.contacts,
            caregiver_contacts = excluded.caregiver_contacts,
            device_ids = excluded.device_ids",
        params![
            patient.id,
            patient.display_name,
            patient.monitoring_enabled as i64,
            contacts,
            caregivers,
            devices,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get(conn: &Connection, patient_id: &str) -> VigilResult<Option<Patient>> {
    let sql = format!("SELECT {PATIENT_COLS} FROM patients WHERE id = ?1");
    Ok(query_patients(conn, &sql, &[&patient_id])?.into_iter().next())
}

pub fn monitoring_enabled(conn: &Connection) -> VigilResult<Vec<Patient>> {
    let sql =
        format!("SELECT {PATIENT_COLS} FROM patients WHERE monitoring_enabled = 1 ORDER BY id");
    query_patients(conn, &sql, &[])
}

/// Device ids are stored as a JSON array; LIKE on the quoted element is a
/// prefilter, the exact element match confirms.
pub fn find_by_device(conn: &Connection, device_id: &str) -> VigilResult<Option<Patient>> {
    let needle = format!("%{}%", serde_json::to_string(device_id)?);
    let sql = format!("SELECT {PATIENT_COLS} FROM patients WHERE device_ids LIKE ?1");
    let candidates = query_patients(conn, &sql, &[&needle])?;
    Ok(candidates
        .into_iter()
        .find(|p| p.device_ids.iter().any(|d| d == device_id)))
}

pub fn find_by_contact(conn: &Connection, address: &str) -> VigilResult<Option<Patient>> {
    let needle = format!("%{}%", serde_json::to_string(address)?);
    let sql = format!(
        "SELECT {PATIENT_COLS} FROM patients WHERE contacts LIKE ?1 OR caregiver_contacts LIKE ?1"
    );
    let candidates = query_patients(conn, &sql, &[&needle])?;
    Ok(candidates.into_iter().find(|p| {
        p.contacts.iter().any(|c| c.address == address)
            || p.caregiver_contacts.iter().any(|c| c.address == address)
    }))
}
