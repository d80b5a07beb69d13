//! Append-only activity sink. Writing the same or an older timestamp
//! twice is harmless: threshold math only ever reads the per-patient max.

use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

use vigil_core::errors::VigilResult;
use vigil_core::models::{ActivityRecord, ActivitySource};

use crate::to_storage_err;

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ActivityRecord> {
    let source_raw: String = row.get(2)?;
    let recorded_raw: String = row.get(3)?;
    let source = ActivitySource::parse(&source_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("unknown activity source {source_raw:?}").into(),
        )
    })?;
    Ok(ActivityRecord {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        source,
        recorded_at: chrono::DateTime::parse_from_rfc3339(&recorded_raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?
            .with_timezone(&chrono::Utc),
        detail: row.get(4)?,
    })
}

pub fn append(conn: &Connection, record: &ActivityRecord) -> VigilResult<()> {
    conn.execute(
        "INSERT INTO activity_records (id, patient_id, source, recorded_at, detail)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            record.id,
            record.patient_id,
            record.source.as_str(),
            record.recorded_at.to_rfc3339(),
            record.detail,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn latest_for_patient(
    conn: &Connection,
    patient_id: &str,
) -> VigilResult<Option<ActivityRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, patient_id, source, recorded_at, detail
             FROM activity_records
             WHERE patient_id = ?1
             ORDER BY recorded_at DESC
             LIMIT 1",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut rows = stmt
        .query_map(params![patient_id], row_to_record)
        .map_err(|e| to_storage_err(e.to_string()))?;
    match rows.next() {
        Some(row) => Ok(Some(row.map_err(|e| to_storage_err(e.to_string()))?)),
        None => Ok(None),
    }
}

/// Newest record per patient, one query for the whole tick.
pub fn latest_per_patient(conn: &Connection) -> VigilResult<Vec<ActivityRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT a.id, a.patient_id, a.source, a.recorded_at, a.detail
             FROM activity_records a
             JOIN (
                 SELECT patient_id, MAX(recorded_at) AS max_ts
                 FROM activity_records
                 GROUP BY patient_id
             ) m ON a.patient_id = m.patient_id AND a.recorded_at = m.max_ts
             GROUP BY a.patient_id",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], row_to_record)
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    Ok(records)
}
