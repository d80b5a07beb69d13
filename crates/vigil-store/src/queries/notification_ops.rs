//! Append-only notification attempt log. The dispatcher's idempotency
//! checks read this table; terminal outcomes are never overwritten.

use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

use vigil_core::errors::VigilResult;
use vigil_core::models::{AttemptOutcome, ContactChannel, NotificationAttempt, RecipientKind};

use crate::to_storage_err;

fn enum_err(idx: usize, what: &str, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unknown {what} {raw:?}").into(),
    )
}

fn row_to_attempt(row: &Row<'_>) -> rusqlite::Result<NotificationAttempt> {
    let recipient_raw: String = row.get(2)?;
    let attempted_raw: String = row.get(4)?;
    let outcome_raw: String = row.get(5)?;
    let channel_raw: String = row.get(6)?;

    Ok(NotificationAttempt {
        id: row.get(0)?,
        alert_id: row.get(1)?,
        recipient: RecipientKind::parse(&recipient_raw)
            .ok_or_else(|| enum_err(2, "recipient", &recipient_raw))?,
        attempt_number: row.get(3)?,
        attempted_at: chrono::DateTime::parse_from_rfc3339(&attempted_raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?
            .with_timezone(&chrono::Utc),
        outcome: AttemptOutcome::parse(&outcome_raw)
            .ok_or_else(|| enum_err(5, "outcome", &outcome_raw))?,
        channel: ContactChannel::parse(&channel_raw)
            .ok_or_else(|| enum_err(6, "channel", &channel_raw))?,
        provider_message_id: row.get(7)?,
    })
}

pub fn append(conn: &Connection, attempt: &NotificationAttempt) -> VigilResult<()> {
    conn.execute(
        "INSERT INTO notification_attempts (
            id, alert_id, recipient, attempt_number, attempted_at, outcome,
            channel, provider_message_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            attempt.id,
            attempt.alert_id,
            attempt.recipient.as_str(),
            attempt.attempt_number,
            attempt.attempted_at.to_rfc3339(),
            attempt.outcome.as_str(),
            attempt.channel.as_str(),
            attempt.provider_message_id,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Finalize a pending attempt. The `outcome = 'pending'` guard keeps
/// terminal outcomes immutable.
pub fn finish(
    conn: &Connection,
    attempt_id: &str,
    outcome: AttemptOutcome,
    provider_message_id: Option<&str>,
) -> VigilResult<()> {
    conn.execute(
        "UPDATE notification_attempts
         SET outcome = ?1, provider_message_id = COALESCE(?2, provider_message_id)
         WHERE id = ?3 AND outcome = 'pending'",
        params![outcome.as_str(), provider_message_id, attempt_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn for_alert_recipient(
    conn: &Connection,
    alert_id: &str,
    recipient: RecipientKind,
) -> VigilResult<Vec<NotificationAttempt>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, alert_id, recipient, attempt_number, attempted_at, outcome,
                    channel, provider_message_id
             FROM notification_attempts
             WHERE alert_id = ?1 AND recipient = ?2
             ORDER BY attempt_number",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![alert_id, recipient.as_str()], row_to_attempt)
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut attempts = Vec::new();
    for row in rows {
        attempts.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    Ok(attempts)
}
