//! v002: notification_attempts.

use rusqlite::Connection;

use vigil_core::errors::VigilResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> VigilResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS notification_attempts (
            id                   TEXT PRIMARY KEY,
            alert_id             TEXT NOT NULL,
            recipient            TEXT NOT NULL,
            attempt_number       INTEGER NOT NULL,
            attempted_at         TEXT NOT NULL,
            outcome              TEXT NOT NULL,
            channel              TEXT NOT NULL,
            provider_message_id  TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_attempts_alert_recipient
            ON notification_attempts(alert_id, recipient);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
