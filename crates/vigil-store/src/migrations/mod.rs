//! Versioned schema migrations, tracked via `PRAGMA user_version`.

mod v001_initial_schema;
mod v002_notification_tables;

use rusqlite::Connection;

use vigil_core::errors::{StorageError, VigilError, VigilResult};

use crate::to_storage_err;

const MIGRATIONS: &[(u32, fn(&Connection) -> VigilResult<()>)] = &[
    (1, v001_initial_schema::migrate),
    (2, v002_notification_tables::migrate),
];

/// Apply every migration newer than the database's current version.
pub fn run_migrations(conn: &Connection) -> VigilResult<()> {
    let current: u32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;

    for (version, migrate) in MIGRATIONS {
        if *version <= current {
            continue;
        }
        migrate(conn).map_err(|e| {
            VigilError::Storage(StorageError::MigrationFailed {
                version: *version,
                reason: e.to_string(),
            })
        })?;
        conn.pragma_update(None, "user_version", *version)
            .map_err(|e| to_storage_err(e.to_string()))?;
        tracing::debug!(version, "applied migration");
    }
    Ok(())
}

/// Latest schema version this build knows about.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|(v, _)| *v).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent_and_stamp_user_version() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, latest_version());
    }
}
