//! Database schema migrations for SQLite.
//!
//! A simple versioned migration system. Each migration transforms the schema
//! from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, TransportError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// Idempotent: safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, crate::now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::debug!(from = current, to = CURRENT_VERSION, "migrated schema");
    } else if current > CURRENT_VERSION {
        return Err(TransportError::Migration(format!(
            "database schema version {current} is newer than supported {CURRENT_VERSION}"
        )));
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(TransportError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Registered clients and their credentials
        CREATE TABLE clients (
            client_id BLOB PRIMARY KEY,        -- 16 bytes, UUID
            api_key_id TEXT NOT NULL UNIQUE,
            secret_hash BLOB NOT NULL,         -- 32 bytes, BLAKE3 of api secret
            public_key BLOB NOT NULL,          -- 32 bytes, X25519
            signing_key BLOB NOT NULL,         -- 32 bytes, Ed25519
            registered_at INTEGER NOT NULL
        );

        -- Encrypted records; seq gives insertion order
        CREATE TABLE records (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            record_id BLOB NOT NULL UNIQUE,    -- 16 bytes, UUID
            writer_id BLOB NOT NULL,
            user_id BLOB NOT NULL,
            record_type TEXT NOT NULL,
            created_at INTEGER NOT NULL,       -- Unix ms
            encrypted_data BLOB NOT NULL,
            encrypted_record_key BLOB NOT NULL,
            signature BLOB NOT NULL            -- 64 bytes, Ed25519
        );

        -- Access grants: one wrapped access key per reader
        CREATE TABLE grants (
            writer_id BLOB NOT NULL,
            user_id BLOB NOT NULL,
            reader_id BLOB NOT NULL,
            record_type TEXT NOT NULL,
            wrapped_key BLOB NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (writer_id, user_id, record_type, reader_id)
        );

        CREATE INDEX idx_records_type ON records(record_type);
        CREATE INDEX idx_records_tuple ON records(writer_id, user_id, record_type);
        CREATE INDEX idx_grants_reader ON grants(reader_id);
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"clients".to_string()));
        assert!(tables.contains(&"records".to_string()));
        assert!(tables.contains(&"grants".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (99, 0)",
            [],
        )
        .unwrap();

        assert!(matches!(
            migrate(&mut conn),
            Err(TransportError::Migration(_))
        ));
    }
}
