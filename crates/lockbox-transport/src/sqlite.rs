//! SQLite implementation of the Backend trait.
//!
//! Persistent local backend. Uses rusqlite with bundled SQLite, wrapped in
//! async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use lockbox_core::{
    ClientId, ClientInfo, Ed25519PublicKey, Ed25519Signature, Meta, RecordId, RecordType,
    X25519PublicKey,
};

use crate::backend::Backend;
use crate::error::{Result, TransportError};
use crate::migration;
use crate::types::{EncryptedRecord, GrantKey, ListQuery, Registration, StoredGrant};

/// SQLite-based backend.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| TransportError::Task(format!("mutex poisoned: {e}")))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| TransportError::Task(format!("spawn_blocking failed: {e}")))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row helpers
// ─────────────────────────────────────────────────────────────────────────────

fn fixed<const N: usize>(row: &Row<'_>, idx: usize) -> rusqlite::Result<[u8; N]> {
    let bytes: Vec<u8> = row.get(idx)?;
    bytes.try_into().map_err(|v: Vec<u8>| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Blob,
            format!("expected {N} bytes, got {}", v.len()).into(),
        )
    })
}

fn client_id(row: &Row<'_>, idx: usize) -> rusqlite::Result<ClientId> {
    fixed::<16>(row, idx).map(ClientId::from_bytes)
}

fn record_type(row: &Row<'_>, idx: usize) -> rusqlite::Result<RecordType> {
    let s: String = row.get(idx)?;
    RecordType::new(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Columns: record_id, writer_id, user_id, record_type, created_at.
fn row_to_meta(row: &Row<'_>) -> rusqlite::Result<Meta> {
    Ok(Meta {
        record_id: fixed::<16>(row, 0).map(RecordId::from_bytes)?,
        writer_id: client_id(row, 1)?,
        user_id: client_id(row, 2)?,
        record_type: record_type(row, 3)?,
        created_at: row.get(4)?,
    })
}

/// Meta columns followed by encrypted_data, encrypted_record_key, signature.
fn row_to_record(row: &Row<'_>) -> rusqlite::Result<EncryptedRecord> {
    let encrypted_data: Vec<u8> = row.get(5)?;
    let encrypted_record_key: Vec<u8> = row.get(6)?;
    Ok(EncryptedRecord {
        meta: row_to_meta(row)?,
        encrypted_data: Bytes::from(encrypted_data),
        encrypted_record_key: Bytes::from(encrypted_record_key),
        signature: Ed25519Signature(fixed::<64>(row, 7)?),
    })
}

/// Columns: writer_id, user_id, reader_id, record_type, wrapped_key.
fn row_to_grant(row: &Row<'_>) -> rusqlite::Result<StoredGrant> {
    let wrapped_key: Vec<u8> = row.get(4)?;
    Ok(StoredGrant {
        key: GrantKey {
            writer_id: client_id(row, 0)?,
            user_id: client_id(row, 1)?,
            reader_id: client_id(row, 2)?,
            record_type: record_type(row, 3)?,
        },
        wrapped_key: Bytes::from(wrapped_key),
    })
}

/// Columns: client_id, api_key_id, secret_hash, public_key, signing_key.
fn row_to_registration(row: &Row<'_>) -> rusqlite::Result<Registration> {
    Ok(Registration {
        info: ClientInfo {
            client_id: client_id(row, 0)?,
            public_key: X25519PublicKey(fixed::<32>(row, 3)?),
            signing_key: Ed25519PublicKey(fixed::<32>(row, 4)?),
        },
        api_key_id: row.get(1)?,
        secret_hash: fixed::<32>(row, 2)?,
    })
}

const RECORD_COLUMNS: &str = "record_id, writer_id, user_id, record_type, created_at, \
     encrypted_data, encrypted_record_key, signature";

const REGISTRATION_COLUMNS: &str =
    "client_id, api_key_id, secret_hash, public_key, signing_key";

#[async_trait]
impl Backend for SqliteBackend {
    async fn register(&self, registration: Registration) -> Result<()> {
        self.run(move |conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT api_key_id FROM clients WHERE api_key_id = ?1",
                    params![registration.api_key_id],
                    |row| row.get(0),
                )
                .optional()?;

            if existing.is_some() {
                return Err(TransportError::DuplicateApiKey(registration.api_key_id));
            }

            conn.execute(
                "INSERT INTO clients (
                    client_id, api_key_id, secret_hash, public_key, signing_key, registered_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    registration.info.client_id.as_bytes().as_slice(),
                    registration.api_key_id,
                    registration.secret_hash.as_slice(),
                    registration.info.public_key.as_bytes().as_slice(),
                    registration.info.signing_key.as_bytes().as_slice(),
                    crate::now_millis(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn registration(&self, api_key_id: &str) -> Result<Option<Registration>> {
        let api_key_id = api_key_id.to_string();
        self.run(move |conn| {
            let sql = format!("SELECT {REGISTRATION_COLUMNS} FROM clients WHERE api_key_id = ?1");
            Ok(conn
                .query_row(&sql, params![api_key_id], row_to_registration)
                .optional()?)
        })
        .await
    }

    async fn client_info(&self, client_id: &ClientId) -> Result<Option<ClientInfo>> {
        let client_id = *client_id;
        self.run(move |conn| {
            let sql = format!("SELECT {REGISTRATION_COLUMNS} FROM clients WHERE client_id = ?1");
            let registration = conn
                .query_row(
                    &sql,
                    params![client_id.as_bytes().as_slice()],
                    row_to_registration,
                )
                .optional()?;
            Ok(registration.map(|r| r.info))
        })
        .await
    }

    async fn insert_record(&self, record: EncryptedRecord) -> Result<()> {
        self.run(move |conn| {
            let meta = &record.meta;
            conn.execute(
                "INSERT INTO records (
                    record_id, writer_id, user_id, record_type, created_at,
                    encrypted_data, encrypted_record_key, signature
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    meta.record_id.as_bytes().as_slice(),
                    meta.writer_id.as_bytes().as_slice(),
                    meta.user_id.as_bytes().as_slice(),
                    meta.record_type.as_str(),
                    meta.created_at,
                    record.encrypted_data.as_ref(),
                    record.encrypted_record_key.as_ref(),
                    record.signature.as_bytes().as_slice(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_record(&self, record_id: &RecordId) -> Result<Option<EncryptedRecord>> {
        let record_id = *record_id;
        self.run(move |conn| {
            let sql = format!("SELECT {RECORD_COLUMNS} FROM records WHERE record_id = ?1");
            Ok(conn
                .query_row(&sql, params![record_id.as_bytes().as_slice()], row_to_record)
                .optional()?)
        })
        .await
    }

    async fn list_records(&self, viewer: &ClientId, query: &ListQuery) -> Result<Vec<Meta>> {
        let viewer = *viewer;
        let query = query.clone();
        self.run(move |conn| {
            let mut sql = String::from(
                "SELECT r.record_id, r.writer_id, r.user_id, r.record_type, r.created_at
                 FROM records r
                 WHERE (r.writer_id = ?1 OR r.user_id = ?1 OR EXISTS (
                     SELECT 1 FROM grants g
                     WHERE g.writer_id = r.writer_id AND g.user_id = r.user_id
                       AND g.record_type = r.record_type AND g.reader_id = ?1))",
            );
            let mut values = vec![Value::Blob(viewer.as_bytes().to_vec())];

            if !query.record_types.is_empty() {
                let placeholders: Vec<String> = (0..query.record_types.len())
                    .map(|i| format!("?{}", values.len() + i + 1))
                    .collect();
                sql.push_str(&format!(
                    " AND r.record_type IN ({})",
                    placeholders.join(", ")
                ));
                values.extend(
                    query
                        .record_types
                        .iter()
                        .map(|t| Value::Text(t.as_str().to_string())),
                );
            }

            sql.push_str(&format!(
                " ORDER BY r.seq LIMIT ?{} OFFSET ?{}",
                values.len() + 1,
                values.len() + 2
            ));
            values.push(Value::Integer(i64::try_from(query.limit).unwrap_or(i64::MAX)));
            values.push(Value::Integer(i64::try_from(query.offset).unwrap_or(i64::MAX)));

            let mut stmt = conn.prepare(&sql)?;
            let metas = stmt
                .query_map(params_from_iter(values.iter()), row_to_meta)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(metas)
        })
        .await
    }

    async fn delete_record(&self, record_id: &RecordId) -> Result<bool> {
        let record_id = *record_id;
        self.run(move |conn| {
            let n = conn.execute(
                "DELETE FROM records WHERE record_id = ?1",
                params![record_id.as_bytes().as_slice()],
            )?;
            Ok(n > 0)
        })
        .await
    }

    async fn upsert_grant(&self, grant: StoredGrant) -> Result<()> {
        self.run(move |conn| {
            let key = &grant.key;
            conn.execute(
                "INSERT INTO grants (
                    writer_id, user_id, reader_id, record_type, wrapped_key, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT (writer_id, user_id, record_type, reader_id) DO UPDATE SET
                    wrapped_key = excluded.wrapped_key,
                    updated_at = excluded.updated_at",
                params![
                    key.writer_id.as_bytes().as_slice(),
                    key.user_id.as_bytes().as_slice(),
                    key.reader_id.as_bytes().as_slice(),
                    key.record_type.as_str(),
                    grant.wrapped_key.as_ref(),
                    crate::now_millis(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn insert_grant(&self, grant: StoredGrant) -> Result<bool> {
        self.run(move |conn| {
            let key = &grant.key;
            let n = conn.execute(
                "INSERT INTO grants (
                    writer_id, user_id, reader_id, record_type, wrapped_key, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT (writer_id, user_id, record_type, reader_id) DO NOTHING",
                params![
                    key.writer_id.as_bytes().as_slice(),
                    key.user_id.as_bytes().as_slice(),
                    key.reader_id.as_bytes().as_slice(),
                    key.record_type.as_str(),
                    grant.wrapped_key.as_ref(),
                    crate::now_millis(),
                ],
            )?;
            Ok(n > 0)
        })
        .await
    }

    async fn get_grant(&self, key: &GrantKey) -> Result<Option<StoredGrant>> {
        let key = key.clone();
        self.run(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT writer_id, user_id, reader_id, record_type, wrapped_key
                     FROM grants
                     WHERE writer_id = ?1 AND user_id = ?2 AND reader_id = ?3
                       AND record_type = ?4",
                    params![
                        key.writer_id.as_bytes().as_slice(),
                        key.user_id.as_bytes().as_slice(),
                        key.reader_id.as_bytes().as_slice(),
                        key.record_type.as_str(),
                    ],
                    row_to_grant,
                )
                .optional()?)
        })
        .await
    }

    async fn delete_grant(&self, key: &GrantKey) -> Result<bool> {
        let key = key.clone();
        self.run(move |conn| {
            let n = conn.execute(
                "DELETE FROM grants
                 WHERE writer_id = ?1 AND user_id = ?2 AND reader_id = ?3
                   AND record_type = ?4",
                params![
                    key.writer_id.as_bytes().as_slice(),
                    key.user_id.as_bytes().as_slice(),
                    key.reader_id.as_bytes().as_slice(),
                    key.record_type.as_str(),
                ],
            )?;
            Ok(n > 0)
        })
        .await
    }

    async fn list_grants(
        &self,
        writer_id: &ClientId,
        user_id: &ClientId,
        record_type: &RecordType,
    ) -> Result<Vec<StoredGrant>> {
        let writer_id = *writer_id;
        let user_id = *user_id;
        let record_type = record_type.clone();
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT writer_id, user_id, reader_id, record_type, wrapped_key
                 FROM grants
                 WHERE writer_id = ?1 AND user_id = ?2 AND record_type = ?3
                 ORDER BY reader_id",
            )?;
            let grants = stmt
                .query_map(
                    params![
                        writer_id.as_bytes().as_slice(),
                        user_id.as_bytes().as_slice(),
                        record_type.as_str(),
                    ],
                    row_to_grant,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(grants)
        })
        .await
    }
}
