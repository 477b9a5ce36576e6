//! Backend trait: server-side persistence for the local transport.
//!
//! A backend stores what the service would store and applies no access
//! control of its own; [`LocalTransport`](crate::LocalTransport) does the
//! authentication and authorization in front of it.

use async_trait::async_trait;
use std::sync::Arc;

use lockbox_core::{ClientId, ClientInfo, Meta, RecordId, RecordType};

use crate::error::Result;
use crate::types::{EncryptedRecord, GrantKey, ListQuery, Registration, StoredGrant};

/// Async interface for service-side state.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Ordering
///
/// Records are listed in insertion order. Each backend keeps its own
/// monotonically increasing sequence for this.
#[async_trait]
pub trait Backend: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Client directory
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a client. Fails with `DuplicateApiKey` if the api key id is
    /// taken.
    async fn register(&self, registration: Registration) -> Result<()>;

    /// Find a registration by api key id.
    async fn registration(&self, api_key_id: &str) -> Result<Option<Registration>>;

    /// Find a client's public information.
    async fn client_info(&self, client_id: &ClientId) -> Result<Option<ClientInfo>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Records
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a record.
    async fn insert_record(&self, record: EncryptedRecord) -> Result<()>;

    /// Get a record by id.
    async fn get_record(&self, record_id: &RecordId) -> Result<Option<EncryptedRecord>>;

    /// List records visible to `viewer`.
    ///
    /// A record is visible to its writer, its user, and any client holding a
    /// grant for the record's (writer, user, type) tuple.
    async fn list_records(&self, viewer: &ClientId, query: &ListQuery) -> Result<Vec<Meta>>;

    /// Remove a record. Returns `false` if it did not exist.
    async fn delete_record(&self, record_id: &RecordId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Grants
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert or replace a grant.
    async fn upsert_grant(&self, grant: StoredGrant) -> Result<()>;

    /// Insert a grant only if its key is free. Returns `false`, leaving the
    /// stored grant untouched, if one already exists.
    async fn insert_grant(&self, grant: StoredGrant) -> Result<bool>;

    /// Get a grant by key.
    async fn get_grant(&self, key: &GrantKey) -> Result<Option<StoredGrant>>;

    /// Remove a grant. Returns `false` if it did not exist.
    async fn delete_grant(&self, key: &GrantKey) -> Result<bool>;

    /// All grants of one (writer, user, type) tuple, ordered by reader.
    async fn list_grants(
        &self,
        writer_id: &ClientId,
        user_id: &ClientId,
        record_type: &RecordType,
    ) -> Result<Vec<StoredGrant>>;
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for Arc<B> {
    async fn register(&self, registration: Registration) -> Result<()> {
        (**self).register(registration).await
    }

    async fn registration(&self, api_key_id: &str) -> Result<Option<Registration>> {
        (**self).registration(api_key_id).await
    }

    async fn client_info(&self, client_id: &ClientId) -> Result<Option<ClientInfo>> {
        (**self).client_info(client_id).await
    }

    async fn insert_record(&self, record: EncryptedRecord) -> Result<()> {
        (**self).insert_record(record).await
    }

    async fn get_record(&self, record_id: &RecordId) -> Result<Option<EncryptedRecord>> {
        (**self).get_record(record_id).await
    }

    async fn list_records(&self, viewer: &ClientId, query: &ListQuery) -> Result<Vec<Meta>> {
        (**self).list_records(viewer, query).await
    }

    async fn delete_record(&self, record_id: &RecordId) -> Result<bool> {
        (**self).delete_record(record_id).await
    }

    async fn upsert_grant(&self, grant: StoredGrant) -> Result<()> {
        (**self).upsert_grant(grant).await
    }

    async fn insert_grant(&self, grant: StoredGrant) -> Result<bool> {
        (**self).insert_grant(grant).await
    }

    async fn get_grant(&self, key: &GrantKey) -> Result<Option<StoredGrant>> {
        (**self).get_grant(key).await
    }

    async fn delete_grant(&self, key: &GrantKey) -> Result<bool> {
        (**self).delete_grant(key).await
    }

    async fn list_grants(
        &self,
        writer_id: &ClientId,
        user_id: &ClientId,
        record_type: &RecordType,
    ) -> Result<Vec<StoredGrant>> {
        (**self).list_grants(writer_id, user_id, record_type).await
    }
}
