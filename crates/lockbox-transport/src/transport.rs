//! Transport trait: the client's view of the record service.
//!
//! A transport is bound to one authenticated client. Every call is a single
//! request/response; retries and timeouts, if any, belong to the
//! implementation.

use async_trait::async_trait;
use std::sync::Arc;

use lockbox_core::{ClientId, ClientInfo, Meta, RecordId, RecordType};

use crate::error::Result;
use crate::types::{EncryptedRecord, GrantKey, ListQuery, NewRecord, StoredGrant};

/// Authenticated access to records, grants and client directory.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Transport: Send + Sync {
    /// The client this transport authenticated as.
    fn client_id(&self) -> ClientId;

    /// Look up the public keys of a registered client.
    ///
    /// Fails with `UnknownClient` if no such client is registered.
    async fn client_info(&self, client_id: &ClientId) -> Result<ClientInfo>;

    /// Store a new record. The caller must be the record's writer.
    ///
    /// Returns the service-assigned metadata.
    async fn put_record(&self, record: NewRecord) -> Result<Meta>;

    /// Fetch a record by id. `None` if no record has this id.
    async fn get_record(&self, record_id: &RecordId) -> Result<Option<EncryptedRecord>>;

    /// List metadata of records visible to the caller, in insertion order.
    async fn list_records(&self, query: &ListQuery) -> Result<Vec<Meta>>;

    /// Delete a record. Only its writer may delete it.
    ///
    /// Returns `false` if no record had this id.
    async fn delete_record(&self, record_id: &RecordId) -> Result<bool>;

    /// Store a grant, replacing any existing grant with the same key.
    async fn put_grant(&self, grant: StoredGrant) -> Result<()>;

    /// Store a grant unless one with the same key exists.
    ///
    /// Returns `false` if the key was taken; the existing grant wins.
    async fn create_grant(&self, grant: StoredGrant) -> Result<bool>;

    /// Fetch a grant.
    async fn get_grant(&self, key: &GrantKey) -> Result<Option<StoredGrant>>;

    /// Delete a grant. Returns `false` if it did not exist.
    async fn delete_grant(&self, key: &GrantKey) -> Result<bool>;

    /// All grants of one (writer, user, type) tuple.
    async fn list_grants(
        &self,
        writer_id: &ClientId,
        user_id: &ClientId,
        record_type: &RecordType,
    ) -> Result<Vec<StoredGrant>>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn client_id(&self) -> ClientId {
        (**self).client_id()
    }

    async fn client_info(&self, client_id: &ClientId) -> Result<ClientInfo> {
        (**self).client_info(client_id).await
    }

    async fn put_record(&self, record: NewRecord) -> Result<Meta> {
        (**self).put_record(record).await
    }

    async fn get_record(&self, record_id: &RecordId) -> Result<Option<EncryptedRecord>> {
        (**self).get_record(record_id).await
    }

    async fn list_records(&self, query: &ListQuery) -> Result<Vec<Meta>> {
        (**self).list_records(query).await
    }

    async fn delete_record(&self, record_id: &RecordId) -> Result<bool> {
        (**self).delete_record(record_id).await
    }

    async fn put_grant(&self, grant: StoredGrant) -> Result<()> {
        (**self).put_grant(grant).await
    }

    async fn create_grant(&self, grant: StoredGrant) -> Result<bool> {
        (**self).create_grant(grant).await
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
