//! The Client: one identity's view of the record service.
//!
//! Brings the record store and the policy engine together behind a single
//! handle. Record types are accepted as plain strings and validated here.

use std::sync::Arc;

use tracing::{debug, info};

use lockbox_core::{ClientId, ClientInfo, Identity, Meta, Record, RecordData, RecordId, RecordType};
use lockbox_crypto::{CryptoProvider, KeyManager};
use lockbox_policy::{AccessGrant, KeyRing, PolicyEngine, PolicyRequest, Transition};
use lockbox_transport::{ListQuery, LocalTransport, Transport};

use crate::config::{ClientConfig, ConfigError};
use crate::error::Result;
use crate::store::{MetaCursor, RecordStore};

/// A client of the record service, acting as one identity.
pub struct Client<T: ?Sized = dyn Transport> {
    store: RecordStore<T>,
    policy: PolicyEngine<T>,
}

impl<T: ?Sized> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl<T: ?Sized> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl Client {
    /// Connect to the service a configuration names, using its keys.
    pub async fn open(config: &ClientConfig) -> Result<Self> {
        let keys = config.key_manager()?;
        Self::connect(config, keys).await
    }

    /// Connect to the service a configuration names.
    ///
    /// Authenticates the configured credentials, then checks that `keys`
    /// belong to the registered identity.
    pub async fn connect(config: &ClientConfig, keys: impl KeyManager + 'static) -> Result<Self> {
        config.validate_service()?;
        let backend = config.service_url.open()?;
        let transport = LocalTransport::connect(backend, &config.credentials()).await?;
        let transport: Arc<dyn Transport> = Arc::new(transport);

        let client = Self::new(transport, keys);
        client.check_registered_keys().await?;

        info!(client_id = %client.id(), service = %config.service_url, "connected");
        Ok(client)
    }
}

impl<T: Transport + ?Sized> Client<T> {
    pub fn new(transport: Arc<T>, keys: impl KeyManager + 'static) -> Self {
        let keys: Box<dyn KeyManager> = Box::new(keys);
        Self::with_crypto(transport, Arc::new(CryptoProvider::new(keys)))
    }

    pub fn with_crypto(transport: Arc<T>, crypto: Arc<CryptoProvider>) -> Self {
        let keys = KeyRing::new(transport, crypto);
        Self {
            store: RecordStore::with_keys(keys.clone()),
            policy: PolicyEngine::with_keys(keys),
        }
    }

    pub fn id(&self) -> ClientId {
        self.store.keys().client_id()
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.id())
    }

    /// This client's public keys.
    pub fn client_info(&self) -> ClientInfo {
        self.store.keys().own_info()
    }

    pub fn store(&self) -> &RecordStore<T> {
        &self.store
    }

    pub fn policy(&self) -> &PolicyEngine<T> {
        &self.policy
    }

    async fn check_registered_keys(&self) -> Result<()> {
        let registered = self.store.keys().transport().client_info(&self.id()).await?;
        if registered != self.client_info() {
            return Err(ConfigError::InvalidField {
                field: "private_key",
                reason: "does not match the registered public keys".to_string(),
            }
            .into());
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Records
    // ─────────────────────────────────────────────────────────────────────────

    /// Write a record about this client. It is readable by the writer at
    /// once, and by every reader already granted its type.
    pub async fn write(&self, record_type: &str, data: RecordData) -> Result<RecordId> {
        let meta = self.write_meta(record_type, data).await?;
        Ok(meta.record_id)
    }

    /// Like [`Client::write`], returning the full metadata.
    pub async fn write_meta(&self, record_type: &str, data: RecordData) -> Result<Meta> {
        self.store.write(&parse_type(record_type)?, &data).await
    }

    pub async fn read(&self, record_id: &RecordId) -> Result<Record> {
        self.store.read(record_id).await
    }

    pub async fn try_read(&self, record_id: &RecordId) -> Result<Option<Record>> {
        self.store.try_read(record_id).await
    }

    /// One page of visible records, oldest first. An empty type list
    /// matches every type.
    pub async fn list(&self, limit: usize, offset: usize, record_types: &[&str]) -> Result<Vec<Meta>> {
        let query = ListQuery::new(limit, offset).with_types(parse_types(record_types)?);
        self.store.list(&query).await
    }

    /// Every visible record of the given types, fetched lazily.
    pub fn cursor(&self, record_types: &[&str]) -> Result<MetaCursor<T>> {
        Ok(self.store.cursor(parse_types(record_types)?))
    }

    pub async fn delete(&self, record_id: &RecordId) -> Result<()> {
        self.store.delete(record_id).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Access
    // ─────────────────────────────────────────────────────────────────────────

    /// Wrap the access key of (writer, user, type) for `reader_id`.
    pub async fn authorize_reader(
        &self,
        writer_id: &ClientId,
        user_id: &ClientId,
        reader_id: &ClientId,
        record_type: &str,
    ) -> Result<AccessGrant> {
        let record_type = parse_type(record_type)?;
        Ok(self
            .policy
            .authorize_reader(writer_id, user_id, reader_id, &record_type)
            .await?)
    }

    pub async fn set_policy(&self, request: &PolicyRequest) -> Result<Transition> {
        Ok(self.policy.set_policy(request).await?)
    }

    /// Let `reader_id` read this client's records of one type.
    ///
    /// Fails with `KeyNotFound` if nothing of the type was written yet.
    pub async fn share(&self, reader_id: &ClientId, record_type: &str) -> Result<Transition> {
        let me = self.id();
        let request = PolicyRequest::allow(me, me, *reader_id, parse_type(record_type)?);
        let transition = self.set_policy(&request).await?;
        debug!(reader = %reader_id, record_type, ?transition, "share");
        Ok(transition)
    }

    /// Withdraw a reader's access to this client's records of one type.
    pub async fn revoke(&self, reader_id: &ClientId, record_type: &str) -> Result<Transition> {
        let me = self.id();
        let request = PolicyRequest::deny(me, me, *reader_id, parse_type(record_type)?);
        let transition = self.set_policy(&request).await?;
        debug!(reader = %reader_id, record_type, ?transition, "revoke");
        Ok(transition)
    }

    /// Readers of this client's records of one type, itself included.
    pub async fn readers(&self, record_type: &str) -> Result<Vec<ClientId>> {
        let me = self.id();
        let grants = self
            .policy
            .list_grants(&me, &me, &parse_type(record_type)?)
            .await?;
        Ok(grants.into_iter().map(|g| g.reader_id).collect())
    }

    /// Revoke every other reader of one type. Returns how many were removed.
    pub async fn revoke_all(&self, record_type: &str) -> Result<usize> {
        let me = self.id();
        Ok(self
            .policy
            .revoke_all(&me, &me, &parse_type(record_type)?)
            .await?)
    }
}

fn parse_type(record_type: &str) -> Result<RecordType> {
    Ok(RecordType::new(record_type)?)
}

fn parse_types(record_types: &[&str]) -> Result<Vec<RecordType>> {
    record_types.iter().map(|t| parse_type(t)).collect()
}
