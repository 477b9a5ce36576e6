//! Access keys held through grants.
//!
//! A client never stores an access key itself. It keeps its copy as a grant
//! wrapped for its own identity on the record service, and unwraps it on
//! demand.

use std::sync::Arc;

use tracing::debug;

use lockbox_core::{ClientId, ClientInfo, RecordType};
use lockbox_crypto::{CryptoProvider, EncryptionKey};
use lockbox_transport::{GrantKey, Transport};

use crate::error::{PolicyError, Result};
use crate::grant::{grant_context, AccessGrant};

/// A client's view of the access keys it can use.
pub struct KeyRing<T: ?Sized> {
    transport: Arc<T>,
    crypto: Arc<CryptoProvider>,
}

impl<T: ?Sized> Clone for KeyRing<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            crypto: Arc::clone(&self.crypto),
        }
    }
}

impl<T: Transport + ?Sized> KeyRing<T> {
    pub fn new(transport: Arc<T>, crypto: Arc<CryptoProvider>) -> Self {
        Self { transport, crypto }
    }

    /// The client this key ring belongs to.
    pub fn client_id(&self) -> ClientId {
        self.transport.client_id()
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn crypto(&self) -> &Arc<CryptoProvider> {
        &self.crypto
    }

    /// The caller's access key for a tuple, if it holds a grant.
    pub async fn access_key(
        &self,
        writer_id: &ClientId,
        user_id: &ClientId,
        record_type: &RecordType,
    ) -> Result<Option<EncryptionKey>> {
        let key = GrantKey::new(*writer_id, *user_id, self.client_id(), record_type.clone());

        let Some(stored) = self.transport.get_grant(&key).await? else {
            return Ok(None);
        };

        let grant = AccessGrant::from_stored(stored)?;
        let access_key = self.crypto.unwrap_key(
            &grant.wrapped_key,
            &grant_context(writer_id, user_id, record_type),
        )?;
        Ok(Some(access_key))
    }

    /// Like [`KeyRing::access_key`], but a missing grant is `KeyNotFound`.
    pub async fn require_access_key(
        &self,
        writer_id: &ClientId,
        user_id: &ClientId,
        record_type: &RecordType,
    ) -> Result<EncryptionKey> {
        self.access_key(writer_id, user_id, record_type)
            .await?
            .ok_or_else(|| PolicyError::KeyNotFound {
                writer_id: *writer_id,
                user_id: *user_id,
                record_type: record_type.clone(),
            })
    }

    /// The access key for records this client writes about itself.
    ///
    /// Created on the first write of a type, and stored as the writer's
    /// self-grant. The self-grant is never replaced: when two first writes
    /// race, the loser adopts the key that was stored first.
    pub async fn own_access_key(&self, record_type: &RecordType) -> Result<EncryptionKey> {
        let me = self.client_id();
        if let Some(key) = self.access_key(&me, &me, record_type).await? {
            return Ok(key);
        }

        let access_key = EncryptionKey::generate();
        let grant = self.wrap_for(
            &access_key,
            &self.own_info(),
            &me,
            &me,
            record_type,
        )?;
        if self.transport.create_grant(grant.to_stored()?).await? {
            debug!(record_type = %record_type, "created access key");
            return Ok(access_key);
        }

        debug!(record_type = %record_type, "access key created concurrently");
        self.require_access_key(&me, &me, record_type).await
    }

    /// Wrap an access key for a reader.
    pub fn wrap_for(
        &self,
        access_key: &EncryptionKey,
        reader: &ClientInfo,
        writer_id: &ClientId,
        user_id: &ClientId,
        record_type: &RecordType,
    ) -> Result<AccessGrant> {
        let wrapped_key = self.crypto.wrap_key(
            access_key,
            &reader.public_key,
            &grant_context(writer_id, user_id, record_type),
        )?;

        Ok(AccessGrant {
            writer_id: *writer_id,
            user_id: *user_id,
            reader_id: reader.client_id,
            record_type: record_type.clone(),
            wrapped_key,
        })
    }

    /// This client's public information, built from its own keys.
    pub fn own_info(&self) -> ClientInfo {
        self.crypto.keys().client_info(self.client_id())
    }
}
