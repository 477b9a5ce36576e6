//! In-process transport: a [`Transport`] served directly by a [`Backend`].
//!
//! Plays the role of the record service for a client in the same process.
//! Authenticates the client's API credentials once on connect, then checks
//! every request against the caller's identity:
//!
//! - records may only be written and deleted by their writer;
//! - grants may only be created or removed by the writer or user of the
//!   grant's tuple;
//! - a grant may be read by its reader, writer or user.

use std::sync::Arc;

use async_trait::async_trait;
use rand::RngCore;
use tracing::{debug, info};

use lockbox_core::{
    ClientId, ClientInfo, Ed25519PublicKey, Meta, RecordId, RecordType, X25519PublicKey,
};

use crate::backend::Backend;
use crate::error::{Result, TransportError};
use crate::transport::Transport;
use crate::types::{
    Credentials, EncryptedRecord, GrantKey, ListQuery, NewRecord, Registration, StoredGrant,
};

/// Register a new client with a backend and issue its API credentials.
///
/// The client id and api key id are generated; the API secret is returned
/// once and only its hash is kept.
pub async fn register_client<B: Backend + ?Sized>(
    backend: &B,
    public_key: X25519PublicKey,
    signing_key: Ed25519PublicKey,
) -> Result<Credentials> {
    let client_id = ClientId::generate();
    let api_key_id = hex::encode(random_bytes::<16>());
    let api_secret = hex::encode(random_bytes::<32>());

    backend
        .register(Registration {
            info: ClientInfo {
                client_id,
                public_key,
                signing_key,
            },
            api_key_id: api_key_id.clone(),
            secret_hash: *blake3::hash(api_secret.as_bytes()).as_bytes(),
        })
        .await?;

    info!(%client_id, "registered client");

    Ok(Credentials {
        client_id,
        api_key_id,
        api_secret,
    })
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// A transport bound to one authenticated client of a local backend.
pub struct LocalTransport<B: ?Sized = dyn Backend> {
    backend: Arc<B>,
    client_id: ClientId,
}

impl<B: Backend + ?Sized> LocalTransport<B> {
    /// Authenticate `credentials` against the backend.
    ///
    /// Fails with `Unauthenticated` if the api key is unknown, the secret
    /// does not match, or the key belongs to a different client.
    pub async fn connect(backend: Arc<B>, credentials: &Credentials) -> Result<Self> {
        let registration = backend
            .registration(&credentials.api_key_id)
            .await?
            .filter(|r| r.info.client_id == credentials.client_id)
            .filter(|r| r.verify_secret(&credentials.api_secret))
            .ok_or_else(|| TransportError::Unauthenticated(credentials.api_key_id.clone()))?;

        debug!(client_id = %registration.info.client_id, "authenticated");

        Ok(Self {
            backend,
            client_id: registration.info.client_id,
        })
    }

    /// The backend behind this transport.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    fn require_grant_manager(&self, key: &GrantKey) -> Result<()> {
        if key.is_managed_by(&self.client_id) {
            Ok(())
        } else {
            Err(TransportError::Forbidden(format!(
                "{} may not change grant {}",
                self.client_id, key
            )))
        }
    }

    fn require_tuple_member(&self, writer_id: &ClientId, user_id: &ClientId) -> Result<()> {
        if *writer_id == self.client_id || *user_id == self.client_id {
            Ok(())
        } else {
            Err(TransportError::Forbidden(format!(
                "{} may not list grants of {writer_id}/{user_id}",
                self.client_id
            )))
        }
    }
}

#[async_trait]
impl<B: Backend + ?Sized> Transport for LocalTransport<B> {
    fn client_id(&self) -> ClientId {
        self.client_id
    }

    async fn client_info(&self, client_id: &ClientId) -> Result<ClientInfo> {
        self.backend
            .client_info(client_id)
            .await?
            .ok_or(TransportError::UnknownClient(*client_id))
    }

    async fn put_record(&self, record: NewRecord) -> Result<Meta> {
        if record.writer_id != self.client_id {
            return Err(TransportError::Forbidden(format!(
                "{} may not write records as {}",
                self.client_id, record.writer_id
            )));
        }

        let stored = EncryptedRecord::from_new(record, RecordId::generate(), crate::now_millis());
        let meta = stored.meta.clone();
        self.backend.insert_record(stored).await?;

        debug!(record_id = %meta.record_id, record_type = %meta.record_type, "stored record");
        Ok(meta)
    }

    async fn get_record(&self, record_id: &RecordId) -> Result<Option<EncryptedRecord>> {
        self.backend.get_record(record_id).await
    }

    async fn list_records(&self, query: &ListQuery) -> Result<Vec<Meta>> {
        self.backend.list_records(&self.client_id, query).await
    }

    async fn delete_record(&self, record_id: &RecordId) -> Result<bool> {
        let Some(record) = self.backend.get_record(record_id).await? else {
            return Ok(false);
        };

        if record.meta.writer_id != self.client_id {
            return Err(TransportError::Forbidden(format!(
                "{} may not delete record {record_id}",
                self.client_id
            )));
        }

        self.backend.delete_record(record_id).await
    }

    async fn put_grant(&self, grant: StoredGrant) -> Result<()> {
        self.require_grant_manager(&grant.key)?;

        // Wrapping for an unregistered reader can never be opened.
        if self.backend.client_info(&grant.key.reader_id).await?.is_none() {
            return Err(TransportError::UnknownClient(grant.key.reader_id));
        }

        self.backend.upsert_grant(grant).await
    }

    async fn create_grant(&self, grant: StoredGrant) -> Result<bool> {
        self.require_grant_manager(&grant.key)?;
        if self.backend.client_info(&grant.key.reader_id).await?.is_none() {
            return Err(TransportError::UnknownClient(grant.key.reader_id));
        }
        self.backend.insert_grant(grant).await
    }

    async fn get_grant(&self, key: &GrantKey) -> Result<Option<StoredGrant>> {
        if key.reader_id != self.client_id {
            self.require_grant_manager(key)?;
        }
        self.backend.get_grant(key).await
    }

    async fn delete_grant(&self, key: &GrantKey) -> Result<bool> {
        self.require_grant_manager(key)?;
        self.backend.delete_grant(key).await
    }

    async fn list_grants(
        &self,
        writer_id: &ClientId,
        user_id: &ClientId,
        record_type: &RecordType,
    ) -> Result<Vec<StoredGrant>> {
        self.require_tuple_member(writer_id, user_id)?;
        self.backend
            .list_grants(writer_id, user_id, record_type)
            .await
    }
}

impl<B: ?Sized> std::fmt::Debug for LocalTransport<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTransport")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use bytes::Bytes;
    use lockbox_core::Ed25519Signature;

    fn rt(s: &str) -> RecordType {
        RecordType::new(s).unwrap()
    }

    async fn client(backend: &Arc<MemoryBackend>) -> LocalTransport<MemoryBackend> {
        let credentials = register_client(
            backend.as_ref(),
            X25519PublicKey(random_bytes()),
            Ed25519PublicKey(random_bytes()),
        )
        .await
        .unwrap();
        LocalTransport::connect(Arc::clone(backend), &credentials)
            .await
            .unwrap()
    }

    fn new_record(writer: ClientId) -> NewRecord {
        NewRecord {
            writer_id: writer,
            user_id: writer,
            record_type: rt("feedback"),
            encrypted_data: Bytes::from_static(b"data"),
            encrypted_record_key: Bytes::from_static(b"key"),
            signature: Ed25519Signature([0; 64]),
        }
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_secret() {
        let backend = Arc::new(MemoryBackend::new());
        let mut credentials = register_client(
            backend.as_ref(),
            X25519PublicKey([1; 32]),
            Ed25519PublicKey([2; 32]),
        )
        .await
        .unwrap();
        credentials.api_secret.push('x');

        assert!(matches!(
            LocalTransport::connect(backend, &credentials).await,
            Err(TransportError::Unauthenticated(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_rejects_wrong_client_id() {
        let backend = Arc::new(MemoryBackend::new());
        let mut credentials = register_client(
            backend.as_ref(),
            X25519PublicKey([1; 32]),
            Ed25519PublicKey([2; 32]),
        )
        .await
        .unwrap();
        credentials.client_id = ClientId::generate();

        assert!(LocalTransport::connect(backend, &credentials).await.is_err());
    }

    #[tokio::test]
    async fn test_put_record_assigns_id() {
        let backend = Arc::new(MemoryBackend::new());
        let alice = client(&backend).await;

        let meta = alice.put_record(new_record(alice.client_id())).await.unwrap();

        let fetched = alice.get_record(&meta.record_id).await.unwrap().unwrap();
        assert_eq!(fetched.meta, meta);
    }

    #[tokio::test]
    async fn test_cannot_write_as_someone_else() {
        let backend = Arc::new(MemoryBackend::new());
        let alice = client(&backend).await;
        let bob = client(&backend).await;

        assert!(matches!(
            bob.put_record(new_record(alice.client_id())).await,
            Err(TransportError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_only_writer_deletes() {
        let backend = Arc::new(MemoryBackend::new());
        let alice = client(&backend).await;
        let bob = client(&backend).await;
        let meta = alice.put_record(new_record(alice.client_id())).await.unwrap();

        assert!(matches!(
            bob.delete_record(&meta.record_id).await,
            Err(TransportError::Forbidden(_))
        ));
        assert!(alice.delete_record(&meta.record_id).await.unwrap());
        assert!(!alice.delete_record(&meta.record_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_grant_permissions() {
        let backend = Arc::new(MemoryBackend::new());
        let alice = client(&backend).await;
        let bob = client(&backend).await;
        let eve = client(&backend).await;

        let key = GrantKey::new(
            alice.client_id(),
            alice.client_id(),
            bob.client_id(),
            rt("feedback"),
        );
        let grant = StoredGrant {
            key: key.clone(),
            wrapped_key: Bytes::from_static(b"wrapped"),
        };

        // Only the writer/user may grant.
        assert!(matches!(
            eve.put_grant(grant.clone()).await,
            Err(TransportError::Forbidden(_))
        ));
        alice.put_grant(grant.clone()).await.unwrap();

        // The reader may fetch its own grant; outsiders may not.
        assert_eq!(bob.get_grant(&key).await.unwrap(), Some(grant));
        assert!(eve.get_grant(&key).await.is_err());

        // The reader cannot remove it.
        assert!(bob.delete_grant(&key).await.is_err());
        assert!(alice.delete_grant(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_grant_does_not_replace() {
        let backend = Arc::new(MemoryBackend::new());
        let alice = client(&backend).await;
        let eve = client(&backend).await;
        let me = alice.client_id();
        let key = GrantKey::new(me, me, me, rt("feedback"));
        let grant = |wrapped: &'static [u8]| StoredGrant {
            key: key.clone(),
            wrapped_key: Bytes::from_static(wrapped),
        };

        assert!(matches!(
            eve.create_grant(grant(b"eve")).await,
            Err(TransportError::Forbidden(_))
        ));
        assert!(alice.create_grant(grant(b"first")).await.unwrap());
        assert!(!alice.create_grant(grant(b"second")).await.unwrap());
        assert_eq!(alice.get_grant(&key).await.unwrap(), Some(grant(b"first")));
    }

    #[tokio::test]
    async fn test_grant_for_unknown_reader_rejected() {
        let backend = Arc::new(MemoryBackend::new());
        let alice = client(&backend).await;
        let grant = StoredGrant {
            key: GrantKey::new(
                alice.client_id(),
                alice.client_id(),
                ClientId::generate(),
                rt("feedback"),
            ),
            wrapped_key: Bytes::from_static(b"wrapped"),
        };

        assert!(matches!(
            alice.put_grant(grant).await,
            Err(TransportError::UnknownClient(_))
        ));
    }

    #[tokio::test]
    async fn test_client_info_lookup() {
        let backend = Arc::new(MemoryBackend::new());
        let alice = client(&backend).await;
        let bob = client(&backend).await;

        let info = alice.client_info(&bob.client_id()).await.unwrap();
        assert_eq!(info.client_id, bob.client_id());
        assert!(matches!(
            alice.client_info(&ClientId::generate()).await,
            Err(TransportError::UnknownClient(_))
        ));
    }
}
