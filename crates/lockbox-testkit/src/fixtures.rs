//! Test fixtures and helpers.
//!
//! A [`TestNetwork`] is one record service that any number of registered
//! clients can share.

use std::sync::Arc;

use tempfile::TempDir;

use lockbox::{Client, ClientConfig, KeyMaterial, Result};
use lockbox_crypto::{ClientKeys, KeyManager, StaticKeyManager};
use lockbox_transport::{register_client, Backend, LocalTransport, ServiceUrl, Transport};

/// A record service plus helpers to register clients against it.
pub struct TestNetwork {
    backend: Arc<dyn Backend>,
    url: ServiceUrl,
    // Keeps the SQLite file alive for the lifetime of the network.
    _dir: Option<TempDir>,
}

impl TestNetwork {
    /// A network backed by memory.
    pub fn memory() -> Self {
        let url = ServiceUrl::Memory;
        Self {
            backend: Arc::new(lockbox_transport::MemoryBackend::new()),
            url,
            _dir: None,
        }
    }

    /// A network backed by a SQLite file in a fresh temporary directory.
    pub fn sqlite() -> Result<Self> {
        let dir = TempDir::new().map_err(lockbox_transport::TransportError::from)?;
        let url = ServiceUrl::Sqlite(dir.path().join("lockbox.db"));
        Ok(Self {
            backend: url.open()?,
            url,
            _dir: Some(dir),
        })
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn url(&self) -> &ServiceUrl {
        &self.url
    }

    /// Register a client with fresh keys.
    pub async fn client(&self) -> Result<Client> {
        self.client_with_keys(ClientKeys::generate()).await
    }

    /// Register a client with keys derived from `seed`.
    pub async fn client_with_seed(&self, seed: u8) -> Result<Client> {
        self.client_with_keys(keys_from_seed(seed)).await
    }

    /// Register `count` clients with fresh keys.
    pub async fn clients(&self, count: usize) -> Result<Vec<Client>> {
        let mut clients = Vec::with_capacity(count);
        for _ in 0..count {
            clients.push(self.client().await?);
        }
        Ok(clients)
    }

    /// Register a client with the given keys and connect it.
    pub async fn client_with_keys(&self, keys: ClientKeys) -> Result<Client> {
        let manager = StaticKeyManager::new(keys);
        let credentials = register_client(
            self.backend.as_ref(),
            manager.keys().encryption.public_key(),
            manager.keys().signing.public_key(),
        )
        .await?;

        let transport = LocalTransport::connect(Arc::clone(&self.backend), &credentials).await?;
        let transport: Arc<dyn Transport> = Arc::new(transport);
        Ok(Client::new(transport, manager))
    }

    /// Register a client and return a complete configuration for it.
    ///
    /// Only useful with [`TestNetwork::sqlite`]: connecting with a
    /// `memory:` configuration is refused.
    pub async fn register_config(&self) -> Result<ClientConfig> {
        let keys = ClientKeys::generate();
        let credentials = register_client(
            self.backend.as_ref(),
            keys.encryption.public_key(),
            keys.signing.public_key(),
        )
        .await?;

        Ok(ClientConfig {
            client_id: credentials.client_id,
            api_key_id: credentials.api_key_id,
            api_secret: credentials.api_secret,
            service_url: self.url.clone(),
            keys: Some(KeyMaterial::from_keys(&keys)),
        })
    }
}

/// Deterministic keys for a one-byte seed.
pub fn keys_from_seed(seed: u8) -> ClientKeys {
    ClientKeys::from_seeds([seed; 32], &[seed.wrapping_add(0x80); 32])
}
