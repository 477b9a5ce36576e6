//! Key managers: where a client's secret key material comes from.
//!
//! A key manager is handed to the provider at construction and consulted for
//! the lifetime of the process. Keys are loaded once; rotation is out of
//! scope.

use std::sync::Arc;

use lockbox_core::{ClientId, ClientInfo, SigningKeypair};

use crate::error::{CryptoError, Result};
use crate::keys::X25519StaticSecret;

/// The secret keys of one client.
pub struct ClientKeys {
    /// Opens access keys wrapped for this client.
    pub encryption: X25519StaticSecret,

    /// Signs records this client writes.
    pub signing: SigningKeypair,
}

impl ClientKeys {
    /// Generate fresh keys.
    pub fn generate() -> Self {
        Self {
            encryption: X25519StaticSecret::generate(),
            signing: SigningKeypair::generate(),
        }
    }

    /// Deterministic keys from two 32-byte seeds.
    pub fn from_seeds(encryption: [u8; 32], signing: &[u8; 32]) -> Self {
        Self {
            encryption: X25519StaticSecret::from_bytes(encryption),
            signing: SigningKeypair::from_seed(signing),
        }
    }

    /// Parse hex-encoded secret material.
    pub fn from_hex(private_key: &str, private_signing_key: &str) -> Result<Self> {
        let encryption = decode_secret("private_key", private_key)?;
        let signing = decode_secret("private_signing_key", private_signing_key)?;
        Ok(Self::from_seeds(encryption, &signing))
    }

    /// Hex-encode the secret material, in the order [`ClientKeys::from_hex`]
    /// accepts it.
    pub fn to_hex(&self) -> (String, String) {
        (
            hex::encode(self.encryption.to_bytes()),
            hex::encode(self.signing.seed()),
        )
    }

    /// The public information other clients need about this one.
    pub fn client_info(&self, client_id: ClientId) -> ClientInfo {
        ClientInfo {
            client_id,
            public_key: self.encryption.public_key(),
            signing_key: self.signing.public_key(),
        }
    }
}

impl std::fmt::Debug for ClientKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientKeys")
            .field("encryption", &self.encryption)
            .field("signing", &self.signing)
            .finish()
    }
}

fn decode_secret(field: &str, s: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(s.trim())
        .map_err(|e| CryptoError::InvalidKeyMaterial(format!("{field}: {e}")))?;
    bytes.try_into().map_err(|v: Vec<u8>| {
        CryptoError::InvalidKeyMaterial(format!(
            "{field}: expected 32 bytes, got {}",
            v.len()
        ))
    })
}

/// Supplies the secret keys of the identity a client acts as.
pub trait KeyManager: Send + Sync {
    fn keys(&self) -> &ClientKeys;
}

/// Keys held in memory for the lifetime of the process.
#[derive(Debug)]
pub struct StaticKeyManager {
    keys: ClientKeys,
}

impl StaticKeyManager {
    pub fn new(keys: ClientKeys) -> Self {
        Self { keys }
    }

    /// A manager holding freshly generated keys.
    pub fn generate() -> Self {
        Self::new(ClientKeys::generate())
    }

    /// A manager holding hex-encoded keys, e.g. from a config file.
    pub fn from_hex(private_key: &str, private_signing_key: &str) -> Result<Self> {
        ClientKeys::from_hex(private_key, private_signing_key).map(Self::new)
    }
}

impl KeyManager for StaticKeyManager {
    fn keys(&self) -> &ClientKeys {
        &self.keys
    }
}

impl<T: KeyManager + ?Sized> KeyManager for Arc<T> {
    fn keys(&self) -> &ClientKeys {
        (**self).keys()
    }
}

impl<T: KeyManager + ?Sized> KeyManager for Box<T> {
    fn keys(&self) -> &ClientKeys {
        (**self).keys()
    }
}
