//! The crypto provider.
//!
//! Binds the primitives in this crate to the keys of one client. Pure
//! computation: no I/O, no shared state beyond the key manager.

use lockbox_core::{Ed25519PublicKey, Ed25519Signature, X25519PublicKey};

use crate::envelope::EncryptedPayload;
use crate::error::{CryptoError, Result};
use crate::key_manager::{ClientKeys, KeyManager};
use crate::keys::EncryptionKey;
use crate::wrap::{self, WrappedKey};

/// Cryptographic operations on behalf of one client.
pub struct CryptoProvider<K = Box<dyn KeyManager>> {
    keys: K,
}

impl<K: KeyManager> CryptoProvider<K> {
    pub fn new(keys: K) -> Self {
        Self { keys }
    }

    /// The client's secret keys.
    pub fn keys(&self) -> &ClientKeys {
        self.keys.keys()
    }

    /// The client's X25519 public key.
    pub fn public_key(&self) -> X25519PublicKey {
        self.keys().encryption.public_key()
    }

    /// The client's Ed25519 public key.
    pub fn signing_public_key(&self) -> Ed25519PublicKey {
        self.keys().signing.public_key()
    }

    /// Encrypt under a symmetric key.
    pub fn encrypt(&self, plaintext: &[u8], key: &EncryptionKey) -> Result<EncryptedPayload> {
        EncryptedPayload::encrypt(plaintext, key)
    }

    /// Decrypt a payload produced by [`CryptoProvider::encrypt`].
    pub fn decrypt(&self, payload: &EncryptedPayload, key: &EncryptionKey) -> Result<Vec<u8>> {
        payload.decrypt(key)
    }

    /// Wrap a symmetric key for another client (or for this one).
    pub fn wrap_key(
        &self,
        key: &EncryptionKey,
        recipient: &X25519PublicKey,
        context: &[u8],
    ) -> Result<WrappedKey> {
        wrap::wrap_key(key, recipient, context)
    }

    /// Unwrap a key that was wrapped for this client.
    pub fn unwrap_key(&self, wrapped: &WrappedKey, context: &[u8]) -> Result<EncryptionKey> {
        wrap::unwrap_key(wrapped, &self.keys().encryption, context)
    }

    /// Sign a message with the client's signing key.
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        self.keys().signing.sign(message)
    }

    /// Verify a signature made by `signer`.
    pub fn verify(
        &self,
        message: &[u8],
        signature: &Ed25519Signature,
        signer: &Ed25519PublicKey,
    ) -> Result<()> {
        signer
            .verify(message, signature)
            .map_err(|e| CryptoError::SignatureError(e.to_string()))
    }
}

impl<K> std::fmt::Debug for CryptoProvider<K>
where
    K: KeyManager,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoProvider")
            .field("public_key", &self.public_key())
            .finish()
    }
}
