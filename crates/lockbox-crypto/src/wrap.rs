//! Key wrapping via X25519 key agreement.
//!
//! To give a reader an access key, the key is encrypted so only the holder
//! of the reader's X25519 secret can recover it: an ephemeral key pair is
//! generated, ECDH with the reader's public key yields a shared secret, and
//! a wrapping key derived from it (bound to a caller-supplied context)
//! encrypts the access key.

use serde::{Deserialize, Serialize};

use lockbox_core::X25519PublicKey;

use crate::error::{CryptoError, Result};
use crate::keys::{EncryptionKey, EncryptionNonce, EphemeralKeyPair, X25519StaticSecret};

/// A symmetric key wrapped for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKey {
    /// Ephemeral X25519 public key (sender's side of ECDH).
    pub ephemeral_public: X25519PublicKey,

    /// The symmetric key, encrypted with the derived wrapping key.
    pub encrypted_key: Vec<u8>,

    /// Nonce used for encryption.
    pub nonce: EncryptionNonce,
}

impl WrappedKey {
    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CryptoError::SerializationError(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| CryptoError::SerializationError(e.to_string()))
    }
}

/// Wrap `key` for the holder of `recipient_public`.
///
/// `context` must be supplied again, byte for byte, to [`unwrap_key`].
pub fn wrap_key(
    key: &EncryptionKey,
    recipient_public: &X25519PublicKey,
    context: &[u8],
) -> Result<WrappedKey> {
    let ephemeral = EphemeralKeyPair::generate();
    let ephemeral_public = ephemeral.public_key();

    let wrap_key = ephemeral.wrapping_key(recipient_public, context);

    let nonce = EncryptionNonce::generate();
    let encrypted_key = wrap_key.encrypt(key.as_bytes(), &nonce)?;

    Ok(WrappedKey {
        ephemeral_public,
        encrypted_key,
        nonce,
    })
}

/// Recover a wrapped key with the recipient's secret.
///
/// Fails with [`CryptoError::WrongRecipient`] when the key was wrapped for a
/// different recipient or under a different context.
pub fn unwrap_key(
    wrapped: &WrappedKey,
    recipient_secret: &X25519StaticSecret,
    context: &[u8],
) -> Result<EncryptionKey> {
    let wrap_key = recipient_secret.wrapping_key(&wrapped.ephemeral_public, context);

    let key_bytes = wrap_key
        .decrypt(&wrapped.encrypted_key, &wrapped.nonce)
        .map_err(|_| CryptoError::WrongRecipient)?;

    EncryptionKey::from_slice(&key_bytes)
}
