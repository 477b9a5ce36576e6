//! Key material.
//!
//! Two kinds of keys live here. Symmetric [`EncryptionKey`]s seal record
//! data (data keys) and data keys (access keys). X25519 secrets exist only
//! to produce the one-off wrapping keys that carry an access key to a
//! reader, so the agreement types hand out wrapping keys and never expose
//! the raw shared secret.

use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, Key, KeyInit, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use lockbox_core::X25519PublicKey;

use crate::error::{CryptoError, Result};

/// BLAKE3 derive-key context for wrapping keys.
const WRAPPING_KEY_CONTEXT: &str = "lockbox-crypto-v1-wrap";

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Hash an ECDH output and the caller's context into a wrapping key.
fn wrapping_key(shared: &[u8; 32], context: &[u8]) -> EncryptionKey {
    let mut hasher = blake3::Hasher::new_derive_key(WRAPPING_KEY_CONTEXT);
    hasher.update(shared);
    hasher.update(context);
    EncryptionKey(*hasher.finalize().as_bytes())
}

/// A client's long-lived X25519 secret. Its public half is published as
/// [`ClientInfo::public_key`](lockbox_core::ClientInfo).
pub struct X25519StaticSecret(StaticSecret);

impl X25519StaticSecret {
    pub fn generate() -> Self {
        Self::from_bytes(random_bytes())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// The secret bytes, for a key manager to persist.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey(*PublicKey::from(&self.0).as_bytes())
    }

    /// The recipient's side of a key wrap: the wrapping key agreed with the
    /// sender's ephemeral public key.
    pub fn wrapping_key(&self, ephemeral: &X25519PublicKey, context: &[u8]) -> EncryptionKey {
        let shared = self.0.diffie_hellman(&PublicKey::from(ephemeral.0));
        wrapping_key(shared.as_bytes(), context)
    }
}

impl fmt::Debug for X25519StaticSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("X25519StaticSecret")
            .field(&self.public_key())
            .finish()
    }
}

/// The sender's side of a key wrap. Used once, then dropped.
pub struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: X25519PublicKey,
}

impl EphemeralKeyPair {
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(rand::thread_rng());
        let public = X25519PublicKey(*PublicKey::from(&secret).as_bytes());
        Self { secret, public }
    }

    /// Sent alongside the wrapped key.
    pub fn public_key(&self) -> X25519PublicKey {
        self.public
    }

    /// Consume the pair, agreeing a wrapping key with `recipient`.
    pub fn wrapping_key(self, recipient: &X25519PublicKey, context: &[u8]) -> EncryptionKey {
        let shared = self.secret.diffie_hellman(&PublicKey::from(recipient.0));
        wrapping_key(shared.as_bytes(), context)
    }
}

/// A 256-bit ChaCha20-Poly1305 key: a record's data key, a type's access
/// key, or a wrapping key.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    pub fn generate() -> Self {
        Self(random_bytes())
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a key recovered from ciphertext.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        <[u8; 32]>::try_from(bytes).map(Self).map_err(|_| {
            CryptoError::InvalidKeyMaterial(format!("expected a 32-byte key, got {}", bytes.len()))
        })
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.0))
    }

    pub fn encrypt(&self, plaintext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        self.cipher()
            .encrypt(Nonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| CryptoError::EncryptionError(e.to_string()))
    }

    /// Fails on a wrong key or any modified byte.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        self.cipher()
            .decrypt(Nonce::from_slice(&nonce.0), ciphertext)
            .map_err(|e| CryptoError::DecryptionError(e.to_string()))
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// A random 96-bit nonce, fresh for every encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionNonce(pub [u8; 12]);

impl EncryptionNonce {
    pub fn generate() -> Self {
        Self(random_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_sides_agree_on_wrapping_key() {
        let reader = X25519StaticSecret::generate();
        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key();

        let sender_side = ephemeral.wrapping_key(&reader.public_key(), b"feedback");
        let reader_side = reader.wrapping_key(&ephemeral_public, b"feedback");
        assert_eq!(sender_side, reader_side);

        let other_context = reader.wrapping_key(&ephemeral_public, b"diary");
        assert_ne!(reader_side, other_context);
    }

    #[test]
    fn test_restored_secret_has_same_public_key() {
        let secret = X25519StaticSecret::generate();
        let restored = X25519StaticSecret::from_bytes(secret.to_bytes());
        assert_eq!(secret.public_key(), restored.public_key());
    }

    #[test]
    fn test_modified_ciphertext_is_rejected() {
        let key = EncryptionKey::generate();
        let nonce = EncryptionNonce::generate();
        let mut ciphertext = key.encrypt(b"Great lunch!", &nonce).unwrap();

        assert_eq!(key.decrypt(&ciphertext, &nonce).unwrap(), b"Great lunch!");
        ciphertext[0] ^= 1;
        assert!(matches!(
            key.decrypt(&ciphertext, &nonce),
            Err(CryptoError::DecryptionError(_))
        ));
    }

    #[test]
    fn test_key_from_slice_length_checked() {
        assert!(EncryptionKey::from_slice(&[0u8; 31]).is_err());
        assert!(EncryptionKey::from_slice(&[0u8; 33]).is_err());
        assert_eq!(
            EncryptionKey::from_slice(&[7u8; 32]).unwrap(),
            EncryptionKey::from_bytes([7u8; 32])
        );
    }

    #[test]
    fn test_debug_hides_key_bytes() {
        let key = EncryptionKey::from_bytes([0xab; 32]);
        assert!(!format!("{key:?}").contains("ab"));
    }
}
