//! Encrypted payload envelope.
//!
//! Ciphertext never travels alone: it is wrapped in an [`EncryptedPayload`]
//! that also carries the algorithm and nonce needed to open it.

use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, Result};
use crate::keys::{EncryptionKey, EncryptionNonce};

/// Format identifier for encrypted payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EncryptionFormat {
    /// ChaCha20-Poly1305 with 256-bit key.
    ChaCha20Poly1305 = 1,
}

/// An encrypted payload envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    /// Encryption algorithm used.
    pub format: EncryptionFormat,

    /// Nonce used for encryption (unique per encryption).
    pub nonce: EncryptionNonce,

    /// The encrypted data (includes authentication tag).
    pub ciphertext: Vec<u8>,
}

impl EncryptedPayload {
    /// Encrypt plaintext with the given key under a fresh nonce.
    pub fn encrypt(plaintext: &[u8], key: &EncryptionKey) -> Result<Self> {
        let nonce = EncryptionNonce::generate();
        let ciphertext = key.encrypt(plaintext, &nonce)?;

        Ok(Self {
            format: EncryptionFormat::ChaCha20Poly1305,
            nonce,
            ciphertext,
        })
    }

    /// Decrypt with the given key.
    pub fn decrypt(&self, key: &EncryptionKey) -> Result<Vec<u8>> {
        match self.format {
            EncryptionFormat::ChaCha20Poly1305 => key.decrypt(&self.ciphertext, &self.nonce),
        }
    }

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

    /// Get the size of the ciphertext.
    pub fn ciphertext_len(&self) -> usize {
        self.ciphertext.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = EncryptionKey::generate();
        let plaintext = b"hello, encrypted world!";

        let envelope = EncryptedPayload::encrypt(plaintext, &key).unwrap();
        let decrypted = envelope.decrypt(&key).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_envelope_serialization() {
        let key = EncryptionKey::generate();
        let envelope = EncryptedPayload::encrypt(b"test", &key).unwrap();

        let bytes = envelope.to_bytes().unwrap();
        let recovered = EncryptedPayload::from_bytes(&bytes).unwrap();

        assert_eq!(envelope, recovered);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = EncryptionKey::generate();
        let key2 = EncryptionKey::generate();

        let envelope = EncryptedPayload::encrypt(b"secret", &key1).unwrap();

        assert!(matches!(
            envelope.decrypt(&key2),
            Err(CryptoError::DecryptionError(_))
        ));
    }

    #[test]
    fn test_same_plaintext_different_nonces() {
        let key = EncryptionKey::generate();
        let a = EncryptedPayload::encrypt(b"same", &key).unwrap();
        let b = EncryptedPayload::encrypt(b"same", &key).unwrap();

        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_truncated_bytes_rejected() {
        assert!(EncryptedPayload::from_bytes(&[0xa3]).is_err());
    }
}
