//! # Lockbox Crypto
//!
//! The crypto provider: everything that turns plaintext into what the store
//! is allowed to see, and back.
//!
//! ## Encryption Model
//!
//! Records use a three-layer key model:
//!
//! 1. **Data Key**: A fresh symmetric key (ChaCha20-Poly1305) per record that
//!    encrypts the record's canonical plaintext
//! 2. **Access Key**: One symmetric key per (writer, user, type) that encrypts
//!    each record's data key
//! 3. **Wrapped Keys**: The access key is wrapped for each authorized reader
//!    via ephemeral X25519 ECDH
//!
//! This allows:
//! - Sharing a whole record type without touching existing records
//! - Revocation by deleting a reader's wrapped key
//! - Per-record keys, so one leaked data key exposes one record
//!
//! ## Usage
//!
//! ```rust
//! use lockbox_crypto::{CryptoProvider, EncryptionKey, StaticKeyManager};
//!
//! let provider = CryptoProvider::new(StaticKeyManager::generate());
//! let key = EncryptionKey::generate();
//!
//! let sealed = provider.encrypt(b"hello", &key).unwrap();
//! assert_eq!(provider.decrypt(&sealed, &key).unwrap(), b"hello");
//!
//! let wrapped = provider.wrap_key(&key, &provider.public_key(), b"ctx").unwrap();
//! let unwrapped = provider.unwrap_key(&wrapped, b"ctx").unwrap();
//! assert_eq!(unwrapped.as_bytes(), key.as_bytes());
//! ```

pub mod envelope;
pub mod error;
pub mod key_manager;
pub mod keys;
pub mod provider;
pub mod wrap;

pub use envelope::{EncryptedPayload, EncryptionFormat};
pub use error::{CryptoError, Result};
pub use key_manager::{ClientKeys, KeyManager, StaticKeyManager};
pub use keys::{EncryptionKey, EncryptionNonce, EphemeralKeyPair, X25519StaticSecret};
pub use provider::CryptoProvider;
pub use wrap::{unwrap_key, wrap_key, WrappedKey};
