//! Error types for the crypto provider.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
///
/// All of these are fatal to the operation that raised them, never to the
/// process.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption error.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Decryption error (wrong key or tampered ciphertext).
    #[error("decryption error: {0}")]
    DecryptionError(String),

    /// A wrapped key could not be opened with the given secret.
    #[error("wrapped key was not produced for this recipient")]
    WrongRecipient,

    /// Record signature did not verify.
    #[error("signature verification failed: {0}")]
    SignatureError(String),

    /// Key material could not be parsed.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Core error.
    #[error("core error: {0}")]
    CoreError(#[from] lockbox_core::CoreError),
}

/// Result type for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
