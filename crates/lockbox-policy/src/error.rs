//! Error types for the policy engine.

use lockbox_core::{ClientId, RecordType};
use thiserror::Error;

/// Errors that can occur while granting or revoking access.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The caller holds no access key for the tuple: nothing of this type
    /// was ever written under (writer, user), or the caller was never
    /// granted it.
    #[error("no access key for {writer_id}/{user_id}/{record_type}")]
    KeyNotFound {
        writer_id: ClientId,
        user_id: ClientId,
        record_type: RecordType,
    },

    /// Wrapping, unwrapping or decoding a key failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] lockbox_crypto::CryptoError),

    /// The record service rejected or failed the request.
    #[error("transport error: {0}")]
    Transport(#[from] lockbox_transport::TransportError),
}

/// Result type for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;
