//! Error types for Lockbox Core.

use thiserror::Error;

/// Core errors that can occur while handling identities and records.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid record type {0:?}: {1}")]
    InvalidRecordType(String, &'static str),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}
