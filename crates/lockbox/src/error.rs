//! Error types for the Lockbox client.

use lockbox_core::{ClientId, CoreError, RecordId};
use lockbox_crypto::CryptoError;
use lockbox_policy::PolicyError;
use lockbox_transport::TransportError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during client operations.
///
/// Component errors are carried unchanged; use [`Error::kind`] to classify
/// an error regardless of which layer raised it.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Key or format mismatch while encrypting, decrypting or verifying.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The record service rejected or failed the request.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Granting or revoking access failed.
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    /// An argument was not a valid id or record type.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] CoreError),

    /// No record has this id.
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// The reader holds no grant for the record's type.
    #[error("access denied: {reader} cannot read record {record_id}")]
    AccessDenied { record_id: RecordId, reader: ClientId },
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Fatal: fix the configuration.
    Config,
    /// Fatal to the operation.
    Crypto,
    /// Recoverable once the caller is granted access.
    AccessDenied,
    /// Recoverable: unknown record id.
    NotFound,
    /// Recoverable: authorize before any write of that type.
    KeyNotFound,
    /// Invalid id or record type supplied by the caller.
    InvalidInput,
    /// The record service failed or refused.
    Transport,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Config,
            Error::Crypto(_) => ErrorKind::Crypto,
            Error::Transport(e) => transport_kind(e),
            Error::Policy(PolicyError::KeyNotFound { .. }) => ErrorKind::KeyNotFound,
            Error::Policy(PolicyError::Crypto(_)) => ErrorKind::Crypto,
            Error::Policy(PolicyError::Transport(e)) => transport_kind(e),
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::AccessDenied { .. } => ErrorKind::AccessDenied,
        }
    }

    /// True if retrying after a change of state (a grant, a write) can
    /// succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::AccessDenied | ErrorKind::NotFound | ErrorKind::KeyNotFound
        )
    }
}

fn transport_kind(e: &TransportError) -> ErrorKind {
    match e {
        TransportError::Forbidden(_) => ErrorKind::AccessDenied,
        TransportError::InvalidUrl(_) => ErrorKind::Config,
        _ => ErrorKind::Transport,
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
