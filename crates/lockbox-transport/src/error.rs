//! Error types for the transport module.

use lockbox_core::ClientId;
use thiserror::Error;

/// Errors that can occur while talking to the record service.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The API credentials were rejected.
    #[error("authentication failed for api key {0}")]
    Unauthenticated(String),

    /// The caller is authenticated but may not perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// No client with this id is registered.
    #[error("unknown client: {0}")]
    UnknownClient(ClientId),

    /// An api key id was registered twice.
    #[error("api key already registered: {0}")]
    DuplicateApiKey(String),

    /// The service URL could not be understood.
    #[error("invalid service url: {0}")]
    InvalidUrl(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A blocking storage task failed to complete.
    #[error("backend task failed: {0}")]
    Task(String),

    /// Core type error (invalid ids, record types).
    #[error("core error: {0}")]
    Core(#[from] lockbox_core::CoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
