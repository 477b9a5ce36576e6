//! # Lockbox Transport
//!
//! The client's collaborator for persistence. Provides the [`Transport`]
//! trait that the record store and policy engine talk to, and an in-process
//! implementation of the service behind it.
//!
//! ## Key Types
//!
//! - [`Transport`] - Authenticated, per-client access to records and grants
//! - [`Backend`] - Service-side persistence with no access control
//! - [`LocalTransport`] - A [`Transport`] that enforces access rules over a [`Backend`]
//! - [`MemoryBackend`] / [`SqliteBackend`] - The two backends
//! - [`ServiceUrl`] - `memory:` or `sqlite://<path>`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lockbox_core::{Ed25519PublicKey, X25519PublicKey};
//! use lockbox_transport::{register_client, LocalTransport, MemoryBackend, Transport};
//!
//! async fn example() {
//!     let backend = Arc::new(MemoryBackend::new());
//!     let credentials = register_client(
//!         backend.as_ref(),
//!         X25519PublicKey([1; 32]),
//!         Ed25519PublicKey([2; 32]),
//!     )
//!     .await
//!     .unwrap();
//!
//!     let transport = LocalTransport::connect(backend, &credentials).await.unwrap();
//!     assert_eq!(transport.client_id(), credentials.client_id);
//! }
//! ```
//!
//! ## What the service sees
//!
//! Record metadata (ids, type, timestamps), ciphertext, signatures and
//! wrapped keys. Never plaintext, never an unwrapped key.

pub mod backend;
pub mod error;
pub mod local;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod transport;
pub mod types;
pub mod url;

pub use backend::Backend;
pub use error::{Result, TransportError};
pub use local::{register_client, LocalTransport};
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;
pub use transport::Transport;
pub use types::{
    Credentials, EncryptedRecord, GrantKey, ListQuery, NewRecord, Registration, StoredGrant,
};
pub use url::ServiceUrl;

/// Current time in Unix milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
