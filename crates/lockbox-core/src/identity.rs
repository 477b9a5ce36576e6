//! Client principals and the public keys they publish.

use serde::{Deserialize, Serialize};

use crate::crypto::{Ed25519PublicKey, X25519PublicKey};
use crate::types::ClientId;

/// A client principal.
///
/// Immutable once issued. Key material for the identity is held by a key
/// manager, never by the identity itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub id: ClientId,
}

impl Identity {
    pub const fn new(id: ClientId) -> Self {
        Self { id }
    }
}

impl From<ClientId> for Identity {
    fn from(id: ClientId) -> Self {
        Self { id }
    }
}

/// The public half of a client: what other principals need to share
/// records with it and to verify records it wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// The client this information describes.
    pub client_id: ClientId,

    /// Target for wrapped access keys.
    pub public_key: X25519PublicKey,

    /// Verifies signatures on records the client writes.
    pub signing_key: Ed25519PublicKey,
}

impl ClientInfo {
    pub fn identity(&self) -> Identity {
        Identity::new(self.client_id)
    }
}
