//! Strong type definitions for Lockbox identifiers.
//!
//! All identifiers are newtypes to prevent misuse at compile time: a
//! [`ClientId`] can never be passed where a [`RecordId`] is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

/// Identifier of a client principal.
///
/// Issued once at registration and immutable afterwards.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Generate a fresh random client ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Parse from the hyphenated string form.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| CoreError::InvalidId(format!("{s:?}: {e}")))
    }
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientId({})", self.0)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClientId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for ClientId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Identifier of a record, assigned by the store on first successful write.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    /// Generate a fresh random record ID.
    ///
    /// Only stores call this; clients never choose their own record IDs.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Parse from the hyphenated string form.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| CoreError::InvalidId(format!("{s:?}: {e}")))
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for RecordId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_string_roundtrip() {
        let id = ClientId::parse("166ed61a-3a56-4fe6-980f-2850aa82ea25").unwrap();
        assert_eq!(id.to_string(), "166ed61a-3a56-4fe6-980f-2850aa82ea25");
        assert_eq!(id, "166ed61a-3a56-4fe6-980f-2850aa82ea25".parse().unwrap());
    }

    #[test]
    fn test_invalid_client_id() {
        assert!(matches!(
            ClientId::parse("not-a-uuid"),
            Err(CoreError::InvalidId(_))
        ));
    }

    #[test]
    fn test_record_ids_are_unique() {
        let a = RecordId::generate();
        let b = RecordId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_record_id_debug() {
        let id = RecordId::from_bytes([0xcd; 16]);
        let debug = format!("{:?}", id);
        assert!(debug.starts_with("RecordId("));
    }
}
