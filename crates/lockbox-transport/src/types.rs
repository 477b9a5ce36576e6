//! Values exchanged between a client and the record service.
//!
//! The service only ever sees what is in this module: record metadata,
//! opaque ciphertext, signatures and wrapped keys.

use bytes::Bytes;
use std::collections::BTreeSet;
use std::fmt;

use lockbox_core::{ClientId, ClientInfo, Ed25519Signature, Meta, RecordType};

/// Identifies an access grant: `reader_id` may read `record_type` records
/// written by `writer_id` about `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GrantKey {
    pub writer_id: ClientId,
    pub user_id: ClientId,
    pub reader_id: ClientId,
    pub record_type: RecordType,
}

impl GrantKey {
    pub fn new(
        writer_id: ClientId,
        user_id: ClientId,
        reader_id: ClientId,
        record_type: RecordType,
    ) -> Self {
        Self {
            writer_id,
            user_id,
            reader_id,
            record_type,
        }
    }

    /// True if `client` may create or remove this grant.
    pub fn is_managed_by(&self, client: &ClientId) -> bool {
        self.writer_id == *client || self.user_id == *client
    }
}

impl fmt::Display for GrantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{} -> {}",
            self.writer_id, self.user_id, self.record_type, self.reader_id
        )
    }
}

/// An access grant as the service stores it. The wrapped key is opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredGrant {
    pub key: GrantKey,
    pub wrapped_key: Bytes,
}

/// A record submitted for storage. The service assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub writer_id: ClientId,
    pub user_id: ClientId,
    pub record_type: RecordType,

    /// Record data encrypted under the record's data key.
    pub encrypted_data: Bytes,

    /// The data key encrypted under the access key of the record's tuple.
    pub encrypted_record_key: Bytes,

    /// Writer's signature over the plaintext record.
    pub signature: Ed25519Signature,
}

/// A record at rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedRecord {
    pub meta: Meta,
    pub encrypted_data: Bytes,
    pub encrypted_record_key: Bytes,
    pub signature: Ed25519Signature,
}

impl EncryptedRecord {
    /// Attach service-assigned metadata to a submitted record.
    pub fn from_new(record: NewRecord, record_id: lockbox_core::RecordId, created_at: i64) -> Self {
        Self {
            meta: Meta {
                record_id,
                writer_id: record.writer_id,
                user_id: record.user_id,
                record_type: record.record_type,
                created_at,
            },
            encrypted_data: record.encrypted_data,
            encrypted_record_key: record.encrypted_record_key,
            signature: record.signature,
        }
    }
}

/// One page of a record listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Maximum number of entries to return.
    pub limit: usize,

    /// Number of visible entries to skip.
    pub offset: usize,

    /// Only return records of these types. Empty means all types.
    pub record_types: BTreeSet<RecordType>,
}

impl ListQuery {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self {
            limit,
            offset,
            record_types: BTreeSet::new(),
        }
    }

    /// Restrict the listing to the given types.
    pub fn with_types(mut self, types: impl IntoIterator<Item = RecordType>) -> Self {
        self.record_types.extend(types);
        self
    }

    /// True if `record_type` passes the type filter.
    pub fn matches(&self, record_type: &RecordType) -> bool {
        self.record_types.is_empty() || self.record_types.contains(record_type)
    }
}

/// API credentials of a registered client.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: ClientId,
    pub api_key_id: String,
    pub api_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("api_key_id", &self.api_key_id)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// What the service keeps about a registered client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub info: ClientInfo,
    pub api_key_id: String,

    /// BLAKE3 hash of the API secret. The secret itself is never stored.
    pub secret_hash: [u8; 32],
}

impl Registration {
    /// True if `secret` hashes to the stored value (constant-time compare).
    pub fn verify_secret(&self, secret: &str) -> bool {
        blake3::hash(secret.as_bytes()) == blake3::Hash::from(self.secret_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rt(s: &str) -> RecordType {
        RecordType::new(s).unwrap()
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let query = ListQuery::new(10, 0);
        assert!(query.matches(&rt("feedback")));
        assert!(query.matches(&rt("anything")));
    }

    #[test]
    fn test_type_filter() {
        let query = ListQuery::new(10, 0).with_types([rt("feedback")]);
        assert!(query.matches(&rt("feedback")));
        assert!(!query.matches(&rt("notes")));
    }

    #[test]
    fn test_grant_managed_by_writer_or_user() {
        let writer = ClientId::generate();
        let user = ClientId::generate();
        let reader = ClientId::generate();
        let key = GrantKey::new(writer, user, reader, rt("feedback"));

        assert!(key.is_managed_by(&writer));
        assert!(key.is_managed_by(&user));
        assert!(!key.is_managed_by(&reader));
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials {
            client_id: ClientId::generate(),
            api_key_id: "key".into(),
            api_secret: "hunter2".into(),
        };
        assert!(!format!("{creds:?}").contains("hunter2"));
    }

    #[test]
    fn test_verify_secret() {
        let registration = Registration {
            info: ClientInfo {
                client_id: ClientId::generate(),
                public_key: lockbox_core::X25519PublicKey([1; 32]),
                signing_key: lockbox_core::Ed25519PublicKey([2; 32]),
            },
            api_key_id: "key".into(),
            secret_hash: *blake3::hash(b"secret").as_bytes(),
        };
        assert!(registration.verify_secret("secret"));
        assert!(!registration.verify_secret("Secret"));
    }
}
