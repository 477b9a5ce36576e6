//! Access grants and policy requests.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use lockbox_core::{ClientId, RecordType};
use lockbox_crypto::WrappedKey;
use lockbox_transport::{GrantKey, StoredGrant};

use crate::error::Result;

/// Domain prefix binding a wrapped access key to its tuple.
const GRANT_CONTEXT_DOMAIN: &[u8] = b"lockbox-grant-v1:";

/// The context an access key is wrapped under.
///
/// Binds the wrapped key to (writer, user, type) so a grant cannot be
/// replayed onto another tuple. Independent of the reader.
pub fn grant_context(writer_id: &ClientId, user_id: &ClientId, record_type: &RecordType) -> Vec<u8> {
    let mut ctx = GRANT_CONTEXT_DOMAIN.to_vec();
    ctx.extend_from_slice(writer_id.as_bytes());
    ctx.extend_from_slice(user_id.as_bytes());
    ctx.extend_from_slice(record_type.as_str().as_bytes());
    ctx
}

/// `reader_id` may decrypt `record_type` records written by `writer_id`
/// about `user_id`.
///
/// Holds the tuple's access key wrapped for the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub writer_id: ClientId,
    pub user_id: ClientId,
    pub reader_id: ClientId,
    pub record_type: RecordType,
    pub wrapped_key: WrappedKey,
}

impl AccessGrant {
    pub fn key(&self) -> GrantKey {
        GrantKey::new(
            self.writer_id,
            self.user_id,
            self.reader_id,
            self.record_type.clone(),
        )
    }

    /// Encode for the record service.
    pub fn to_stored(&self) -> Result<StoredGrant> {
        Ok(StoredGrant {
            key: self.key(),
            wrapped_key: Bytes::from(self.wrapped_key.to_bytes()?),
        })
    }

    /// Decode a grant fetched from the record service.
    pub fn from_stored(stored: StoredGrant) -> Result<Self> {
        let wrapped_key = WrappedKey::from_bytes(&stored.wrapped_key)?;
        let GrantKey {
            writer_id,
            user_id,
            reader_id,
            record_type,
        } = stored.key;
        Ok(Self {
            writer_id,
            user_id,
            reader_id,
            record_type,
            wrapped_key,
        })
    }
}

/// Whether a policy request grants or removes access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

/// A command to allow or deny one reader access to one record type.
///
/// Applied by the policy engine; never persisted itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRequest {
    pub writer_id: ClientId,
    pub user_id: ClientId,
    pub reader_id: ClientId,
    pub effect: Effect,
    pub record_type: RecordType,
}

impl PolicyRequest {
    pub fn allow(
        writer_id: ClientId,
        user_id: ClientId,
        reader_id: ClientId,
        record_type: RecordType,
    ) -> Self {
        Self {
            writer_id,
            user_id,
            reader_id,
            effect: Effect::Allow,
            record_type,
        }
    }

    pub fn deny(
        writer_id: ClientId,
        user_id: ClientId,
        reader_id: ClientId,
        record_type: RecordType,
    ) -> Self {
        Self {
            effect: Effect::Deny,
            ..Self::allow(writer_id, user_id, reader_id, record_type)
        }
    }

    /// The grant this request creates or removes.
    pub fn grant_key(&self) -> GrantKey {
        GrantKey::new(
            self.writer_id,
            self.user_id,
            self.reader_id,
            self.record_type.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockbox_crypto::{wrap_key, EncryptionKey, X25519StaticSecret};

    fn rt(s: &str) -> RecordType {
        RecordType::new(s).unwrap()
    }

    #[test]
    fn test_grant_context_binds_tuple() {
        let w = ClientId::generate();
        let u = ClientId::generate();

        let a = grant_context(&w, &u, &rt("feedback"));
        assert_eq!(a, grant_context(&w, &u, &rt("feedback")));
        assert_ne!(a, grant_context(&u, &w, &rt("feedback")));
        assert_ne!(a, grant_context(&w, &u, &rt("notes")));
    }

    #[test]
    fn test_stored_roundtrip() {
        let reader = X25519StaticSecret::generate();
        let grant = AccessGrant {
            writer_id: ClientId::generate(),
            user_id: ClientId::generate(),
            reader_id: ClientId::generate(),
            record_type: rt("feedback"),
            wrapped_key: wrap_key(&EncryptionKey::generate(), &reader.public_key(), b"ctx")
                .unwrap(),
        };

        let stored = grant.to_stored().unwrap();
        assert_eq!(stored.key, grant.key());
        assert_eq!(AccessGrant::from_stored(stored).unwrap(), grant);
    }

    #[test]
    fn test_corrupt_stored_grant_rejected() {
        let stored = StoredGrant {
            key: GrantKey::new(
                ClientId::generate(),
                ClientId::generate(),
                ClientId::generate(),
                rt("feedback"),
            ),
            wrapped_key: Bytes::from_static(b"not cbor"),
        };
        assert!(AccessGrant::from_stored(stored).is_err());
    }

    #[test]
    fn test_deny_request() {
        let w = ClientId::generate();
        let r = ClientId::generate();
        let request = PolicyRequest::deny(w, w, r, rt("feedback"));

        assert_eq!(request.effect, Effect::Deny);
        assert_eq!(request.grant_key().reader_id, r);
    }

    #[test]
    fn test_policy_request_json() {
        let w = ClientId::generate();
        let request = PolicyRequest::allow(w, w, ClientId::generate(), rt("feedback"));

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["effect"], "allow");
        assert_eq!(json["record_type"], "feedback");

        let back: PolicyRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, request);
    }
}
