//! The policy engine: grants and revokes read access per record type.

use std::sync::Arc;

use tracing::{debug, info, warn};

use lockbox_core::{ClientId, RecordType};
use lockbox_crypto::CryptoProvider;
use lockbox_transport::{GrantKey, Transport};

use crate::error::Result;
use crate::grant::{AccessGrant, Effect, PolicyRequest};
use crate::keyring::KeyRing;
use crate::state::{GrantState, Transition};

/// Applies policy requests on behalf of one client.
pub struct PolicyEngine<T: ?Sized> {
    keys: KeyRing<T>,
}

impl<T: ?Sized> Clone for PolicyEngine<T> {
    fn clone(&self) -> Self {
        Self {
            keys: self.keys.clone(),
        }
    }
}

impl<T: Transport + ?Sized> PolicyEngine<T> {
    pub fn new(transport: Arc<T>, crypto: Arc<CryptoProvider>) -> Self {
        Self::with_keys(KeyRing::new(transport, crypto))
    }

    pub fn with_keys(keys: KeyRing<T>) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &KeyRing<T> {
        &self.keys
    }

    /// Give `reader_id` the access key of (writer, user, type).
    ///
    /// The caller must hold the access key itself. Re-authorizing overwrites
    /// the reader's wrapped key.
    ///
    /// # Errors
    ///
    /// - `KeyNotFound` if the caller has no grant for the tuple (for the
    ///   writer: nothing of this type was written yet).
    /// - `Transport(UnknownClient)` if the reader is not registered.
    /// - `Transport(Forbidden)` if the caller is neither writer nor user.
    pub async fn authorize_reader(
        &self,
        writer_id: &ClientId,
        user_id: &ClientId,
        reader_id: &ClientId,
        record_type: &RecordType,
    ) -> Result<AccessGrant> {
        let access_key = self
            .keys
            .require_access_key(writer_id, user_id, record_type)
            .await?;

        let reader = self.keys.transport().client_info(reader_id).await?;
        let grant = self
            .keys
            .wrap_for(&access_key, &reader, writer_id, user_id, record_type)?;

        self.keys.transport().put_grant(grant.to_stored()?).await?;

        info!(
            writer = %writer_id,
            user = %user_id,
            reader = %reader_id,
            record_type = %record_type,
            "authorized reader"
        );
        Ok(grant)
    }

    /// Current state of a grant.
    pub async fn state(&self, key: &GrantKey) -> Result<GrantState> {
        let grant = self.keys.transport().get_grant(key).await?;
        Ok(GrantState::from_exists(grant.is_some()))
    }

    /// Apply an allow or deny request.
    ///
    /// Allow on an existing grant and deny on a missing one succeed without
    /// changing anything. A writer's grant to itself is never removed: it is
    /// the only copy of the access key its records depend on.
    pub async fn set_policy(&self, request: &PolicyRequest) -> Result<Transition> {
        let key = request.grant_key();

        match request.effect {
            Effect::Allow => {
                let current = self.state(&key).await?;
                if current.is_granted() {
                    debug!(grant = %key, "already granted");
                    return Ok(Transition::unchanged(current));
                }

                self.authorize_reader(
                    &request.writer_id,
                    &request.user_id,
                    &request.reader_id,
                    &request.record_type,
                )
                .await?;
                Ok(current.apply(Effect::Allow))
            }
            Effect::Deny => {
                if request.reader_id == request.writer_id {
                    warn!(grant = %key, "refusing to revoke the writer's own access key");
                    return Ok(Transition::unchanged(self.state(&key).await?));
                }

                let removed = self.keys.transport().delete_grant(&key).await?;
                if removed {
                    info!(grant = %key, "revoked reader");
                } else {
                    debug!(grant = %key, "no grant to revoke");
                }
                Ok(GrantState::from_exists(removed).apply(Effect::Deny))
            }
        }
    }

    /// All grants of a tuple, the writer's own included.
    pub async fn list_grants(
        &self,
        writer_id: &ClientId,
        user_id: &ClientId,
        record_type: &RecordType,
    ) -> Result<Vec<AccessGrant>> {
        self.keys
            .transport()
            .list_grants(writer_id, user_id, record_type)
            .await?
            .into_iter()
            .map(AccessGrant::from_stored)
            .collect()
    }

    /// Revoke every reader of a tuple except the writer.
    ///
    /// Returns the number of grants removed.
    pub async fn revoke_all(
        &self,
        writer_id: &ClientId,
        user_id: &ClientId,
        record_type: &RecordType,
    ) -> Result<usize> {
        let mut removed = 0;
        for grant in self.list_grants(writer_id, user_id, record_type).await? {
            if grant.reader_id == *writer_id {
                continue;
            }
            if self.keys.transport().delete_grant(&grant.key()).await? {
                removed += 1;
            }
        }

        info!(
            writer = %writer_id,
            user = %user_id,
            record_type = %record_type,
            removed,
            "revoked all readers"
        );
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PolicyError;
    use lockbox_crypto::{KeyManager, StaticKeyManager};
    use lockbox_transport::{register_client, LocalTransport, MemoryBackend, TransportError};

    type Engine = PolicyEngine<LocalTransport<MemoryBackend>>;

    fn rt(s: &str) -> RecordType {
        RecordType::new(s).unwrap()
    }

    async fn engine(backend: &Arc<MemoryBackend>) -> Engine {
        let manager: Box<dyn KeyManager> = Box::new(StaticKeyManager::generate());
        let crypto = CryptoProvider::new(manager);
        let credentials = register_client(
            backend.as_ref(),
            crypto.public_key(),
            crypto.signing_public_key(),
        )
        .await
        .unwrap();
        let transport = LocalTransport::connect(Arc::clone(backend), &credentials)
            .await
            .unwrap();
        PolicyEngine::new(Arc::new(transport), Arc::new(crypto))
    }

    fn id(engine: &Engine) -> ClientId {
        engine.keys().client_id()
    }

    #[tokio::test]
    async fn test_authorize_before_write_is_key_not_found() {
        let backend = Arc::new(MemoryBackend::new());
        let writer = engine(&backend).await;
        let reader = engine(&backend).await;
        let w = id(&writer);

        let err = writer
            .authorize_reader(&w, &w, &id(&reader), &rt("feedback"))
            .await
            .unwrap_err();
        assert!(matches!(err, PolicyError::KeyNotFound { .. }));
    }

    #[tokio::test]
    async fn test_reader_recovers_access_key() {
        let backend = Arc::new(MemoryBackend::new());
        let writer = engine(&backend).await;
        let reader = engine(&backend).await;
        let w = id(&writer);
        let t = rt("feedback");

        let access_key = writer.keys().own_access_key(&t).await.unwrap();
        writer
            .authorize_reader(&w, &w, &id(&reader), &t)
            .await
            .unwrap();

        let recovered = reader.keys().access_key(&w, &w, &t).await.unwrap();
        assert_eq!(recovered, Some(access_key));
    }

    #[tokio::test]
    async fn test_own_access_key_is_stable() {
        let backend = Arc::new(MemoryBackend::new());
        let writer = engine(&backend).await;
        let t = rt("feedback");

        let first = writer.keys().own_access_key(&t).await.unwrap();
        let second = writer.keys().own_access_key(&t).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_set_policy_state_machine() {
        let backend = Arc::new(MemoryBackend::new());
        let writer = engine(&backend).await;
        let reader = engine(&backend).await;
        let (w, r, t) = (id(&writer), id(&reader), rt("feedback"));
        writer.keys().own_access_key(&t).await.unwrap();

        let allow = PolicyRequest::allow(w, w, r, t.clone());
        let deny = PolicyRequest::deny(w, w, r, t.clone());

        let t1 = writer.set_policy(&allow).await.unwrap();
        assert_eq!(t1.to, GrantState::Granted);
        assert!(!t1.is_noop());

        assert!(writer.set_policy(&allow).await.unwrap().is_noop());

        let t3 = writer.set_policy(&deny).await.unwrap();
        assert_eq!(t3.to, GrantState::NoGrant);
        assert!(!t3.is_noop());

        assert!(writer.set_policy(&deny).await.unwrap().is_noop());
        assert_eq!(
            writer.state(&allow.grant_key()).await.unwrap(),
            GrantState::NoGrant
        );
    }

    #[tokio::test]
    async fn test_deny_never_removes_writer_self_grant() {
        let backend = Arc::new(MemoryBackend::new());
        let writer = engine(&backend).await;
        let (w, t) = (id(&writer), rt("feedback"));
        writer.keys().own_access_key(&t).await.unwrap();

        let transition = writer
            .set_policy(&PolicyRequest::deny(w, w, w, t.clone()))
            .await
            .unwrap();

        assert!(transition.is_noop());
        assert!(writer.keys().access_key(&w, &w, &t).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_only_writer_or_user_can_grant() {
        let backend = Arc::new(MemoryBackend::new());
        let writer = engine(&backend).await;
        let reader = engine(&backend).await;
        let outsider = engine(&backend).await;
        let (w, r, t) = (id(&writer), id(&reader), rt("feedback"));
        writer.keys().own_access_key(&t).await.unwrap();
        writer.authorize_reader(&w, &w, &r, &t).await.unwrap();

        // The reader holds the key but does not manage the tuple.
        let err = reader
            .authorize_reader(&w, &w, &id(&outsider), &t)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PolicyError::Transport(TransportError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_revoke_all_keeps_writer() {
        let backend = Arc::new(MemoryBackend::new());
        let writer = engine(&backend).await;
        let a = engine(&backend).await;
        let b = engine(&backend).await;
        let (w, t) = (id(&writer), rt("feedback"));
        writer.keys().own_access_key(&t).await.unwrap();
        writer.authorize_reader(&w, &w, &id(&a), &t).await.unwrap();
        writer.authorize_reader(&w, &w, &id(&b), &t).await.unwrap();

        assert_eq!(writer.list_grants(&w, &w, &t).await.unwrap().len(), 3);
        assert_eq!(writer.revoke_all(&w, &w, &t).await.unwrap(), 2);

        let remaining = writer.list_grants(&w, &w, &t).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].reader_id, w);
    }
}
