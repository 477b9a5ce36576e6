//! In-memory implementation of the Backend trait.
//!
//! Same semantics as SQLite but keeps everything in memory with no
//! persistence. Used by tests and by the `memory:` service URL.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use lockbox_core::{ClientId, ClientInfo, Meta, RecordId, RecordType};

use crate::backend::Backend;
use crate::error::{Result, TransportError};
use crate::types::{EncryptedRecord, GrantKey, ListQuery, Registration, StoredGrant};

/// In-memory backend.
///
/// All data is lost when the backend is dropped. Thread-safe via RwLock.
pub struct MemoryBackend {
    inner: RwLock<MemoryBackendInner>,
}

#[derive(Default)]
struct MemoryBackendInner {
    /// Registrations indexed by api key id.
    registrations: HashMap<String, Registration>,

    /// Client id -> api key id.
    clients: HashMap<ClientId, String>,

    /// Records in insertion order, keyed by sequence number.
    records: BTreeMap<u64, EncryptedRecord>,

    /// Record id -> sequence number.
    positions: HashMap<RecordId, u64>,

    /// Next sequence number to assign.
    next_seq: u64,

    /// Grants, ordered so that a tuple's grants are adjacent.
    grants: BTreeMap<GrantKey, StoredGrant>,
}

impl MemoryBackendInner {
    fn is_visible(&self, viewer: &ClientId, meta: &Meta) -> bool {
        if meta.writer_id == *viewer || meta.user_id == *viewer {
            return true;
        }
        let key = GrantKey::new(
            meta.writer_id,
            meta.user_id,
            *viewer,
            meta.record_type.clone(),
        );
        self.grants.contains_key(&key)
    }
}

impl MemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryBackendInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryBackendInner>> {
        self.inner
            .read()
            .map_err(|e| TransportError::Task(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryBackendInner>> {
        self.inner
            .write()
            .map_err(|e| TransportError::Task(format!("lock poisoned: {e}")))
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn register(&self, registration: Registration) -> Result<()> {
        let mut inner = self.write()?;

        if inner.registrations.contains_key(&registration.api_key_id) {
            return Err(TransportError::DuplicateApiKey(registration.api_key_id));
        }

        inner
            .clients
            .insert(registration.info.client_id, registration.api_key_id.clone());
        inner
            .registrations
            .insert(registration.api_key_id.clone(), registration);
        Ok(())
    }

    async fn registration(&self, api_key_id: &str) -> Result<Option<Registration>> {
        let inner = self.read()?;
        Ok(inner.registrations.get(api_key_id).cloned())
    }

    async fn client_info(&self, client_id: &ClientId) -> Result<Option<ClientInfo>> {
        let inner = self.read()?;
        Ok(inner
            .clients
            .get(client_id)
            .and_then(|key| inner.registrations.get(key))
            .map(|r| r.info.clone()))
    }

    async fn insert_record(&self, record: EncryptedRecord) -> Result<()> {
        let mut inner = self.write()?;

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.positions.insert(record.meta.record_id, seq);
        inner.records.insert(seq, record);
        Ok(())
    }

    async fn get_record(&self, record_id: &RecordId) -> Result<Option<EncryptedRecord>> {
        let inner = self.read()?;
        Ok(inner
            .positions
            .get(record_id)
            .and_then(|seq| inner.records.get(seq))
            .cloned())
    }

    async fn list_records(&self, viewer: &ClientId, query: &ListQuery) -> Result<Vec<Meta>> {
        let inner = self.read()?;
        Ok(inner
            .records
            .values()
            .map(|r| &r.meta)
            .filter(|meta| query.matches(&meta.record_type))
            .filter(|meta| inner.is_visible(viewer, meta))
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn delete_record(&self, record_id: &RecordId) -> Result<bool> {
        let mut inner = self.write()?;
        match inner.positions.remove(record_id) {
            Some(seq) => Ok(inner.records.remove(&seq).is_some()),
            None => Ok(false),
        }
    }

    async fn upsert_grant(&self, grant: StoredGrant) -> Result<()> {
        let mut inner = self.write()?;
        inner.grants.insert(grant.key.clone(), grant);
        Ok(())
    }

    async fn insert_grant(&self, grant: StoredGrant) -> Result<bool> {
        let mut inner = self.write()?;
        match inner.grants.entry(grant.key.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(grant);
                Ok(true)
            }
        }
    }

    async fn get_grant(&self, key: &GrantKey) -> Result<Option<StoredGrant>> {
        let inner = self.read()?;
        Ok(inner.grants.get(key).cloned())
    }

    async fn delete_grant(&self, key: &GrantKey) -> Result<bool> {
        let mut inner = self.write()?;
        Ok(inner.grants.remove(key).is_some())
    }

    async fn list_grants(
        &self,
        writer_id: &ClientId,
        user_id: &ClientId,
        record_type: &RecordType,
    ) -> Result<Vec<StoredGrant>> {
        let inner = self.read()?;
        let mut grants: Vec<StoredGrant> = inner
            .grants
            .values()
            .filter(|g| {
                g.key.writer_id == *writer_id
                    && g.key.user_id == *user_id
                    && g.key.record_type == *record_type
            })
            .cloned()
            .collect();
        grants.sort_by(|a, b| a.key.reader_id.cmp(&b.key.reader_id));
        Ok(grants)
    }
}
