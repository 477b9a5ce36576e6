//! The record store: encrypts, signs and stores records, and reverses that
//! on read.
//!
//! Each record gets a fresh data key. The record data is encrypted under
//! the data key, and the data key is encrypted under the access key of the
//! record's (writer, user, type) tuple. A reader therefore needs one grant
//! per tuple, not one per record.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, trace};

use lockbox_core::{
    canonical_data_bytes, decode_data, signed_message, Meta, Record, RecordData, RecordId,
    RecordType,
};
use lockbox_crypto::{CryptoError, CryptoProvider, EncryptedPayload, EncryptionKey};
use lockbox_policy::KeyRing;
use lockbox_transport::{EncryptedRecord, ListQuery, NewRecord, Transport};

use crate::error::{Error, Result};

/// Default page size of a [`MetaCursor`].
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Reads and writes records on behalf of one client.
pub struct RecordStore<T: ?Sized> {
    keys: KeyRing<T>,
}

impl<T: ?Sized> Clone for RecordStore<T> {
    fn clone(&self) -> Self {
        Self {
            keys: self.keys.clone(),
        }
    }
}

impl<T: Transport + ?Sized> RecordStore<T> {
    pub fn new(transport: Arc<T>, crypto: Arc<CryptoProvider>) -> Self {
        Self::with_keys(KeyRing::new(transport, crypto))
    }

    pub fn with_keys(keys: KeyRing<T>) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &KeyRing<T> {
        &self.keys
    }

    /// Encrypt, sign and store a record about the caller itself.
    ///
    /// The first write of a type creates the tuple's access key.
    pub async fn write(&self, record_type: &RecordType, data: &RecordData) -> Result<Meta> {
        let me = self.keys.client_id();
        let crypto = self.keys.crypto();
        let access_key = self.keys.own_access_key(record_type).await?;

        let data_key = EncryptionKey::generate();
        let encrypted_data = crypto
            .encrypt(&canonical_data_bytes(data), &data_key)?
            .to_bytes()?;
        let encrypted_record_key = crypto
            .encrypt(data_key.as_bytes(), &access_key)?
            .to_bytes()?;
        let signature = crypto.sign(&signed_message(&me, &me, record_type, data));

        let meta = self
            .keys
            .transport()
            .put_record(NewRecord {
                writer_id: me,
                user_id: me,
                record_type: record_type.clone(),
                encrypted_data: Bytes::from(encrypted_data),
                encrypted_record_key: Bytes::from(encrypted_record_key),
                signature,
            })
            .await?;

        info!(record_id = %meta.record_id, record_type = %record_type, "wrote record");
        Ok(meta)
    }

    /// Fetch, decrypt and verify a record.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no record has this id.
    /// - `AccessDenied` if the caller holds no grant for the record's tuple.
    /// - `Crypto` if decryption or signature verification fails.
    pub async fn read(&self, record_id: &RecordId) -> Result<Record> {
        let stored = self
            .keys
            .transport()
            .get_record(record_id)
            .await?
            .ok_or(Error::NotFound(*record_id))?;

        let meta = &stored.meta;
        let access_key = self
            .keys
            .access_key(&meta.writer_id, &meta.user_id, &meta.record_type)
            .await?
            .ok_or(Error::AccessDenied {
                record_id: *record_id,
                reader: self.keys.client_id(),
            })?;

        let data = self.open(&stored, &access_key)?;
        self.verify(&stored, &data).await?;

        trace!(record_id = %record_id, "read record");
        Ok(Record {
            meta: stored.meta,
            data,
        })
    }

    /// Like [`RecordStore::read`], but an unknown id is `None`.
    ///
    /// `AccessDenied` is still an error: the record exists.
    pub async fn try_read(&self, record_id: &RecordId) -> Result<Option<Record>> {
        match self.read(record_id).await {
            Ok(record) => Ok(Some(record)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// One page of metadata of records visible to the caller.
    pub async fn list(&self, query: &ListQuery) -> Result<Vec<Meta>> {
        let page = self.keys.transport().list_records(query).await?;
        debug!(
            offset = query.offset,
            limit = query.limit,
            returned = page.len(),
            "listed records"
        );
        Ok(page)
    }

    /// Iterate over all visible records of the given types, page by page.
    pub fn cursor(&self, record_types: impl IntoIterator<Item = RecordType>) -> MetaCursor<T> {
        MetaCursor::new(self.clone(), record_types, DEFAULT_PAGE_SIZE)
    }

    /// Delete a record the caller wrote.
    pub async fn delete(&self, record_id: &RecordId) -> Result<()> {
        if self.keys.transport().delete_record(record_id).await? {
            info!(record_id = %record_id, "deleted record");
            Ok(())
        } else {
            Err(Error::NotFound(*record_id))
        }
    }

    fn open(&self, stored: &EncryptedRecord, access_key: &EncryptionKey) -> Result<RecordData> {
        let crypto = self.keys.crypto();

        let sealed_key = EncryptedPayload::from_bytes(&stored.encrypted_record_key)?;
        let data_key = EncryptionKey::from_slice(&crypto.decrypt(&sealed_key, access_key)?)?;

        let sealed_data = EncryptedPayload::from_bytes(&stored.encrypted_data)?;
        let plaintext = crypto.decrypt(&sealed_data, &data_key)?;
        Ok(decode_data(&plaintext).map_err(CryptoError::from)?)
    }

    async fn verify(&self, stored: &EncryptedRecord, data: &RecordData) -> Result<()> {
        let meta = &stored.meta;
        let writer = self.keys.transport().client_info(&meta.writer_id).await?;
        let message = signed_message(&meta.writer_id, &meta.user_id, &meta.record_type, data);

        self.keys
            .crypto()
            .verify(&message, &stored.signature, &writer.signing_key)?;
        Ok(())
    }
}

/// A lazy, restartable walk over record metadata.
///
/// Fetches one page at a time and stops after the first short page.
/// Records written or deleted while walking may be skipped or repeated.
pub struct MetaCursor<T: ?Sized> {
    store: RecordStore<T>,
    query: ListQuery,
    buffer: std::vec::IntoIter<Meta>,
    exhausted: bool,
}

impl<T: Transport + ?Sized> MetaCursor<T> {
    pub fn new(
        store: RecordStore<T>,
        record_types: impl IntoIterator<Item = RecordType>,
        page_size: usize,
    ) -> Self {
        Self {
            store,
            query: ListQuery::new(page_size.max(1), 0).with_types(record_types),
            buffer: Vec::new().into_iter(),
            exhausted: false,
        }
    }

    /// The next entry, or `None` once every page has been consumed.
    pub async fn next(&mut self) -> Result<Option<Meta>> {
        loop {
            if let Some(meta) = self.buffer.next() {
                return Ok(Some(meta));
            }
            if self.exhausted {
                return Ok(None);
            }

            let page = self.store.list(&self.query).await?;
            self.exhausted = page.len() < self.query.limit;
            self.query.offset += page.len();
            self.buffer = page.into_iter();
        }
    }

    /// Start again from the first record.
    pub fn restart(&mut self) {
        self.query.offset = 0;
        self.buffer = Vec::new().into_iter();
        self.exhausted = false;
    }

    /// Drain the remaining entries.
    pub async fn collect_all(&mut self) -> Result<Vec<Meta>> {
        let mut all = Vec::new();
        while let Some(meta) = self.next().await? {
            all.push(meta);
        }
        Ok(all)
    }
}
