//! Records and their metadata.
//!
//! A record is a typed, access-controlled unit of data. On the client it is a
//! [`Record`] (metadata plus plaintext [`RecordData`]); at rest it only ever
//! exists encrypted. [`Meta`] is the non-sensitive part, visible without
//! decrypt capability.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::CoreError;
use crate::types::{ClientId, RecordId};

/// Maximum length of a record type, in bytes.
pub const MAX_RECORD_TYPE_LEN: usize = 255;

/// The type of a record, such as `"feedback"`.
///
/// Access is granted per type, so the type string is the unit of sharing.
/// It must be non-empty, at most [`MAX_RECORD_TYPE_LEN`] bytes, and free of
/// whitespace and control characters.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordType(String);

impl RecordType {
    /// Validate and wrap a record type.
    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        if value.is_empty() {
            return Err(CoreError::InvalidRecordType(value, "must not be empty"));
        }
        if value.len() > MAX_RECORD_TYPE_LEN {
            return Err(CoreError::InvalidRecordType(value, "too long"));
        }
        if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(CoreError::InvalidRecordType(
                value,
                "must not contain whitespace or control characters",
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordType({:?})", self.0)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RecordType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for RecordType {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RecordType> for String {
    fn from(value: RecordType) -> Self {
        value.0
    }
}

impl AsRef<str> for RecordType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The plaintext contents of a record: a mapping of field name to value.
///
/// Fields are kept sorted so iteration order is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordData(BTreeMap<String, String>);

impl RecordData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Insert a field, returning the previous value if any.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(field.into(), value.into())
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl From<BTreeMap<String, String>> for RecordData {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RecordData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Non-sensitive descriptor of a record.
///
/// Returned by listing operations. Always available to a caller that can
/// see the record, even without the key to decrypt it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// Assigned by the store on write.
    pub record_id: RecordId,

    /// The client that wrote the record.
    pub writer_id: ClientId,

    /// The client the record is about (its owner).
    pub user_id: ClientId,

    /// The record type.
    pub record_type: RecordType,

    /// Store-assigned creation time (Unix milliseconds).
    pub created_at: i64,
}

/// A record as seen by a client that can decrypt it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub meta: Meta,
    pub data: RecordData,
}

impl Record {
    pub fn id(&self) -> RecordId {
        self.meta.record_id
    }

    pub fn record_type(&self) -> &RecordType {
        &self.meta.record_type
    }

    /// Shortcut for `self.data.get(field)`.
    pub fn field(&self, field: &str) -> Option<&str> {
        self.data.get(field)
    }
}
