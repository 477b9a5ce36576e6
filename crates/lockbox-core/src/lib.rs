//! # Lockbox Core
//!
//! Pure primitives for Lockbox: client identities, records, metadata, and
//! canonical encoding.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over the data structures shared by every other Lockbox crate.
//!
//! ## Key Types
//!
//! - [`ClientId`] - Stable identifier of a principal
//! - [`RecordId`] - Store-assigned identifier of a record
//! - [`Identity`] / [`ClientInfo`] - A principal and its published public keys
//! - [`Record`] / [`Meta`] - Plaintext record view and its non-sensitive descriptor
//! - [`RecordData`] - The string-to-string mapping carried by a record
//!
//! ## Canonicalization
//!
//! Record contents are signed over deterministic CBOR. See [`canonical`] module.

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod record;
pub mod types;

pub use canonical::{canonical_data_bytes, decode_data, signed_message};
pub use crypto::{Ed25519PublicKey, Ed25519Signature, SigningKeypair, X25519PublicKey};
pub use error::CoreError;
pub use identity::{ClientInfo, Identity};
pub use record::{Meta, Record, RecordData, RecordType, MAX_RECORD_TYPE_LEN};
pub use types::{ClientId, RecordId};
