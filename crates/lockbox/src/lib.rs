//! # Lockbox
//!
//! A client for storing encrypted records and controlling, per record
//! type, which other principals may read them.
//!
//! ## Overview
//!
//! The record service only ever holds ciphertext. A client encrypts every
//! record under a fresh data key, encrypts that under the access key of the
//! record's type, and signs the plaintext. Sharing a type with a reader
//! wraps the access key for the reader's public key; revoking deletes that
//! wrapped copy.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lockbox::{Client, ClientConfig, RecordData};
//!
//! async fn example() -> lockbox::Result<()> {
//!     let config = ClientConfig::load::<String>(&[])?;
//!     let client = Client::open(&config).await?;
//!
//!     let id = client
//!         .write("feedback", RecordData::new().with("comment", "great lunch"))
//!         .await?;
//!     let record = client.read(&id).await?;
//!     assert_eq!(record.field("comment"), Some("great lunch"));
//!
//!     let mut cursor = client.cursor(&["feedback"])?;
//!     while let Some(meta) = cursor.next().await? {
//!         println!("{} {}", meta.record_id, meta.record_type);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `lockbox::core` - Identities, records and canonical encoding
//! - `lockbox::crypto` - Encryption, key wrapping and signatures
//! - `lockbox::transport` - The record service and its local backends
//! - `lockbox::policy` - Access grants and the policy engine

pub mod client;
pub mod config;
pub mod error;
pub mod store;

pub use client::Client;
pub use config::{ClientConfig, ConfigError, KeyMaterial};
pub use error::{Error, ErrorKind, Result};
pub use store::{MetaCursor, RecordStore, DEFAULT_PAGE_SIZE};

pub use lockbox_core as core;
pub use lockbox_crypto as crypto;
pub use lockbox_policy as policy;
pub use lockbox_transport as transport;

pub use lockbox_core::{ClientId, ClientInfo, Identity, Meta, Record, RecordData, RecordId, RecordType};
pub use lockbox_crypto::{KeyManager, StaticKeyManager};
pub use lockbox_policy::{AccessGrant, Effect, GrantState, PolicyRequest, Transition};
pub use lockbox_transport::{ListQuery, ServiceUrl, Transport};
