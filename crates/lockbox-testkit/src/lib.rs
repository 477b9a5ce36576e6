//! # Lockbox Testkit
//!
//! Testing utilities for Lockbox.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a shared record service with helpers to register clients
//! - **Generators**: Proptest strategies for property-based testing
//! - **Golden vectors**: Known encodings of record data and signed messages
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use lockbox::RecordData;
//! use lockbox_testkit::TestNetwork;
//!
//! async fn example() -> lockbox::Result<()> {
//!     let network = TestNetwork::memory();
//!     let alice = network.client().await?;
//!     let bob = network.client().await?;
//!
//!     let id = alice.write("feedback", RecordData::new().with("comment", "hi")).await?;
//!     alice.share(&bob.id(), "feedback").await?;
//!     assert_eq!(bob.read(&id).await?.field("comment"), Some("hi"));
//!     Ok(())
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use lockbox_testkit::generators::RecordParams;
//!
//! proptest! {
//!     #[test]
//!     fn encoding_is_deterministic(params: RecordParams) {
//!         let a = lockbox_core::canonical_data_bytes(&params.data);
//!         let b = lockbox_core::canonical_data_bytes(&params.data);
//!         prop_assert_eq!(a, b);
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{keys_from_seed, TestNetwork};
pub use generators::RecordParams;
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
