//! # Lockbox Policy
//!
//! Record-type level access control.
//!
//! ## Overview
//!
//! Every (writer, user, type) tuple has one access key. Read capability is
//! an [`AccessGrant`]: that access key wrapped for a reader. Allowing a
//! reader creates the grant; denying deletes it. Records themselves are
//! never touched, so sharing and revocation cost one request each.
//!
//! ## Key Concepts
//!
//! - **AccessGrant**: a wrapped access key for one reader
//! - **PolicyRequest**: an allow/deny command for one grant
//! - **GrantState**: `NoGrant` or `Granted`; requests are idempotent
//! - **KeyRing**: unwraps the caller's own grants into usable access keys
//!
//! Revocation removes future access. A reader that already unwrapped the
//! access key keeps whatever it decrypted.

pub mod engine;
pub mod error;
pub mod grant;
pub mod keyring;
pub mod state;

pub use engine::PolicyEngine;
pub use error::{PolicyError, Result};
pub use grant::{grant_context, AccessGrant, Effect, PolicyRequest};
pub use keyring::KeyRing;
pub use state::{GrantState, Transition};

pub use lockbox_transport::GrantKey;
