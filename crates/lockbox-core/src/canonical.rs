//! Canonical CBOR encoding for deterministic serialization.
//!
//! This module implements the subset of RFC 8949 Core Deterministic Encoding
//! that record contents need:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//!
//! Two encodings are produced here. [`canonical_data_bytes`] is the plaintext
//! that gets encrypted; [`signed_message`] binds that plaintext to the
//! writer, owner, and type so a record cannot be replayed under another
//! tuple.

use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::record::{RecordData, RecordType};
use crate::types::ClientId;

/// Domain separator prepended to every signed message.
pub const SIGN_DOMAIN: &[u8] = b"lockbox-record-v1:";

/// Version of the signed-content layout.
pub const CONTENT_VERSION: u64 = 1;

/// Field keys for the signed content map (integer keys for compact encoding).
mod keys {
    pub const VERSION: u64 = 0;
    pub const WRITER_ID: u64 = 1;
    pub const USER_ID: u64 = 2;
    pub const RECORD_TYPE: u64 = 3;
    pub const DATA: u64 = 4;
}

/// Encode record data to canonical CBOR bytes.
pub fn canonical_data_bytes(data: &RecordData) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_data_map(&mut buf, data);
    buf
}

/// Decode record data previously produced by [`canonical_data_bytes`].
pub fn decode_data(bytes: &[u8]) -> Result<RecordData, CoreError> {
    let map: BTreeMap<String, String> =
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;
    Ok(RecordData::from(map))
}

/// Construct the message a writer signs for a record.
///
/// Format: SIGN_DOMAIN || canonical map {0: version, 1: writer, 2: user,
/// 3: type, 4: data}
pub fn signed_message(
    writer_id: &ClientId,
    user_id: &ClientId,
    record_type: &RecordType,
    data: &RecordData,
) -> Vec<u8> {
    let mut buf = SIGN_DOMAIN.to_vec();

    // Keys 0-4 encode as single bytes, so numeric order is encoded order.
    encode_uint(&mut buf, 5, 5);

    encode_uint(&mut buf, 0, keys::VERSION);
    encode_uint(&mut buf, 0, CONTENT_VERSION);

    encode_uint(&mut buf, 0, keys::WRITER_ID);
    encode_bytes(&mut buf, writer_id.as_bytes());

    encode_uint(&mut buf, 0, keys::USER_ID);
    encode_bytes(&mut buf, user_id.as_bytes());

    encode_uint(&mut buf, 0, keys::RECORD_TYPE);
    encode_text(&mut buf, record_type.as_str());

    encode_uint(&mut buf, 0, keys::DATA);
    encode_data_map(&mut buf, data);

    buf
}

/// Encode a string map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison, which for text keys
/// means shorter keys first, then bytewise.
fn encode_data_map(buf: &mut Vec<u8>, data: &RecordData) {
    let mut pairs: Vec<(Vec<u8>, &str)> = data
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_text(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_text(buf, value);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}
