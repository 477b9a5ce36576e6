//! Golden vectors for the canonical record encodings.
//!
//! Every implementation must encode record data to exactly these bytes, or
//! signatures made by one will not verify in another.

use serde::{Deserialize, Serialize};

use lockbox_core::canonical::SIGN_DOMAIN;
use lockbox_core::{canonical_data_bytes, signed_message, ClientId, RecordData, RecordType};

/// A single golden vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldenVector {
    pub name: String,
    pub description: String,

    // Inputs
    pub writer_id: [u8; 16],
    pub user_id: [u8; 16],
    pub record_type: String,
    pub fields: Vec<(String, String)>,

    // Expected outputs, hex
    pub data_bytes: String,
    /// The signed message without its domain prefix.
    pub signed_body: String,
}

impl GoldenVector {
    pub fn data(&self) -> RecordData {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }

    /// Encode the inputs and return them next to the expected outputs.
    ///
    /// Returns `(actual_data_bytes, actual_signed_body)` as hex.
    pub fn compute(&self) -> (String, String) {
        let data = self.data();
        let record_type = match RecordType::new(self.record_type.as_str()) {
            Ok(t) => t,
            Err(e) => return (format!("invalid record type: {e}"), String::new()),
        };

        let message = signed_message(
            &ClientId::from_bytes(self.writer_id),
            &ClientId::from_bytes(self.user_id),
            &record_type,
            &data,
        );
        let body = message.strip_prefix(SIGN_DOMAIN).unwrap_or(&message[..]);

        (hex::encode(canonical_data_bytes(&data)), hex::encode(body))
    }

    pub fn verify(&self) -> bool {
        self.compute() == (self.data_bytes.clone(), self.signed_body.clone())
    }
}

// Signed body for writer [1; 16], user [2; 16] and the given type and data.
fn signed_body(record_type_hex: &str, data_hex: &str) -> String {
    format!(
        "a50001015001{ones}025002{twos}03{record_type_hex}04{data_hex}",
        ones = "01".repeat(15),
        twos = "02".repeat(15),
    )
}

fn vector(
    name: &str,
    description: &str,
    fields: &[(&str, &str)],
    data_bytes: &str,
) -> GoldenVector {
    GoldenVector {
        name: name.to_string(),
        description: description.to_string(),
        writer_id: [1; 16],
        user_id: [2; 16],
        record_type: "feedback".to_string(),
        fields: fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        data_bytes: data_bytes.to_string(),
        // text(8) "feedback"
        signed_body: signed_body("68666565646261636b", data_bytes),
    }
}

/// All golden vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        vector("empty", "Record with no fields", &[], "a0"),
        vector(
            "single_field",
            "One short text field",
            &[("comment", "hi")],
            "a167636f6d6d656e74626869",
        ),
        vector(
            "key_order",
            "Shorter keys sort first regardless of insertion order",
            &[("bb", "2"), ("c", "3"), ("a", "1")],
            "a361616131616361336262626132",
        ),
        vector(
            "empty_value",
            "Empty string value",
            &[("z", "")],
            "a1617a60",
        ),
        vector(
            "utf8_value",
            "Multi-byte UTF-8 value",
            &[("lock", "\u{1f512}")],
            "a1646c6f636b64f09f9492",
        ),
    ]
}

/// Names of vectors whose computed encoding differs from the expected one.
pub fn verify_all_vectors() -> Vec<String> {
    all_vectors()
        .into_iter()
        .filter(|v| !v.verify())
        .map(|v| v.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_match() {
        for vector in all_vectors() {
            let (data_bytes, signed_body) = vector.compute();
            assert_eq!(data_bytes, vector.data_bytes, "data bytes of {}", vector.name);
            assert_eq!(signed_body, vector.signed_body, "signed body of {}", vector.name);
        }
        assert!(verify_all_vectors().is_empty());
    }

    #[test]
    fn test_vector_names_unique() {
        let mut names: Vec<_> = all_vectors().into_iter().map(|v| v.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), all_vectors().len());
    }
}
