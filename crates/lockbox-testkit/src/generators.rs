//! Proptest generators for property-based testing.

use proptest::prelude::*;

use lockbox_core::{ClientId, RecordData, RecordId, RecordType};
use lockbox_crypto::{ClientKeys, EncryptionKey};

/// Generate a random ClientId.
pub fn client_id() -> impl Strategy<Value = ClientId> {
    any::<[u8; 16]>().prop_map(ClientId::from_bytes)
}

/// Generate a random RecordId.
pub fn record_id() -> impl Strategy<Value = RecordId> {
    any::<[u8; 16]>().prop_map(RecordId::from_bytes)
}

/// Generate a valid record type.
pub fn record_type() -> impl Strategy<Value = RecordType> {
    "[a-z][a-z0-9_]{0,31}".prop_map(|s| {
        RecordType::new(s).unwrap_or_else(|e| unreachable!("generated type rejected: {e}"))
    })
}

/// Generate record data with up to `max_fields` fields.
pub fn record_data(max_fields: usize) -> impl Strategy<Value = RecordData> {
    prop::collection::btree_map("[a-z_]{1,16}", any::<String>(), 0..=max_fields)
        .prop_map(RecordData::from)
}

/// Generate client keys from random seeds.
pub fn client_keys() -> impl Strategy<Value = ClientKeys> {
    (any::<[u8; 32]>(), any::<[u8; 32]>())
        .prop_map(|(encryption, signing)| ClientKeys::from_seeds(encryption, &signing))
}

/// Generate a symmetric key.
pub fn encryption_key() -> impl Strategy<Value = EncryptionKey> {
    any::<[u8; 32]>().prop_map(EncryptionKey::from_bytes)
}

/// Parameters of a record a client could write.
#[derive(Debug, Clone)]
pub struct RecordParams {
    pub record_type: RecordType,
    pub data: RecordData,
}

impl Arbitrary for RecordParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (record_type(), record_data(8))
            .prop_map(|(record_type, data)| RecordParams { record_type, data })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockbox_core::{canonical_data_bytes, decode_data, signed_message};
    use lockbox_crypto::EncryptedPayload;

    proptest! {
        #[test]
        fn test_canonical_bytes_deterministic(params: RecordParams) {
            let mut pairs: Vec<_> = params.data.iter().collect();
            pairs.reverse();
            let reordered: RecordData = pairs.into_iter().collect();
            prop_assert_eq!(
                canonical_data_bytes(&params.data),
                canonical_data_bytes(&reordered)
            );
        }

        #[test]
        fn test_canonical_bytes_decode(params: RecordParams) {
            let bytes = canonical_data_bytes(&params.data);
            prop_assert_eq!(decode_data(&bytes).unwrap(), params.data);
        }

        #[test]
        fn test_signed_message_separates_writers(
            params: RecordParams,
            a in client_id(),
            b in client_id(),
        ) {
            prop_assume!(a != b);
            let t = &params.record_type;
            prop_assert_ne!(
                signed_message(&a, &a, t, &params.data),
                signed_message(&b, &b, t, &params.data)
            );
        }

        #[test]
        fn test_wrong_key_never_decrypts(
            params: RecordParams,
            k1 in encryption_key(),
            k2 in encryption_key(),
        ) {
            prop_assume!(k1 != k2);
            let sealed = EncryptedPayload::encrypt(&canonical_data_bytes(&params.data), &k1).unwrap();
            prop_assert!(sealed.decrypt(&k2).is_err());
        }
    }
}
