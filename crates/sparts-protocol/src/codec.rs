use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ProtocolError, ProtocolResult};

/// Largest encoded envelope accepted or produced (headers and batch lists).
pub const MAX_ENVELOPE_SIZE: usize = 10 * 1024 * 1024;

/// Binary codec for envelope headers and batch lists.
///
/// bincode with its default (fixed-int, little-endian) configuration: the
/// same value always encodes to the same bytes, which signatures rely on.
pub struct EnvelopeCodec;

impl EnvelopeCodec {
    pub fn encode<T: Serialize>(value: &T) -> ProtocolResult<Vec<u8>> {
        let bytes =
            bincode::serialize(value).map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        if bytes.len() > MAX_ENVELOPE_SIZE {
            return Err(ProtocolError::TooLarge {
                size: bytes.len(),
                max: MAX_ENVELOPE_SIZE,
            });
        }
        Ok(bytes)
    }

    pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> ProtocolResult<T> {
        if bytes.len() > MAX_ENVELOPE_SIZE {
            return Err(ProtocolError::TooLarge {
                size: bytes.len(),
                max: MAX_ENVELOPE_SIZE,
            });
        }
        bincode::deserialize(bytes).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{BatchHeader, TransactionHeader};
    use sparts_crypto::Signer;
    use sparts_types::{EntityFamily, LedgerAddress};

    fn header() -> TransactionHeader {
        let signer = Signer::generate();
        let address = LedgerAddress::derive(EntityFamily::Part, "p1");
        TransactionHeader {
            family_name: "pt".into(),
            family_version: "1.0".into(),
            inputs: vec![address.clone()],
            outputs: vec![address],
            dependencies: vec![],
            payload_sha512: "00".repeat(64),
            signer_public_key: *signer.public_key(),
            batcher_public_key: *signer.public_key(),
            nonce: "1".into(),
        }
    }

    #[test]
    fn header_encoding_is_deterministic() {
        let h = header();
        assert_eq!(EnvelopeCodec::encode(&h).unwrap(), EnvelopeCodec::encode(&h).unwrap());
        let decoded: TransactionHeader = EnvelopeCodec::decode(&EnvelopeCodec::encode(&h).unwrap()).unwrap();
        assert_eq!(decoded, h);
    }

    #[test]
    fn garbage_fails_to_decode() {
        let err = EnvelopeCodec::decode::<BatchHeader>(&[0xff, 0x01]).unwrap_err();
        assert!(matches!(err, ProtocolError::Deserialization(_)));
    }

    #[test]
    fn invalid_address_in_header_is_rejected() {
        let mut bytes = EnvelopeCodec::encode(&header()).unwrap();
        // First input address starts after two length-prefixed strings and a
        // sequence length; corrupt its first hex character.
        let offset = 8 + 2 + 8 + 3 + 8 + 8;
        bytes[offset] = b'Z';
        assert!(EnvelopeCodec::decode::<TransactionHeader>(&bytes).is_err());
    }

    #[test]
    fn oversized_input_is_rejected() {
        let big = vec![0u8; MAX_ENVELOPE_SIZE + 1];
        assert!(matches!(
            EnvelopeCodec::decode::<BatchHeader>(&big),
            Err(ProtocolError::TooLarge { .. })
        ));
    }
}
