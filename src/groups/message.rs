//! Group message envelopes.
//!
//! `SenderKeyMessage`:
//! `[version:1][varint key_id][varint iteration][ciphertext...][signature:64]`
//!
//! `SenderKeyDistributionMessage`:
//! `[version:1][varint key_id][varint iteration][chain_key:32][signing_key:32]`
//!
//! The signature covers everything preceding it.

use crate::ecc::curve;
use crate::ecc::keys::{EcPrivateKey, EcPublicKey};
use crate::error::ProtocolError;
use crate::protocol::{
    CiphertextMessage, SENDERKEY_DISTRIBUTION_TYPE, SENDERKEY_TYPE, check_version, read_array,
    read_u8, read_varint_u32, version_byte, write_varint_u32,
};

const SIGNATURE_LENGTH: usize = 64;

/// A group message: the sender signs each envelope with the per-key
/// signing key distributed alongside the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderKeyMessage {
    key_id: u32,
    iteration: u32,
    ciphertext: Vec<u8>,
    serialized: Vec<u8>,
}

impl SenderKeyMessage {
    pub fn new(
        key_id: u32,
        iteration: u32,
        ciphertext: Vec<u8>,
        signing_key: &EcPrivateKey,
    ) -> Self {
        let mut serialized = Vec::with_capacity(1 + 10 + ciphertext.len() + SIGNATURE_LENGTH);
        serialized.push(version_byte());
        write_varint_u32(&mut serialized, key_id);
        write_varint_u32(&mut serialized, iteration);
        serialized.extend_from_slice(&ciphertext);
        let signature = curve::calculate_signature(signing_key, &serialized);
        serialized.extend_from_slice(&signature);

        Self {
            key_id,
            iteration,
            ciphertext,
            serialized,
        }
    }

    pub fn deserialize(serialized: &[u8]) -> Result<Self, ProtocolError> {
        if serialized.len() < 1 + 1 + 1 + SIGNATURE_LENGTH {
            return Err(ProtocolError::MalformedEnvelope("truncated input"));
        }
        let body = &serialized[..serialized.len() - SIGNATURE_LENGTH];
        let mut cursor = body;

        check_version(read_u8(&mut cursor)?)?;
        let key_id = read_varint_u32(&mut cursor)?;
        let iteration = read_varint_u32(&mut cursor)?;
        let ciphertext = cursor.to_vec();

        Ok(Self {
            key_id,
            iteration,
            ciphertext,
            serialized: serialized.to_vec(),
        })
    }

    /// Checks the trailing signature against the sender's signing key.
    pub fn verify_signature(&self, signing_key: &EcPublicKey) -> Result<(), ProtocolError> {
        let split = self.serialized.len() - SIGNATURE_LENGTH;
        let signature: [u8; 64] = self.serialized[split..]
            .try_into()
            .expect("split leaves 64 bytes");
        if !curve::verify_signature(signing_key, &self.serialized[..split], &signature) {
            return Err(ProtocolError::InvalidMessageAuthentication);
        }
        Ok(())
    }

    pub fn key_id(&self) -> u32 {
        self.key_id
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn serialized(&self) -> &[u8] {
        &self.serialized
    }
}

impl CiphertextMessage for SenderKeyMessage {
    fn serialize(&self) -> Vec<u8> {
        self.serialized.clone()
    }

    fn message_type(&self) -> u32 {
        SENDERKEY_TYPE
    }
}

/// Announces a sender's current chain position and signing key to the
/// other members of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderKeyDistributionMessage {
    key_id: u32,
    iteration: u32,
    chain_key: [u8; 32],
    signing_key: EcPublicKey,
    serialized: Vec<u8>,
}

impl SenderKeyDistributionMessage {
    pub fn new(key_id: u32, iteration: u32, chain_key: [u8; 32], signing_key: EcPublicKey) -> Self {
        let mut serialized = Vec::with_capacity(1 + 10 + 32 + 32);
        serialized.push(version_byte());
        write_varint_u32(&mut serialized, key_id);
        write_varint_u32(&mut serialized, iteration);
        serialized.extend_from_slice(&chain_key);
        serialized.extend_from_slice(&signing_key.bytes());

        Self {
            key_id,
            iteration,
            chain_key,
            signing_key,
            serialized,
        }
    }

    pub fn deserialize(serialized: &[u8]) -> Result<Self, ProtocolError> {
        let mut cursor = serialized;

        check_version(read_u8(&mut cursor)?)?;
        let key_id = read_varint_u32(&mut cursor)?;
        let iteration = read_varint_u32(&mut cursor)?;
        let chain_key = read_array::<32>(&mut cursor)?;
        let signing_key = EcPublicKey::new(read_array::<32>(&mut cursor)?);
        if !cursor.is_empty() {
            return Err(ProtocolError::MalformedEnvelope("trailing bytes"));
        }

        Ok(Self {
            key_id,
            iteration,
            chain_key,
            signing_key,
            serialized: serialized.to_vec(),
        })
    }

    pub fn key_id(&self) -> u32 {
        self.key_id
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn chain_key(&self) -> &[u8; 32] {
        &self.chain_key
    }

    pub fn signing_key(&self) -> &EcPublicKey {
        &self.signing_key
    }
}

impl CiphertextMessage for SenderKeyDistributionMessage {
    fn serialize(&self) -> Vec<u8> {
        self.serialized.clone()
    }

    fn message_type(&self) -> u32 {
        SENDERKEY_DISTRIBUTION_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecc::curve::generate_key_pair;

    #[test]
    fn sender_key_message_round_trip() {
        let signing = generate_key_pair();
        let message = SenderKeyMessage::new(42, 17, vec![0xCD; 48], &signing.private_key);

        let decoded = SenderKeyMessage::deserialize(message.serialized()).unwrap();
        assert_eq!(decoded, message);
        assert_eq!(decoded.key_id(), 42);
        assert_eq!(decoded.iteration(), 17);
        decoded.verify_signature(&signing.public_key).unwrap();
    }

    #[test]
    fn wrong_signing_key_fails_verification() {
        let signing = generate_key_pair();
        let other = generate_key_pair();
        let message = SenderKeyMessage::new(1, 0, vec![0xEE; 16], &signing.private_key);

        assert!(matches!(
            message.verify_signature(&other.public_key),
            Err(ProtocolError::InvalidMessageAuthentication)
        ));
    }

    #[test]
    fn tampered_ciphertext_fails_verification() {
        let signing = generate_key_pair();
        let message = SenderKeyMessage::new(1, 3, vec![0xEE; 16], &signing.private_key);

        let mut bytes = message.serialize();
        bytes[8] ^= 0x80;
        let tampered = SenderKeyMessage::deserialize(&bytes).unwrap();
        assert!(matches!(
            tampered.verify_signature(&signing.public_key),
            Err(ProtocolError::InvalidMessageAuthentication)
        ));
    }

    #[test]
    fn distribution_message_round_trip() {
        let signing = generate_key_pair();
        let message = SenderKeyDistributionMessage::new(9, 4, [0x55; 32], signing.public_key);

        let decoded = SenderKeyDistributionMessage::deserialize(&message.serialize()).unwrap();
        assert_eq!(decoded, message);
        assert_eq!(decoded.chain_key(), &[0x55; 32]);
        assert_eq!(decoded.signing_key(), &signing.public_key);
    }

    #[test]
    fn truncated_distribution_message_is_malformed() {
        let signing = generate_key_pair();
        let bytes = SenderKeyDistributionMessage::new(9, 4, [0x55; 32], signing.public_key)
            .serialize();
        assert!(matches!(
            SenderKeyDistributionMessage::deserialize(&bytes[..bytes.len() - 1]),
            Err(ProtocolError::MalformedEnvelope(_))
        ));
    }
}
