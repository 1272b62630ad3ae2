//! Binary envelope codec. The layouts here are the crate's only bit-exact
//! external contract.
//!
//! `SignalMessage`:
//! `[version:1][ratchet_pub:32][varint counter][varint prev_counter]`
//! `[ciphertext...][mac:8]`
//!
//! `PreKeySignalMessage`:
//! `[version:1][varint registration_id][varint signed_prekey_id][flag:1]`
//! `[varint prekey_id if flag][base_key:32][identity_key:32]`
//! `[inner SignalMessage...]`
//!
//! The MAC is HMAC-SHA256 over both identity-key encodings followed by
//! everything preceding the tag, truncated to eight bytes.

use crate::ecc::keys::EcPublicKey;
use crate::error::ProtocolError;
use crate::identity::IdentityKey;
use bytes::Buf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub const WHISPER_TYPE: u32 = 2;
pub const PREKEY_TYPE: u32 = 3;
pub const SENDERKEY_TYPE: u32 = 4;
pub const SENDERKEY_DISTRIBUTION_TYPE: u32 = 5;

pub const MAC_LENGTH: usize = 8;
pub const CURRENT_VERSION: u8 = 3;

/// A serialized ciphertext envelope of some kind.
pub trait CiphertextMessage: Send {
    fn serialize(&self) -> Vec<u8>;
    fn message_type(&self) -> u32;
}

/// A parsed incoming ciphertext, dispatched by the caller based on
/// out-of-band framing.
pub enum Ciphertext {
    PreKey(PreKeySignalMessage),
    Whisper(SignalMessage),
}

impl Ciphertext {
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Ciphertext::PreKey(m) => m.serialize(),
            Ciphertext::Whisper(m) => m.serialize(),
        }
    }

    pub fn message_type(&self) -> u32 {
        match self {
            Ciphertext::PreKey(m) => m.message_type(),
            Ciphertext::Whisper(m) => m.message_type(),
        }
    }
}

pub(crate) fn version_byte() -> u8 {
    (CURRENT_VERSION << 4) | CURRENT_VERSION
}

pub(crate) fn read_u8(buf: &mut &[u8]) -> Result<u8, ProtocolError> {
    if buf.remaining() < 1 {
        return Err(ProtocolError::MalformedEnvelope("truncated input"));
    }
    Ok(buf.get_u8())
}

pub(crate) fn read_array<const N: usize>(buf: &mut &[u8]) -> Result<[u8; N], ProtocolError> {
    if buf.remaining() < N {
        return Err(ProtocolError::MalformedEnvelope("truncated input"));
    }
    let mut out = [0u8; N];
    buf.copy_to_slice(&mut out);
    Ok(out)
}

pub(crate) fn read_varint_u32(buf: &mut &[u8]) -> Result<u32, ProtocolError> {
    let value = prost::encoding::decode_varint(buf)
        .map_err(|_| ProtocolError::MalformedEnvelope("truncated varint"))?;
    u32::try_from(value).map_err(|_| ProtocolError::MalformedEnvelope("varint out of range"))
}

pub(crate) fn write_varint_u32(buf: &mut Vec<u8>, value: u32) {
    prost::encoding::encode_varint(u64::from(value), buf);
}

pub(crate) fn check_version(byte: u8) -> Result<(), ProtocolError> {
    if byte >> 4 != CURRENT_VERSION {
        return Err(ProtocolError::MalformedEnvelope("unsupported version"));
    }
    Ok(())
}

/// The Double Ratchet message envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalMessage {
    sender_ratchet_key: EcPublicKey,
    counter: u32,
    previous_counter: u32,
    ciphertext: Vec<u8>,
    serialized: Vec<u8>,
}

impl SignalMessage {
    pub fn new(
        mac_key: &[u8],
        sender_ratchet_key: EcPublicKey,
        counter: u32,
        previous_counter: u32,
        ciphertext: Vec<u8>,
        sender_identity_key: &IdentityKey,
        receiver_identity_key: &IdentityKey,
    ) -> Self {
        let mut serialized = Vec::with_capacity(1 + 32 + 10 + ciphertext.len() + MAC_LENGTH);
        serialized.push(version_byte());
        serialized.extend_from_slice(&sender_ratchet_key.bytes());
        write_varint_u32(&mut serialized, counter);
        write_varint_u32(&mut serialized, previous_counter);
        serialized.extend_from_slice(&ciphertext);
        let mac = Self::compute_mac(
            sender_identity_key,
            receiver_identity_key,
            mac_key,
            &serialized,
        );
        serialized.extend_from_slice(&mac);

        Self {
            sender_ratchet_key,
            counter,
            previous_counter,
            ciphertext,
            serialized,
        }
    }

    pub fn deserialize(serialized: &[u8]) -> Result<Self, ProtocolError> {
        if serialized.len() < 1 + 32 + 1 + 1 + MAC_LENGTH {
            return Err(ProtocolError::MalformedEnvelope("truncated input"));
        }
        let body = &serialized[..serialized.len() - MAC_LENGTH];
        let mut cursor = body;

        check_version(read_u8(&mut cursor)?)?;
        let sender_ratchet_key = EcPublicKey::new(read_array::<32>(&mut cursor)?);
        let counter = read_varint_u32(&mut cursor)?;
        let previous_counter = read_varint_u32(&mut cursor)?;
        let ciphertext = cursor.to_vec();

        Ok(Self {
            sender_ratchet_key,
            counter,
            previous_counter,
            ciphertext,
            serialized: serialized.to_vec(),
        })
    }

    /// Constant-time check of the trailing MAC. Terminal on failure; the
    /// caller must not retry with other keys.
    pub fn verify_mac(
        &self,
        mac_key: &[u8],
        sender_identity_key: &IdentityKey,
        receiver_identity_key: &IdentityKey,
    ) -> Result<(), ProtocolError> {
        let split = self.serialized.len() - MAC_LENGTH;
        let our_mac = Self::compute_mac(
            sender_identity_key,
            receiver_identity_key,
            mac_key,
            &self.serialized[..split],
        );
        let their_mac = &self.serialized[split..];
        if our_mac.ct_eq(their_mac).unwrap_u8() != 1 {
            return Err(ProtocolError::InvalidMessageAuthentication);
        }
        Ok(())
    }

    fn compute_mac(
        sender_identity_key: &IdentityKey,
        receiver_identity_key: &IdentityKey,
        mac_key: &[u8],
        payload: &[u8],
    ) -> [u8; MAC_LENGTH] {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(mac_key).expect("HMAC accepts any key length");
        mac.update(&sender_identity_key.serialize());
        mac.update(&receiver_identity_key.serialize());
        mac.update(payload);
        let full = mac.finalize().into_bytes();
        full[..MAC_LENGTH].try_into().expect("MAC is 32 bytes")
    }

    pub fn sender_ratchet_key(&self) -> &EcPublicKey {
        &self.sender_ratchet_key
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn previous_counter(&self) -> u32 {
        self.previous_counter
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn serialized(&self) -> &[u8] {
        &self.serialized
    }
}

impl CiphertextMessage for SignalMessage {
    fn serialize(&self) -> Vec<u8> {
        self.serialized.clone()
    }

    fn message_type(&self) -> u32 {
        WHISPER_TYPE
    }
}

/// A [`SignalMessage`] wrapped with the key material the responder needs
/// to establish the session: sent until the initiator sees a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreKeySignalMessage {
    registration_id: u32,
    pre_key_id: Option<u32>,
    signed_pre_key_id: u32,
    base_key: EcPublicKey,
    identity_key: IdentityKey,
    message: SignalMessage,
    serialized: Vec<u8>,
}

impl PreKeySignalMessage {
    pub fn new(
        registration_id: u32,
        pre_key_id: Option<u32>,
        signed_pre_key_id: u32,
        base_key: EcPublicKey,
        identity_key: IdentityKey,
        message: SignalMessage,
    ) -> Self {
        let inner = message.serialized();
        let mut serialized = Vec::with_capacity(1 + 10 + 10 + 2 + 32 + 32 + inner.len());
        serialized.push(version_byte());
        write_varint_u32(&mut serialized, registration_id);
        write_varint_u32(&mut serialized, signed_pre_key_id);
        match pre_key_id {
            Some(id) => {
                serialized.push(1);
                write_varint_u32(&mut serialized, id);
            }
            None => serialized.push(0),
        }
        serialized.extend_from_slice(&base_key.bytes());
        serialized.extend_from_slice(&identity_key.public_key().bytes());
        serialized.extend_from_slice(inner);

        Self {
            registration_id,
            pre_key_id,
            signed_pre_key_id,
            base_key,
            identity_key,
            message,
            serialized,
        }
    }

    pub fn deserialize(serialized: &[u8]) -> Result<Self, ProtocolError> {
        let mut cursor = serialized;

        check_version(read_u8(&mut cursor)?)?;
        let registration_id = read_varint_u32(&mut cursor)?;
        let signed_pre_key_id = read_varint_u32(&mut cursor)?;
        let pre_key_id = match read_u8(&mut cursor)? {
            0 => None,
            1 => Some(read_varint_u32(&mut cursor)?),
            _ => return Err(ProtocolError::MalformedEnvelope("invalid prekey flag")),
        };
        let base_key = EcPublicKey::new(read_array::<32>(&mut cursor)?);
        let identity_key = IdentityKey::new(EcPublicKey::new(read_array::<32>(&mut cursor)?));
        let message = SignalMessage::deserialize(cursor)?;

        Ok(Self {
            registration_id,
            pre_key_id,
            signed_pre_key_id,
            base_key,
            identity_key,
            message,
            serialized: serialized.to_vec(),
        })
    }

    pub fn registration_id(&self) -> u32 {
        self.registration_id
    }

    pub fn pre_key_id(&self) -> Option<u32> {
        self.pre_key_id
    }

    pub fn signed_pre_key_id(&self) -> u32 {
        self.signed_pre_key_id
    }

    pub fn base_key(&self) -> &EcPublicKey {
        &self.base_key
    }

    pub fn identity_key(&self) -> &IdentityKey {
        &self.identity_key
    }

    pub fn message(&self) -> &SignalMessage {
        &self.message
    }
}

impl CiphertextMessage for PreKeySignalMessage {
    fn serialize(&self) -> Vec<u8> {
        self.serialized.clone()
    }

    fn message_type(&self) -> u32 {
        PREKEY_TYPE
    }
}
