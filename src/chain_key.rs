use crate::kdf::{self, KeyMaterial};
use crate::message_key::{self, MessageKeys};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

const MESSAGE_KEY_SEED: &[u8] = &[0x01];
const CHAIN_KEY_SEED: &[u8] = &[0x02];

/// One link of a symmetric ratchet chain. Advancing is a one-way HMAC step:
/// a later chain key never reveals an earlier one.
#[derive(Serialize, Deserialize, Clone, Zeroize, ZeroizeOnDrop)]
pub struct ChainKey {
    key: [u8; 32],
    #[zeroize(skip)]
    index: u32,
}

impl ChainKey {
    pub fn new(key: [u8; 32], index: u32) -> Self {
        Self { key, index }
    }

    pub fn key(&self) -> [u8; 32] {
        self.key
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// The next link of the chain. Deterministic, increments the index by
    /// exactly one.
    pub fn next_key(&self) -> ChainKey {
        ChainKey::new(self.base_material(CHAIN_KEY_SEED), self.index + 1)
    }

    /// The per-message secrets for this link.
    pub fn message_keys(&self) -> MessageKeys {
        let input_key_material = self.base_material(MESSAGE_KEY_SEED);
        let bytes = kdf::derive_secrets(
            &input_key_material,
            None,
            message_key::KDF_INFO.as_bytes(),
            message_key::DERIVED_SECRETS_SIZE,
        )
        .expect("80-byte HKDF expand cannot fail");

        let material = KeyMaterial {
            cipher_key: bytes[0..32].try_into().expect("split is 32 bytes"),
            mac_key: bytes[32..64].try_into().expect("split is 32 bytes"),
            iv: bytes[64..80].try_into().expect("split is 16 bytes"),
        };

        MessageKeys::new(material.cipher_key, material.mac_key, material.iv, self.index)
    }

    fn base_material(&self, seed: &[u8]) -> [u8; 32] {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(seed);
        mac.finalize().into_bytes().into()
    }
}
