use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const DERIVED_SECRETS_SIZE: usize = 80;
pub const KDF_INFO: &str = "WhisperMessageKeys";

/// The secrets protecting exactly one message: cipher key, MAC key and IV,
/// tagged with the chain index they were derived at. Consumed once, then
/// discarded (the skipped-key cache removes entries on use). Zeroed on drop.
#[derive(Serialize, Deserialize, Clone, Zeroize, ZeroizeOnDrop)]
pub struct MessageKeys {
    cipher_key: [u8; 32],
    mac_key: [u8; 32],
    iv: [u8; 16],
    #[zeroize(skip)]
    index: u32,
}

impl MessageKeys {
    pub fn new(cipher_key: [u8; 32], mac_key: [u8; 32], iv: [u8; 16], index: u32) -> Self {
        Self {
            cipher_key,
            mac_key,
            iv,
            index,
        }
    }

    pub fn cipher_key(&self) -> &[u8; 32] {
        &self.cipher_key
    }

    pub fn mac_key(&self) -> &[u8; 32] {
        &self.mac_key
    }

    pub fn iv(&self) -> &[u8; 16] {
        &self.iv
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}
