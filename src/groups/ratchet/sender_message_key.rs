use crate::crypto::hkdf;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

const KDF_INFO: &[u8] = b"WhisperGroup";
const DERIVED_SIZE: usize = 48;

/// Per-message encryption material for one group message iteration.
#[derive(Serialize, Deserialize, Clone, Zeroize, ZeroizeOnDrop)]
pub struct SenderMessageKey {
    #[zeroize(skip)]
    iteration: u32,
    iv: [u8; 16],
    cipher_key: [u8; 32],
}

impl SenderMessageKey {
    pub fn derive(iteration: u32, seed: &[u8; 32]) -> Self {
        let derived = hkdf::sha256(seed, None, KDF_INFO, DERIVED_SIZE)
            .expect("48-byte HKDF expand cannot fail");

        let mut iv = [0u8; 16];
        let mut cipher_key = [0u8; 32];
        iv.copy_from_slice(&derived[..16]);
        cipher_key.copy_from_slice(&derived[16..48]);

        Self {
            iteration,
            iv,
            cipher_key,
        }
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn iv(&self) -> &[u8; 16] {
        &self.iv
    }

    pub fn cipher_key(&self) -> &[u8; 32] {
        &self.cipher_key
    }
}
