use super::sender_message_key::SenderMessageKey;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

const MESSAGE_KEY_SEED: [u8; 1] = [0x01];
const CHAIN_KEY_SEED: [u8; 1] = [0x02];

/// Hash-ratchet chain for group sending. Each step yields one message
/// key and the next chain key; the chain never moves backwards.
#[derive(Serialize, Deserialize, Clone)]
pub struct SenderChainKey {
    iteration: u32,
    chain_key: [u8; 32],
}

impl SenderChainKey {
    pub fn new(iteration: u32, chain_key: [u8; 32]) -> Self {
        Self {
            iteration,
            chain_key,
        }
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn seed(&self) -> [u8; 32] {
        self.chain_key
    }

    pub fn sender_message_key(&self) -> SenderMessageKey {
        SenderMessageKey::derive(self.iteration, &self.derive(&MESSAGE_KEY_SEED))
    }

    pub fn next(&self) -> SenderChainKey {
        SenderChainKey::new(self.iteration + 1, self.derive(&CHAIN_KEY_SEED))
    }

    fn derive(&self, seed: &[u8]) -> [u8; 32] {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.chain_key)
            .expect("HMAC accepts any key length");
        mac.update(seed);
        mac.finalize().into_bytes().into()
    }
}
