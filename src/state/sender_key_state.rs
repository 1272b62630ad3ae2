use crate::ecc::keys::{EcPrivateKey, EcPublicKey};
use crate::groups::ratchet::sender_chain_key::SenderChainKey;
use crate::groups::ratchet::sender_message_key::SenderMessageKey;
use serde::{Deserialize, Serialize};

const MAX_SKIPPED_MESSAGE_KEYS: usize = 1000;

/// One sender-key epoch: the chain, the signing key, and the cache of
/// skipped message keys. Recipients hold only the public signing half.
#[derive(Serialize, Deserialize, Clone)]
pub struct SenderKeyState {
    key_id: u32,
    sender_chain_key: SenderChainKey,
    signing_key_public: EcPublicKey,
    signing_key_private: Option<EcPrivateKey>,
    message_keys: Vec<SenderMessageKey>,
}

impl SenderKeyState {
    pub fn new(
        key_id: u32,
        iteration: u32,
        chain_key: [u8; 32],
        signing_key_public: EcPublicKey,
        signing_key_private: Option<EcPrivateKey>,
    ) -> Self {
        Self {
            key_id,
            sender_chain_key: SenderChainKey::new(iteration, chain_key),
            signing_key_public,
            signing_key_private,
            message_keys: Vec::new(),
        }
    }

    pub fn key_id(&self) -> u32 {
        self.key_id
    }

    pub fn sender_chain_key(&self) -> &SenderChainKey {
        &self.sender_chain_key
    }

    pub fn set_sender_chain_key(&mut self, sender_chain_key: SenderChainKey) {
        self.sender_chain_key = sender_chain_key;
    }

    pub fn signing_key_public(&self) -> &EcPublicKey {
        &self.signing_key_public
    }

    pub fn signing_key_private(&self) -> Option<&EcPrivateKey> {
        self.signing_key_private.as_ref()
    }

    pub fn add_sender_message_key(&mut self, key: SenderMessageKey) {
        if self.message_keys.len() >= MAX_SKIPPED_MESSAGE_KEYS {
            self.message_keys.remove(0);
        }
        self.message_keys.push(key);
    }

    /// Removes and returns the cached key for `iteration`; replays fail
    /// because the key is gone afterwards.
    pub fn take_sender_message_key(&mut self, iteration: u32) -> Option<SenderMessageKey> {
        let pos = self
            .message_keys
            .iter()
            .position(|k| k.iteration() == iteration)?;
        Some(self.message_keys.remove(pos))
    }
}
