use super::sender_key_state::SenderKeyState;
use crate::ecc::key_pair::EcKeyPair;
use crate::ecc::keys::EcPublicKey;
use serde::{Deserialize, Serialize};

const MAX_STATES: usize = 5;

/// The sender-key states known for one (group, sender) pair. Several are
/// kept so messages sent before a key rotation still decrypt.
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct SenderKeyRecord {
    sender_key_states: Vec<SenderKeyState>,
}

impl SenderKeyRecord {
    pub fn new() -> Self {
        Self {
            sender_key_states: Vec::with_capacity(MAX_STATES),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sender_key_states.is_empty()
    }

    pub fn sender_key_state(&self) -> Option<&SenderKeyState> {
        self.sender_key_states.first()
    }

    pub fn sender_key_state_mut(&mut self) -> Option<&mut SenderKeyState> {
        self.sender_key_states.first_mut()
    }

    pub fn sender_key_state_by_id(&self, key_id: u32) -> Option<&SenderKeyState> {
        self.sender_key_states.iter().find(|s| s.key_id() == key_id)
    }

    pub fn sender_key_state_by_id_mut(&mut self, key_id: u32) -> Option<&mut SenderKeyState> {
        self.sender_key_states
            .iter_mut()
            .find(|s| s.key_id() == key_id)
    }

    /// Installs a state received in a distribution message; only the
    /// public signing half is known.
    pub fn add_sender_key_state(
        &mut self,
        id: u32,
        iteration: u32,
        chain_key: [u8; 32],
        signing_key: EcPublicKey,
    ) {
        let state = SenderKeyState::new(id, iteration, chain_key, signing_key, None);
        self.sender_key_states.insert(0, state);
        self.sender_key_states.truncate(MAX_STATES);
    }

    /// Replaces all states with our own freshly created sender key.
    pub fn set_sender_key_state(
        &mut self,
        id: u32,
        iteration: u32,
        chain_key: [u8; 32],
        signing_key: EcKeyPair,
    ) {
        let state = SenderKeyState::new(
            id,
            iteration,
            chain_key,
            signing_key.public_key,
            Some(signing_key.private_key),
        );
        self.sender_key_states.clear();
        self.sender_key_states.push(state);
    }
}
