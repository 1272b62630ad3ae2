use crate::chain_key::ChainKey;
use crate::ecc::key_pair::EcKeyPair;
use crate::ecc::keys::EcPublicKey;
use crate::identity::IdentityKey;
use crate::message_key::MessageKeys;
use crate::root_key::RootKey;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Bound on cached skipped message keys per receiving chain. Oldest
/// entries are evicted first; an evicted key makes its message
/// permanently undecryptable.
pub const MAX_SKIPPED_MESSAGE_KEYS: usize = 1000;

/// Old receiving chains kept around so reordered messages that straddle a
/// DH ratchet step still decrypt.
const MAX_RECEIVER_CHAINS: usize = 5;

const SESSION_VERSION: u32 = 3;

/// Where the session is in its lifecycle.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// Built from a bundle; no message from the peer seen yet.
    AwaitingFirstMessage,
    /// Both ratchets active.
    Established,
    /// An incoming message failed against every known state. The engine
    /// never rebuilds the session on its own; the phase stands until the
    /// builder reruns or a later message authenticates.
    ResetPending,
}

/// Our half of the DH ratchet plus the sending chain derived from it.
#[derive(Serialize, Deserialize, Clone)]
pub struct SenderChain {
    pub ratchet_key_pair: EcKeyPair,
    pub chain_key: ChainKey,
}

/// A receiving chain keyed by the remote ratchet public key, with its
/// bounded cache of skipped message keys.
#[derive(Serialize, Deserialize, Clone)]
pub struct ReceiverChain {
    pub ratchet_key: EcPublicKey,
    pub chain_key: ChainKey,
    message_keys: VecDeque<MessageKeys>,
}

impl ReceiverChain {
    pub fn new(ratchet_key: EcPublicKey, chain_key: ChainKey) -> Self {
        Self {
            ratchet_key,
            chain_key,
            message_keys: VecDeque::with_capacity(16),
        }
    }

    pub fn add_message_keys(&mut self, keys: MessageKeys) {
        if self.message_keys.len() >= MAX_SKIPPED_MESSAGE_KEYS {
            self.message_keys.pop_front();
        }
        self.message_keys.push_back(keys);
    }

    pub fn has_message_keys(&self, counter: u32) -> bool {
        self.message_keys.iter().any(|mk| mk.index() == counter)
    }

    /// Removes and returns the cached key for `counter`. Removal is what
    /// makes a second delivery of the same message fail.
    pub fn take_message_keys(&mut self, counter: u32) -> Option<MessageKeys> {
        let pos = self
            .message_keys
            .iter()
            .position(|mk| mk.index() == counter)?;
        self.message_keys.remove(pos)
    }
}

/// The full per-session ratchet state.
#[derive(Serialize, Deserialize, Clone)]
pub struct SessionState {
    session_version: u32,
    phase: SessionPhase,
    local_identity: IdentityKey,
    remote_identity: IdentityKey,
    root_key: RootKey,
    previous_counter: u32,
    sender_chain: Option<SenderChain>,
    receiver_chains: Vec<ReceiverChain>,
    pending_pre_key: Option<PendingPreKey>,
    remote_base_key: Option<EcPublicKey>,
}

/// Bundle references repeated in every outgoing envelope until the peer's
/// first reply proves the session is acknowledged.
#[derive(Serialize, Deserialize, Clone)]
pub struct PendingPreKey {
    pub pre_key_id: Option<u32>,
    pub signed_pre_key_id: u32,
    pub base_key: EcPublicKey,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            session_version: SESSION_VERSION,
            phase: SessionPhase::AwaitingFirstMessage,
            local_identity: IdentityKey::new(EcPublicKey::new([0; 32])),
            remote_identity: IdentityKey::new(EcPublicKey::new([0; 32])),
            root_key: RootKey::new([0; 32]),
            previous_counter: 0,
            sender_chain: None,
            receiver_chains: Vec::new(),
            pending_pre_key: None,
            remote_base_key: None,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.sender_chain.is_none() && self.receiver_chains.is_empty()
    }

    pub fn session_version(&self) -> u32 {
        self.session_version
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: SessionPhase) {
        self.phase = phase;
    }

    pub fn local_identity(&self) -> &IdentityKey {
        &self.local_identity
    }

    pub fn remote_identity(&self) -> &IdentityKey {
        &self.remote_identity
    }

    pub fn set_local_identity(&mut self, identity_key: IdentityKey) {
        self.local_identity = identity_key;
    }

    pub fn set_remote_identity(&mut self, identity_key: IdentityKey) {
        self.remote_identity = identity_key;
    }

    pub fn root_key(&self) -> &RootKey {
        &self.root_key
    }

    pub fn set_root_key(&mut self, root_key: RootKey) {
        self.root_key = root_key;
    }

    pub fn previous_counter(&self) -> u32 {
        self.previous_counter
    }

    pub fn set_previous_counter(&mut self, counter: u32) {
        self.previous_counter = counter;
    }

    pub fn has_sender_chain(&self) -> bool {
        self.sender_chain.is_some()
    }

    pub fn sender_chain_key(&self) -> Option<ChainKey> {
        self.sender_chain.as_ref().map(|c| c.chain_key.clone())
    }

    pub fn set_sender_chain_key(&mut self, next_chain_key: ChainKey) {
        if let Some(chain) = self.sender_chain.as_mut() {
            chain.chain_key = next_chain_key;
        }
    }

    pub fn sender_ratchet_key(&self) -> Option<EcPublicKey> {
        self.sender_chain
            .as_ref()
            .map(|c| c.ratchet_key_pair.public_key)
    }

    pub fn sender_ratchet_key_pair(&self) -> Option<&EcKeyPair> {
        self.sender_chain.as_ref().map(|c| &c.ratchet_key_pair)
    }

    pub fn set_sender_chain(&mut self, ratchet_key_pair: EcKeyPair, chain_key: ChainKey) {
        self.sender_chain = Some(SenderChain {
            ratchet_key_pair,
            chain_key,
        });
    }

    pub fn add_receiver_chain(&mut self, ratchet_key: EcPublicKey, chain_key: ChainKey) {
        self.receiver_chains
            .push(ReceiverChain::new(ratchet_key, chain_key));
        if self.receiver_chains.len() > MAX_RECEIVER_CHAINS {
            self.receiver_chains.remove(0);
        }
    }

    pub fn find_receiver_chain_mut(&mut self, key: &EcPublicKey) -> Option<&mut ReceiverChain> {
        self.receiver_chains
            .iter_mut()
            .find(|c| c.ratchet_key == *key)
    }

    pub fn find_receiver_chain(&self, key: &EcPublicKey) -> Option<&ReceiverChain> {
        self.receiver_chains.iter().find(|c| c.ratchet_key == *key)
    }

    pub fn set_receiver_chain_key(&mut self, ratchet_key: &EcPublicKey, chain_key: ChainKey) {
        if let Some(chain) = self.find_receiver_chain_mut(ratchet_key) {
            chain.chain_key = chain_key;
        }
    }

    pub fn set_unacknowledged_prekey_message(
        &mut self,
        pre_key_id: Option<u32>,
        signed_pre_key_id: u32,
        base_key: EcPublicKey,
    ) {
        self.pending_pre_key = Some(PendingPreKey {
            pre_key_id,
            signed_pre_key_id,
            base_key,
        });
    }

    pub fn has_unacknowledged_prekey_message(&self) -> bool {
        self.pending_pre_key.is_some()
    }

    pub fn unacknowledged_prekey_message(&self) -> Option<&PendingPreKey> {
        self.pending_pre_key.as_ref()
    }

    pub fn clear_unacknowledged_prekey_message(&mut self) {
        self.pending_pre_key = None;
    }

    /// The initiator's base key this state was built from, used to spot a
    /// retransmitted session-initiation envelope.
    pub fn remote_base_key(&self) -> Option<&EcPublicKey> {
        self.remote_base_key.as_ref()
    }

    pub fn set_remote_base_key(&mut self, base_key: EcPublicKey) {
        self.remote_base_key = Some(base_key);
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys_at(index: u32) -> MessageKeys {
        MessageKeys::new([0; 32], [1; 32], [2; 16], index)
    }

    #[test]
    fn skipped_key_cache_evicts_oldest_first() {
        let mut chain = ReceiverChain::new(
            EcPublicKey::new([5; 32]),
            ChainKey::new([0; 32], 0),
        );
        for i in 0..(MAX_SKIPPED_MESSAGE_KEYS as u32 + 10) {
            chain.add_message_keys(keys_at(i));
        }
        // The first ten entries fell out of the bounded cache.
        for i in 0..10 {
            assert!(!chain.has_message_keys(i));
        }
        assert!(chain.has_message_keys(10));
        assert!(chain.has_message_keys(MAX_SKIPPED_MESSAGE_KEYS as u32 + 9));
    }

    #[test]
    fn taking_a_key_removes_it() {
        let mut chain = ReceiverChain::new(
            EcPublicKey::new([5; 32]),
            ChainKey::new([0; 32], 0),
        );
        chain.add_message_keys(keys_at(3));
        assert!(chain.take_message_keys(3).is_some());
        assert!(chain.take_message_keys(3).is_none());
    }

    #[test]
    fn receiver_chains_are_bounded() {
        let mut state = SessionState::new();
        for i in 0..10u8 {
            state.add_receiver_chain(EcPublicKey::new([i; 32]), ChainKey::new([i; 32], 0));
        }
        assert!(state.find_receiver_chain(&EcPublicKey::new([0; 32])).is_none());
        assert!(state.find_receiver_chain(&EcPublicKey::new([9; 32])).is_some());
    }
}
