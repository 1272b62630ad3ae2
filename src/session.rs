//! Session establishment and the per-message ratchet.
//!
//! [`SessionBuilder`] runs the initial key agreement, either from a
//! published prekey bundle (initiator) or from an incoming session
//! initiation envelope (responder). [`SessionCipher`] then drives the
//! Double Ratchet for every message.
//!
//! Decryption never mutates stored state on failure: each candidate state
//! is cloned, the attempt runs against the clone, and only a successful
//! clone is committed back to the record.

use crate::address::SignalAddress;
use crate::chain_key::ChainKey;
use crate::crypto::cbc;
use crate::ecc::curve;
use crate::ecc::keys::EcPublicKey;
use crate::error::ProtocolError;
use crate::message_key::MessageKeys;
use crate::protocol::{Ciphertext, PreKeySignalMessage, SignalMessage};
use crate::ratchet::{
    self,
    parameters::{ReceiverParameters, SenderParameters},
};
use crate::state::prekey_bundle::PreKeyBundle;
use crate::state::session_record::SessionRecord;
use crate::state::session_state::{SessionPhase, SessionState};
use crate::store::SignalProtocolStore;
use std::sync::Arc;

/// How far ahead of the current chain a counter may point before the
/// envelope is rejected instead of ratcheted up to.
const MAX_FUTURE_MESSAGES: u32 = 2000;

/// Establishes sessions with one remote address.
pub struct SessionBuilder<S: SignalProtocolStore> {
    store: Arc<S>,
    remote_address: SignalAddress,
}

impl<S: SignalProtocolStore> SessionBuilder<S> {
    pub fn new(store: Arc<S>, remote_address: SignalAddress) -> Self {
        Self {
            store,
            remote_address,
        }
    }

    /// Initiator side: builds a session from the peer's published bundle.
    /// The session can encrypt immediately; it stays in
    /// [`SessionPhase::AwaitingFirstMessage`] until the peer replies.
    pub async fn process_bundle(&self, bundle: &PreKeyBundle) -> Result<(), ProtocolError> {
        if !curve::verify_signature(
            &bundle.identity_key.public_key(),
            &bundle.signed_pre_key_public.serialize(),
            &bundle.signed_pre_key_signature,
        ) {
            return Err(ProtocolError::InvalidSignature);
        }

        if !self
            .store
            .is_trusted_identity(&self.remote_address, &bundle.identity_key)
            .await
            .map_err(ProtocolError::Store)?
        {
            return Err(ProtocolError::UntrustedIdentity);
        }

        let our_identity = self
            .store
            .get_identity_key_pair()
            .await
            .map_err(ProtocolError::Store)?;
        let our_base_key = curve::generate_key_pair();

        let session_keys = ratchet::calculate_sender_session(&SenderParameters {
            our_identity_key_pair: our_identity.clone(),
            our_base_key: our_base_key.clone(),
            their_identity_key: bundle.identity_key.clone(),
            their_signed_pre_key: bundle.signed_pre_key_public,
            their_one_time_pre_key: bundle.pre_key_public,
        })?;

        let mut record = self
            .store
            .load_session(&self.remote_address)
            .await
            .map_err(ProtocolError::Store)?;
        if !record.is_fresh() {
            record.archive_current_state();
        }

        let state = record.session_state_mut();
        state.set_local_identity(our_identity.public_key().clone());
        state.set_remote_identity(bundle.identity_key.clone());

        // The agreed chain becomes our receiving chain for the peer's
        // signed prekey; our sending chain comes from one DH step past it.
        state.add_receiver_chain(
            bundle.signed_pre_key_public,
            session_keys.chain_key.clone(),
        );
        let our_ratchet_key = curve::generate_key_pair();
        let sending = session_keys
            .root_key
            .create_chain(&bundle.signed_pre_key_public, &our_ratchet_key)?;
        state.set_root_key(sending.root_key);
        state.set_sender_chain(our_ratchet_key, sending.chain_key);

        state.set_unacknowledged_prekey_message(
            bundle.pre_key_id,
            bundle.signed_pre_key_id,
            our_base_key.public_key,
        );
        state.set_phase(SessionPhase::AwaitingFirstMessage);

        self.store
            .store_session(&self.remote_address, &record)
            .await
            .map_err(ProtocolError::Store)?;
        self.store
            .save_identity(&self.remote_address, &bundle.identity_key)
            .await
            .map_err(ProtocolError::Store)?;

        log::debug!("built initiator session with {}", self.remote_address);
        Ok(())
    }

    /// Responder side: builds a session from an incoming initiation
    /// envelope. Returns the id of the one-time prekey it consumed, or
    /// `None` when the envelope retransmits a known session or carried no
    /// one-time prekey.
    pub(crate) async fn process_prekey_message(
        &self,
        record: &mut SessionRecord,
        message: &PreKeySignalMessage,
    ) -> Result<Option<u32>, ProtocolError> {
        if !self
            .store
            .is_trusted_identity(&self.remote_address, message.identity_key())
            .await
            .map_err(ProtocolError::Store)?
        {
            return Err(ProtocolError::UntrustedIdentity);
        }

        // A retransmitted initiation reuses its base key; the session it
        // built the first time still decrypts the inner message.
        if record.session_state().remote_base_key() == Some(message.base_key()) {
            return Ok(None);
        }
        if let Some(index) = record
            .previous_states()
            .iter()
            .position(|s| s.remote_base_key() == Some(message.base_key()))
        {
            record.promote_state(index);
            return Ok(None);
        }

        let signed_prekey = self
            .store
            .load_signed_prekey(message.signed_pre_key_id())
            .await
            .map_err(ProtocolError::Store)?
            .ok_or(ProtocolError::NoSignedPreKey(message.signed_pre_key_id()))?;

        let one_time_prekey = match message.pre_key_id() {
            Some(id) => {
                let prekey = self
                    .store
                    .load_prekey(id)
                    .await
                    .map_err(ProtocolError::Store)?;
                if prekey.is_none() {
                    log::warn!(
                        "one-time prekey {id} referenced by {} is gone, continuing without it",
                        self.remote_address
                    );
                }
                prekey
            }
            None => None,
        };

        let our_identity = self
            .store
            .get_identity_key_pair()
            .await
            .map_err(ProtocolError::Store)?;

        let session_keys = ratchet::calculate_receiver_session(&ReceiverParameters {
            our_identity_key_pair: our_identity.clone(),
            our_signed_pre_key: signed_prekey.key_pair().clone(),
            our_one_time_pre_key: one_time_prekey.as_ref().map(|r| r.key_pair()),
            their_identity_key: message.identity_key().clone(),
            their_base_key: *message.base_key(),
        })?;

        if !record.is_fresh() {
            record.archive_current_state();
        }

        let state = record.session_state_mut();
        state.set_local_identity(our_identity.public_key().clone());
        state.set_remote_identity(message.identity_key().clone());
        state.set_remote_base_key(*message.base_key());

        // Our signed prekey doubles as our first ratchet key; the agreed
        // chain is our sending chain. The initiator's first ratchet key
        // arrives with the inner message and triggers a normal DH step.
        state.set_root_key(session_keys.root_key);
        state.set_sender_chain(signed_prekey.key_pair().clone(), session_keys.chain_key);
        state.set_phase(SessionPhase::Established);

        self.store
            .save_identity(&self.remote_address, message.identity_key())
            .await
            .map_err(ProtocolError::Store)?;

        log::debug!("built responder session with {}", self.remote_address);
        Ok(one_time_prekey.map(|r| r.id()))
    }
}

/// Encrypts and decrypts messages for one established (or establishing)
/// session.
pub struct SessionCipher<S: SignalProtocolStore> {
    store: Arc<S>,
    remote_address: SignalAddress,
    builder: SessionBuilder<S>,
}

impl<S: SignalProtocolStore> SessionCipher<S> {
    pub fn new(store: Arc<S>, remote_address: SignalAddress) -> Self {
        let builder = SessionBuilder::new(store.clone(), remote_address.clone());
        Self {
            store,
            remote_address,
            builder,
        }
    }

    /// Encrypts one message, advancing the sending chain by one step.
    /// Until the peer's first reply the envelope is wrapped with the
    /// bundle references the responder needs to establish the session.
    pub async fn encrypt(&self, plaintext: &[u8]) -> Result<Ciphertext, ProtocolError> {
        let mut record = self
            .store
            .load_session(&self.remote_address)
            .await
            .map_err(ProtocolError::Store)?;
        let state = record.session_state_mut();

        let chain_key = state
            .sender_chain_key()
            .ok_or(ProtocolError::UninitializedSession)?;
        let ratchet_key = state
            .sender_ratchet_key()
            .ok_or(ProtocolError::UninitializedSession)?;
        let message_keys = chain_key.message_keys();

        let ciphertext = cbc::encrypt(
            message_keys.cipher_key(),
            message_keys.iv(),
            plaintext,
        )?;

        let message = SignalMessage::new(
            message_keys.mac_key(),
            ratchet_key,
            chain_key.index(),
            state.previous_counter(),
            ciphertext,
            state.local_identity(),
            state.remote_identity(),
        );

        let envelope = match state.unacknowledged_prekey_message() {
            Some(pending) => {
                let registration_id = self
                    .store
                    .get_local_registration_id()
                    .await
                    .map_err(ProtocolError::Store)?;
                Ciphertext::PreKey(PreKeySignalMessage::new(
                    registration_id,
                    pending.pre_key_id,
                    pending.signed_pre_key_id,
                    pending.base_key,
                    state.local_identity().clone(),
                    message,
                ))
            }
            None => Ciphertext::Whisper(message),
        };

        state.set_sender_chain_key(chain_key.next_key());
        self.store
            .store_session(&self.remote_address, &record)
            .await
            .map_err(ProtocolError::Store)?;

        Ok(envelope)
    }

    /// Decrypts one incoming envelope of either kind.
    pub async fn decrypt(&self, ciphertext: &Ciphertext) -> Result<Vec<u8>, ProtocolError> {
        match ciphertext {
            Ciphertext::PreKey(message) => self.decrypt_prekey_message(message).await,
            Ciphertext::Whisper(message) => self.decrypt_whisper_message(message).await,
        }
    }

    async fn decrypt_prekey_message(
        &self,
        message: &PreKeySignalMessage,
    ) -> Result<Vec<u8>, ProtocolError> {
        let mut record = self
            .store
            .load_session(&self.remote_address)
            .await
            .map_err(ProtocolError::Store)?;

        let used_prekey_id = self
            .builder
            .process_prekey_message(&mut record, message)
            .await?;

        let plaintext = Self::decrypt_with_record(&mut record, message.message())?;

        // Committed only after the inner message authenticated; a forged
        // initiation never replaces an existing session.
        self.store
            .store_session(&self.remote_address, &record)
            .await
            .map_err(ProtocolError::Store)?;
        if let Some(id) = used_prekey_id {
            self.store
                .remove_prekey(id)
                .await
                .map_err(ProtocolError::Store)?;
        }

        Ok(plaintext)
    }

    async fn decrypt_whisper_message(
        &self,
        message: &SignalMessage,
    ) -> Result<Vec<u8>, ProtocolError> {
        let mut record = self
            .store
            .load_session(&self.remote_address)
            .await
            .map_err(ProtocolError::Store)?;

        match Self::decrypt_with_record(&mut record, message) {
            Ok(plaintext) => {
                self.store
                    .store_session(&self.remote_address, &record)
                    .await
                    .map_err(ProtocolError::Store)?;
                Ok(plaintext)
            }
            Err(err) => {
                // Replays leave the session usable. Anything else means no
                // known state explains this envelope, which the phase
                // surfaces until the session is rebuilt.
                if !matches!(
                    err,
                    ProtocolError::DuplicateOrUnknownMessage { .. }
                        | ProtocolError::TooFarInFuture
                ) {
                    record
                        .session_state_mut()
                        .set_phase(SessionPhase::ResetPending);
                    self.store
                        .store_session(&self.remote_address, &record)
                        .await
                        .map_err(ProtocolError::Store)?;
                }
                Err(err)
            }
        }
    }

    /// Tries the current state, then each archived state. The winning
    /// clone is committed; a replay error anywhere wins over other
    /// failures because it means some state did recognize the envelope.
    fn decrypt_with_record(
        record: &mut SessionRecord,
        message: &SignalMessage,
    ) -> Result<Vec<u8>, ProtocolError> {
        let mut candidate = record.session_state().clone();
        let first_error = match Self::decrypt_with_state(&mut candidate, message) {
            Ok(plaintext) => {
                Self::commit(record.session_state_mut(), candidate);
                return Ok(plaintext);
            }
            Err(err) => err,
        };

        let mut replay_error = None;
        for index in 0..record.previous_states().len() {
            let mut candidate = record.previous_states()[index].clone();
            match Self::decrypt_with_state(&mut candidate, message) {
                Ok(plaintext) => {
                    log::debug!("message decrypted under archived session state {index}");
                    record.promote_state(index);
                    Self::commit(record.session_state_mut(), candidate);
                    return Ok(plaintext);
                }
                Err(err @ ProtocolError::DuplicateOrUnknownMessage { .. }) => {
                    replay_error.get_or_insert(err);
                }
                Err(_) => {}
            }
        }

        if matches!(first_error, ProtocolError::DuplicateOrUnknownMessage { .. }) {
            return Err(first_error);
        }
        Err(replay_error.unwrap_or(first_error))
    }

    fn commit(slot: &mut SessionState, mut decrypted: SessionState) {
        decrypted.set_phase(SessionPhase::Established);
        decrypted.clear_unacknowledged_prekey_message();
        *slot = decrypted;
    }

    fn decrypt_with_state(
        state: &mut SessionState,
        message: &SignalMessage,
    ) -> Result<Vec<u8>, ProtocolError> {
        if !state.has_sender_chain() {
            return Err(ProtocolError::UninitializedSession);
        }

        let their_ratchet_key = *message.sender_ratchet_key();
        let chain_key = Self::get_or_create_receiver_chain(state, &their_ratchet_key)?;
        let message_keys =
            Self::get_or_create_message_keys(state, &their_ratchet_key, chain_key, message.counter())?;

        message.verify_mac(
            message_keys.mac_key(),
            state.remote_identity(),
            state.local_identity(),
        )?;

        Ok(cbc::decrypt(
            message_keys.cipher_key(),
            message_keys.iv(),
            message.ciphertext(),
        )?)
    }

    /// Returns the receiving chain for the sender's current ratchet key,
    /// performing one full DH ratchet step when the key is new.
    fn get_or_create_receiver_chain(
        state: &mut SessionState,
        their_ratchet_key: &EcPublicKey,
    ) -> Result<ChainKey, ProtocolError> {
        if let Some(chain) = state.find_receiver_chain(their_ratchet_key) {
            return Ok(chain.chain_key.clone());
        }

        let our_ratchet_key = state
            .sender_ratchet_key_pair()
            .ok_or(ProtocolError::UninitializedSession)?
            .clone();
        let receiving = state
            .root_key()
            .create_chain(their_ratchet_key, &our_ratchet_key)?;
        let our_new_ratchet_key = curve::generate_key_pair();
        let sending = receiving
            .root_key
            .create_chain(their_ratchet_key, &our_new_ratchet_key)?;

        let previous_counter = state
            .sender_chain_key()
            .map(|ck| ck.index().saturating_sub(1))
            .unwrap_or(0);
        state.set_previous_counter(previous_counter);
        state.set_root_key(sending.root_key);
        state.add_receiver_chain(*their_ratchet_key, receiving.chain_key.clone());
        state.set_sender_chain(our_new_ratchet_key, sending.chain_key);

        Ok(receiving.chain_key)
    }

    /// Advances the receiving chain to `counter`, caching the keys of any
    /// skipped messages. Counters behind the chain must hit the cache.
    fn get_or_create_message_keys(
        state: &mut SessionState,
        their_ratchet_key: &EcPublicKey,
        chain_key: ChainKey,
        counter: u32,
    ) -> Result<MessageKeys, ProtocolError> {
        if chain_key.index() > counter {
            let chain = state
                .find_receiver_chain_mut(their_ratchet_key)
                .ok_or(ProtocolError::UninitializedSession)?;
            return chain.take_message_keys(counter).ok_or(
                ProtocolError::DuplicateOrUnknownMessage {
                    current: chain_key.index(),
                    received: counter,
                },
            );
        }

        if counter - chain_key.index() > MAX_FUTURE_MESSAGES {
            return Err(ProtocolError::TooFarInFuture);
        }

        let mut chain_key = chain_key;
        while chain_key.index() < counter {
            let skipped = chain_key.message_keys();
            if let Some(chain) = state.find_receiver_chain_mut(their_ratchet_key) {
                chain.add_message_keys(skipped);
            }
            chain_key = chain_key.next_key();
        }

        let message_keys = chain_key.message_keys();
        state.set_receiver_chain_key(their_ratchet_key, chain_key.next_key());
        Ok(message_keys)
    }
}
