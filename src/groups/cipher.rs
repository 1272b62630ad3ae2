use super::message::SenderKeyMessage;
use super::ratchet;
use crate::crypto::cbc;
use crate::error::ProtocolError;
use crate::sender_key_name::SenderKeyName;
use crate::store::SenderKeyStore;
use std::sync::Arc;

/// Encrypts and decrypts group messages for one (group, sender) ratchet.
pub struct GroupCipher<S: SenderKeyStore> {
    sender_key_name: SenderKeyName,
    store: Arc<S>,
}

impl<S: SenderKeyStore> GroupCipher<S> {
    pub fn new(sender_key_name: SenderKeyName, store: Arc<S>) -> Self {
        Self {
            sender_key_name,
            store,
        }
    }

    /// Encrypts one message under our own sender key. Fails with
    /// [`ProtocolError::UninitializedSession`] when this key was never
    /// created locally.
    pub async fn encrypt(&self, plaintext: &[u8]) -> Result<SenderKeyMessage, ProtocolError> {
        let mut record = self
            .store
            .load_sender_key(&self.sender_key_name)
            .await
            .map_err(ProtocolError::Store)?
            .ok_or(ProtocolError::UninitializedSession)?;

        let state = record
            .sender_key_state_mut()
            .ok_or(ProtocolError::UninitializedSession)?;
        let signing_key = state
            .signing_key_private()
            .ok_or(ProtocolError::UninitializedSession)?
            .clone();

        let chain_key = state.sender_chain_key().clone();
        let message_key = chain_key.sender_message_key();
        let ciphertext = cbc::encrypt(message_key.cipher_key(), message_key.iv(), plaintext)?;

        let message = SenderKeyMessage::new(
            state.key_id(),
            message_key.iteration(),
            ciphertext,
            &signing_key,
        );

        state.set_sender_chain_key(chain_key.next());
        self.store
            .store_sender_key(&self.sender_key_name, &record)
            .await
            .map_err(ProtocolError::Store)?;

        Ok(message)
    }

    /// Decrypts one group message. State is committed back to the store
    /// only after the whole pipeline succeeds, so a failed attempt leaves
    /// no trace.
    pub async fn decrypt(&self, message: &SenderKeyMessage) -> Result<Vec<u8>, ProtocolError> {
        let mut record = self
            .store
            .load_sender_key(&self.sender_key_name)
            .await
            .map_err(ProtocolError::Store)?
            .ok_or(ProtocolError::UnknownSender(message.key_id()))?;

        let state = record
            .sender_key_state_by_id_mut(message.key_id())
            .ok_or(ProtocolError::UnknownSender(message.key_id()))?;

        message.verify_signature(state.signing_key_public())?;

        let message_key = ratchet::get_sender_key(state, message.iteration())?;
        let plaintext = cbc::decrypt(
            message_key.cipher_key(),
            message_key.iv(),
            message.ciphertext(),
        )?;

        self.store
            .store_sender_key(&self.sender_key_name, &record)
            .await
            .map_err(ProtocolError::Store)?;

        Ok(plaintext)
    }
}
