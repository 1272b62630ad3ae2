use super::message::SenderKeyDistributionMessage;
use crate::error::ProtocolError;
use crate::sender_key_name::SenderKeyName;
use crate::store::SenderKeyStore;
use crate::util::keyhelper;
use std::sync::Arc;

/// Creates our own sender key for a group and installs keys received
/// from other members.
pub struct GroupSessionBuilder<S: SenderKeyStore> {
    store: Arc<S>,
}

impl<S: SenderKeyStore> GroupSessionBuilder<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Installs the sender key announced by another group member.
    pub async fn process(
        &self,
        name: &SenderKeyName,
        message: &SenderKeyDistributionMessage,
    ) -> Result<(), ProtocolError> {
        let mut record = self
            .store
            .load_sender_key(name)
            .await
            .map_err(ProtocolError::Store)?
            .unwrap_or_default();

        record.add_sender_key_state(
            message.key_id(),
            message.iteration(),
            *message.chain_key(),
            *message.signing_key(),
        );

        self.store
            .store_sender_key(name, &record)
            .await
            .map_err(ProtocolError::Store)
    }

    /// Returns the distribution message announcing our sender key for
    /// this group, creating the key on first use.
    pub async fn create(
        &self,
        name: &SenderKeyName,
    ) -> Result<SenderKeyDistributionMessage, ProtocolError> {
        let mut record = self
            .store
            .load_sender_key(name)
            .await
            .map_err(ProtocolError::Store)?
            .unwrap_or_default();

        let needs_key = match record.sender_key_state() {
            Some(state) => state.signing_key_private().is_none(),
            None => true,
        };
        if needs_key {
            record.set_sender_key_state(
                keyhelper::generate_sender_key_id(),
                0,
                keyhelper::generate_sender_key(),
                keyhelper::generate_sender_signing_key(),
            );
            self.store
                .store_sender_key(name, &record)
                .await
                .map_err(ProtocolError::Store)?;
        }

        let state = record
            .sender_key_state()
            .ok_or(ProtocolError::UninitializedSession)?;
        let chain = state.sender_chain_key();
        Ok(SenderKeyDistributionMessage::new(
            state.key_id(),
            chain.iteration(),
            chain.seed(),
            *state.signing_key_public(),
        ))
    }
}
