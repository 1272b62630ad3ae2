//! In-memory store, primarily for tests and short-lived processes.
//!
//! Identity trust is first-use: an unknown address is trusted, and the
//! key seen on first save must match from then on.

use super::{IdentityKeyStore, PreKeyStore, SenderKeyStore, SessionStore, SignedPreKeyStore};
use crate::address::SignalAddress;
use crate::error::StoreError;
use crate::identity::{IdentityKey, IdentityKeyPair};
use crate::sender_key_name::SenderKeyName;
use crate::state::prekey_record::PreKeyRecord;
use crate::state::sender_key_record::SenderKeyRecord;
use crate::state::session_record::SessionRecord;
use crate::state::signed_prekey_record::SignedPreKeyRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct MemoryStore {
    identity_key_pair: IdentityKeyPair,
    registration_id: u32,
    trusted_identities: Mutex<HashMap<SignalAddress, IdentityKey>>,
    prekeys: Mutex<HashMap<u32, PreKeyRecord>>,
    signed_prekeys: Mutex<HashMap<u32, SignedPreKeyRecord>>,
    sessions: Mutex<HashMap<SignalAddress, SessionRecord>>,
    sender_keys: Mutex<HashMap<String, SenderKeyRecord>>,
}

impl MemoryStore {
    pub fn new(identity_key_pair: IdentityKeyPair, registration_id: u32) -> Self {
        Self {
            identity_key_pair,
            registration_id,
            trusted_identities: Mutex::new(HashMap::new()),
            prekeys: Mutex::new(HashMap::new()),
            signed_prekeys: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            sender_keys: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl IdentityKeyStore for MemoryStore {
    async fn get_identity_key_pair(&self) -> Result<IdentityKeyPair, StoreError> {
        Ok(self.identity_key_pair.clone())
    }

    async fn get_local_registration_id(&self) -> Result<u32, StoreError> {
        Ok(self.registration_id)
    }

    async fn is_trusted_identity(
        &self,
        address: &SignalAddress,
        identity_key: &IdentityKey,
    ) -> Result<bool, StoreError> {
        let trusted = self.trusted_identities.lock().unwrap();
        Ok(match trusted.get(address) {
            Some(known) => known == identity_key,
            None => true,
        })
    }

    async fn save_identity(
        &self,
        address: &SignalAddress,
        identity_key: &IdentityKey,
    ) -> Result<(), StoreError> {
        self.trusted_identities
            .lock()
            .unwrap()
            .insert(address.clone(), identity_key.clone());
        Ok(())
    }
}

#[async_trait]
impl PreKeyStore for MemoryStore {
    async fn load_prekey(&self, prekey_id: u32) -> Result<Option<PreKeyRecord>, StoreError> {
        Ok(self.prekeys.lock().unwrap().get(&prekey_id).cloned())
    }

    async fn store_prekey(&self, prekey_id: u32, record: PreKeyRecord) -> Result<(), StoreError> {
        self.prekeys.lock().unwrap().insert(prekey_id, record);
        Ok(())
    }

    async fn contains_prekey(&self, prekey_id: u32) -> Result<bool, StoreError> {
        Ok(self.prekeys.lock().unwrap().contains_key(&prekey_id))
    }

    async fn remove_prekey(&self, prekey_id: u32) -> Result<(), StoreError> {
        self.prekeys.lock().unwrap().remove(&prekey_id);
        Ok(())
    }
}

#[async_trait]
impl SignedPreKeyStore for MemoryStore {
    async fn load_signed_prekey(
        &self,
        signed_prekey_id: u32,
    ) -> Result<Option<SignedPreKeyRecord>, StoreError> {
        Ok(self
            .signed_prekeys
            .lock()
            .unwrap()
            .get(&signed_prekey_id)
            .cloned())
    }

    async fn store_signed_prekey(
        &self,
        signed_prekey_id: u32,
        record: SignedPreKeyRecord,
    ) -> Result<(), StoreError> {
        self.signed_prekeys
            .lock()
            .unwrap()
            .insert(signed_prekey_id, record);
        Ok(())
    }

    async fn contains_signed_prekey(&self, signed_prekey_id: u32) -> Result<bool, StoreError> {
        Ok(self
            .signed_prekeys
            .lock()
            .unwrap()
            .contains_key(&signed_prekey_id))
    }

    async fn remove_signed_prekey(&self, signed_prekey_id: u32) -> Result<(), StoreError> {
        self.signed_prekeys.lock().unwrap().remove(&signed_prekey_id);
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load_session(&self, address: &SignalAddress) -> Result<SessionRecord, StoreError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_default())
    }

    async fn store_session(
        &self,
        address: &SignalAddress,
        record: &SessionRecord,
    ) -> Result<(), StoreError> {
        self.sessions
            .lock()
            .unwrap()
            .insert(address.clone(), record.clone());
        Ok(())
    }

    async fn contains_session(&self, address: &SignalAddress) -> Result<bool, StoreError> {
        Ok(self.sessions.lock().unwrap().contains_key(address))
    }

    async fn delete_session(&self, address: &SignalAddress) -> Result<(), StoreError> {
        self.sessions.lock().unwrap().remove(address);
        Ok(())
    }

    async fn delete_all_sessions(&self, name: &str) -> Result<(), StoreError> {
        self.sessions
            .lock()
            .unwrap()
            .retain(|address, _| address.name() != name);
        Ok(())
    }
}

#[async_trait]
impl SenderKeyStore for MemoryStore {
    async fn store_sender_key(
        &self,
        name: &SenderKeyName,
        record: &SenderKeyRecord,
    ) -> Result<(), StoreError> {
        self.sender_keys
            .lock()
            .unwrap()
            .insert(name.to_string(), record.clone());
        Ok(())
    }

    async fn load_sender_key(
        &self,
        name: &SenderKeyName,
    ) -> Result<Option<SenderKeyRecord>, StoreError> {
        Ok(self.sender_keys.lock().unwrap().get(&name.to_string()).cloned())
    }
}
