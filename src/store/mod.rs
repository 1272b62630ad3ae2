//! Persistence traits the engine calls into. Implementations own
//! durability and locking; the engine only loads, mutates, and stores
//! back.

pub mod memory;

use crate::address::SignalAddress;
use crate::error::StoreError;
use crate::identity::{IdentityKey, IdentityKeyPair};
use crate::sender_key_name::SenderKeyName;
use crate::state::prekey_record::PreKeyRecord;
use crate::state::sender_key_record::SenderKeyRecord;
use crate::state::session_record::SessionRecord;
use crate::state::signed_prekey_record::SignedPreKeyRecord;
use async_trait::async_trait;

#[async_trait]
pub trait IdentityKeyStore: Send + Sync {
    async fn get_identity_key_pair(&self) -> Result<IdentityKeyPair, StoreError>;
    async fn get_local_registration_id(&self) -> Result<u32, StoreError>;
    async fn is_trusted_identity(
        &self,
        address: &SignalAddress,
        identity_key: &IdentityKey,
    ) -> Result<bool, StoreError>;
    async fn save_identity(
        &self,
        address: &SignalAddress,
        identity_key: &IdentityKey,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait PreKeyStore: Send + Sync {
    async fn load_prekey(&self, prekey_id: u32) -> Result<Option<PreKeyRecord>, StoreError>;
    async fn store_prekey(&self, prekey_id: u32, record: PreKeyRecord) -> Result<(), StoreError>;
    async fn contains_prekey(&self, prekey_id: u32) -> Result<bool, StoreError>;
    async fn remove_prekey(&self, prekey_id: u32) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SignedPreKeyStore: Send + Sync {
    async fn load_signed_prekey(
        &self,
        signed_prekey_id: u32,
    ) -> Result<Option<SignedPreKeyRecord>, StoreError>;
    async fn store_signed_prekey(
        &self,
        signed_prekey_id: u32,
        record: SignedPreKeyRecord,
    ) -> Result<(), StoreError>;
    async fn contains_signed_prekey(&self, signed_prekey_id: u32) -> Result<bool, StoreError>;
    async fn remove_signed_prekey(&self, signed_prekey_id: u32) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the stored record, or a fresh one if none exists yet.
    async fn load_session(&self, address: &SignalAddress) -> Result<SessionRecord, StoreError>;
    async fn store_session(
        &self,
        address: &SignalAddress,
        record: &SessionRecord,
    ) -> Result<(), StoreError>;
    async fn contains_session(&self, address: &SignalAddress) -> Result<bool, StoreError>;
    async fn delete_session(&self, address: &SignalAddress) -> Result<(), StoreError>;
    /// Deletes the sessions for every device of `name`.
    async fn delete_all_sessions(&self, name: &str) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SenderKeyStore: Send + Sync {
    async fn store_sender_key(
        &self,
        name: &SenderKeyName,
        record: &SenderKeyRecord,
    ) -> Result<(), StoreError>;
    async fn load_sender_key(
        &self,
        name: &SenderKeyName,
    ) -> Result<Option<SenderKeyRecord>, StoreError>;
}

pub trait SignalProtocolStore:
    IdentityKeyStore + PreKeyStore + SignedPreKeyStore + SessionStore + SenderKeyStore
{
}

impl<T: IdentityKeyStore + PreKeyStore + SignedPreKeyStore + SessionStore + SenderKeyStore>
    SignalProtocolStore for T
{
}
