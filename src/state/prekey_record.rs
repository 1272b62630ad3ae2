use crate::ecc::key_pair::EcKeyPair;
use serde::{Deserialize, Serialize};

/// A locally stored one-time prekey.
#[derive(Serialize, Deserialize, Clone)]
pub struct PreKeyRecord {
    id: u32,
    key_pair: EcKeyPair,
}

impl PreKeyRecord {
    pub fn new(id: u32, key_pair: EcKeyPair) -> Self {
        Self { id, key_pair }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn key_pair(&self) -> &EcKeyPair {
        &self.key_pair
    }
}
