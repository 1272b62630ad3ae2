use crate::ecc::key_pair::EcKeyPair;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;

/// A locally stored signed prekey: a medium-term key pair plus the
/// signature over its public half made with the identity key.
#[derive(Serialize, Deserialize, Clone)]
pub struct SignedPreKeyRecord {
    id: u32,
    key_pair: EcKeyPair,
    #[serde(with = "BigArray")]
    signature: [u8; 64],
    timestamp: DateTime<Utc>,
}

impl SignedPreKeyRecord {
    pub fn new(
        id: u32,
        key_pair: EcKeyPair,
        signature: [u8; 64],
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            key_pair,
            signature,
            timestamp,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn key_pair(&self) -> &EcKeyPair {
        &self.key_pair
    }

    pub fn signature(&self) -> [u8; 64] {
        self.signature
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
