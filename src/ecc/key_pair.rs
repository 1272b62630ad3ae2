use super::keys::{EcPrivateKey, EcPublicKey};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone)]
pub struct EcKeyPair {
    pub public_key: EcPublicKey,
    pub private_key: EcPrivateKey,
}

impl EcKeyPair {
    pub fn new(public_key: EcPublicKey, private_key: EcPrivateKey) -> Self {
        Self {
            public_key,
            private_key,
        }
    }
}
