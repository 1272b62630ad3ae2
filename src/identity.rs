use crate::ecc::curve::CurveError;
use crate::ecc::keys::{EcPrivateKey, EcPublicKey};
use serde::{Deserialize, Serialize};

/// A long-term identity public key.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct IdentityKey {
    public_key: EcPublicKey,
}

impl IdentityKey {
    pub fn new(public_key: EcPublicKey) -> Self {
        Self { public_key }
    }

    pub fn public_key(&self) -> EcPublicKey {
        self.public_key
    }

    /// Type-prefixed encoding, fed into envelope MAC transcripts.
    pub fn serialize(&self) -> Vec<u8> {
        self.public_key.serialize()
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, CurveError> {
        Ok(Self::new(crate::ecc::curve::decode_point(bytes)?))
    }
}

/// A long-term identity key pair.
#[derive(Clone)]
pub struct IdentityKeyPair {
    public_key: IdentityKey,
    private_key: EcPrivateKey,
}

impl IdentityKeyPair {
    pub fn new(public_key: IdentityKey, private_key: EcPrivateKey) -> Self {
        Self {
            public_key,
            private_key,
        }
    }

    pub fn public_key(&self) -> &IdentityKey {
        &self.public_key
    }

    pub fn private_key(&self) -> &EcPrivateKey {
        &self.private_key
    }
}
