use crate::chain_key::ChainKey;
use crate::ecc::curve::calculate_shared_secret;
use crate::ecc::key_pair::EcKeyPair;
use crate::ecc::keys::EcPublicKey;
use crate::kdf::{self, KdfError};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

const DERIVED_SECRETS_SIZE: usize = 64;
const KDF_INFO: &str = "WhisperRatchet";

/// The top-level ratchet secret. Never used to encrypt directly; only as
/// KDF input when a Diffie-Hellman ratchet step derives a new chain.
#[derive(Serialize, Deserialize, Clone, Zeroize, ZeroizeOnDrop)]
pub struct RootKey {
    key: [u8; 32],
}

/// Output of a DH ratchet step: the advanced root key plus the fresh chain.
pub struct SessionKeyPair {
    pub root_key: RootKey,
    pub chain_key: ChainKey,
}

impl RootKey {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    pub fn key(&self) -> [u8; 32] {
        self.key
    }

    /// One DH ratchet step: KDF(root, DH(ours, theirs)) yields the next
    /// root key and a chain key at index 0.
    pub fn create_chain(
        &self,
        their_ratchet_key: &EcPublicKey,
        our_ratchet_key: &EcKeyPair,
    ) -> Result<SessionKeyPair, KdfError> {
        let shared_secret =
            calculate_shared_secret(&our_ratchet_key.private_key, their_ratchet_key);

        let derived = kdf::derive_secrets(
            &shared_secret,
            Some(&self.key),
            KDF_INFO.as_bytes(),
            DERIVED_SECRETS_SIZE,
        )?;

        let root_key: [u8; 32] = derived[0..32].try_into().expect("split is 32 bytes");
        let chain_key: [u8; 32] = derived[32..64].try_into().expect("split is 32 bytes");

        Ok(SessionKeyPair {
            root_key: RootKey::new(root_key),
            chain_key: ChainKey::new(chain_key, 0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecc::curve::generate_key_pair;

    #[test]
    fn both_sides_derive_the_same_chain() {
        let root = RootKey::new([3u8; 32]);
        let alice = generate_key_pair();
        let bob = generate_key_pair();

        let from_alice = root.create_chain(&bob.public_key, &alice).unwrap();
        let from_bob = root.create_chain(&alice.public_key, &bob).unwrap();

        assert_eq!(from_alice.root_key.key(), from_bob.root_key.key());
        assert_eq!(from_alice.chain_key.key(), from_bob.chain_key.key());
        assert_eq!(from_alice.chain_key.index(), 0);
    }

    #[test]
    fn step_advances_the_root() {
        let root = RootKey::new([3u8; 32]);
        let ours = generate_key_pair();
        let theirs = generate_key_pair();
        let stepped = root.create_chain(&theirs.public_key, &ours).unwrap();
        assert_ne!(stepped.root_key.key(), root.key());
    }
}
