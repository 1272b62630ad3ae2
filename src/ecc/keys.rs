use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Type byte prefixing serialized Curve25519 points in bundle and identity
/// encodings.
pub const DJB_TYPE: u8 = 0x05;

/// A Curve25519 public key (32-byte point).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EcPublicKey {
    bytes: [u8; 32],
}

impl EcPublicKey {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> [u8; 32] {
        self.bytes
    }

    /// Type-prefixed 33-byte encoding, used for bundle keys and in MAC
    /// transcripts. The wire envelope carries raw 32-byte keys instead.
    pub fn serialize(&self) -> Vec<u8> {
        let mut v = Vec::with_capacity(33);
        v.push(DJB_TYPE);
        v.extend_from_slice(&self.bytes);
        v
    }
}

/// A Curve25519 private scalar. Zeroed on drop.
#[derive(Serialize, Deserialize, Clone, Zeroize, ZeroizeOnDrop)]
pub struct EcPrivateKey {
    bytes: [u8; 32],
}

impl EcPrivateKey {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> [u8; 32] {
        self.bytes
    }
}
