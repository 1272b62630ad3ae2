//! Generators for the key material a client provisions before it can
//! participate: identity, prekeys, and group sender keys.

use crate::ecc::curve;
use crate::ecc::key_pair::EcKeyPair;
use crate::identity::{IdentityKey, IdentityKeyPair};
use crate::state::prekey_record::PreKeyRecord;
use crate::state::signed_prekey_record::SignedPreKeyRecord;
use chrono::Utc;
use rand::{Rng, RngCore, thread_rng};

pub fn generate_identity_key_pair() -> IdentityKeyPair {
    let pair = curve::generate_key_pair();
    IdentityKeyPair::new(IdentityKey::new(pair.public_key), pair.private_key)
}

pub fn generate_registration_id() -> u32 {
    thread_rng().gen_range(1..=16380)
}

/// Generates `count` one-time prekeys with ids wrapping within the
/// 24-bit id space.
pub fn generate_pre_keys(start: u32, count: u32) -> Vec<PreKeyRecord> {
    (0..count)
        .map(|i| {
            let id = ((start.wrapping_add(i).wrapping_sub(1)) % 0xFFFFFE) + 1;
            PreKeyRecord::new(id, curve::generate_key_pair())
        })
        .collect()
}

/// Generates a signed prekey, signing its type-prefixed public encoding
/// with the identity key.
pub fn generate_signed_pre_key(identity_key_pair: &IdentityKeyPair, id: u32) -> SignedPreKeyRecord {
    let key_pair = curve::generate_key_pair();
    let signature = curve::calculate_signature(
        identity_key_pair.private_key(),
        &key_pair.public_key.serialize(),
    );
    SignedPreKeyRecord::new(id, key_pair, signature, Utc::now())
}

pub fn generate_sender_key() -> [u8; 32] {
    let mut key = [0u8; 32];
    thread_rng().fill_bytes(&mut key);
    key
}

pub fn generate_sender_signing_key() -> EcKeyPair {
    curve::generate_key_pair()
}

pub fn generate_sender_key_id() -> u32 {
    thread_rng().r#gen::<u32>() >> 1
}
