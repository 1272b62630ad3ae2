//! X3DH-style initial key agreement. Both derivations consume the same
//! four Diffie-Hellman results in the same order, so the initiator's root
//! and first chain match the responder's.

pub mod parameters;

use crate::ecc::curve::calculate_shared_secret;
use crate::kdf::{self, KdfError};
use crate::root_key::{RootKey, SessionKeyPair};
use parameters::{ReceiverParameters, SenderParameters};

const DISCONTINUITY: [u8; 32] = [0xFF; 32];
const KDF_INFO: &str = "WhisperText";
const DERIVED_SECRETS_SIZE: usize = 64;

/// Initiator-side agreement: combines our identity and ephemeral base key
/// with the bundle's signed prekey (and one-time prekey when present).
pub fn calculate_sender_session(params: &SenderParameters) -> Result<SessionKeyPair, KdfError> {
    let mut master_secret = Vec::with_capacity(32 * 5);
    master_secret.extend_from_slice(&DISCONTINUITY);

    // DH1: our identity key, their signed prekey
    master_secret.extend_from_slice(&calculate_shared_secret(
        params.our_identity_key_pair.private_key(),
        &params.their_signed_pre_key,
    ));

    // DH2: our base key, their identity key
    master_secret.extend_from_slice(&calculate_shared_secret(
        &params.our_base_key.private_key,
        &params.their_identity_key.public_key(),
    ));

    // DH3: our base key, their signed prekey
    master_secret.extend_from_slice(&calculate_shared_secret(
        &params.our_base_key.private_key,
        &params.their_signed_pre_key,
    ));

    // DH4 (optional): our base key, their one-time prekey
    if let Some(one_time_pre_key) = &params.their_one_time_pre_key {
        master_secret.extend_from_slice(&calculate_shared_secret(
            &params.our_base_key.private_key,
            one_time_pre_key,
        ));
    }

    derive_initial_keys(&master_secret)
}

/// Responder-side agreement: the mirror image of
/// [`calculate_sender_session`], computed from our prekey private halves
/// and the initiator's public keys.
pub fn calculate_receiver_session(params: &ReceiverParameters) -> Result<SessionKeyPair, KdfError> {
    let mut master_secret = Vec::with_capacity(32 * 5);
    master_secret.extend_from_slice(&DISCONTINUITY);

    // DH1: our signed prekey, their identity key
    master_secret.extend_from_slice(&calculate_shared_secret(
        &params.our_signed_pre_key.private_key,
        &params.their_identity_key.public_key(),
    ));

    // DH2: our identity key, their base key
    master_secret.extend_from_slice(&calculate_shared_secret(
        params.our_identity_key_pair.private_key(),
        &params.their_base_key,
    ));

    // DH3: our signed prekey, their base key
    master_secret.extend_from_slice(&calculate_shared_secret(
        &params.our_signed_pre_key.private_key,
        &params.their_base_key,
    ));

    // DH4 (optional): our one-time prekey, their base key
    if let Some(one_time_pre_key) = params.our_one_time_pre_key {
        master_secret.extend_from_slice(&calculate_shared_secret(
            &one_time_pre_key.private_key,
            &params.their_base_key,
        ));
    }

    derive_initial_keys(&master_secret)
}

fn derive_initial_keys(master_secret: &[u8]) -> Result<SessionKeyPair, KdfError> {
    let derived = kdf::derive_secrets(
        master_secret,
        None,
        KDF_INFO.as_bytes(),
        DERIVED_SECRETS_SIZE,
    )?;
    let root_key: [u8; 32] = derived[0..32].try_into().expect("split is 32 bytes");
    let chain_key: [u8; 32] = derived[32..64].try_into().expect("split is 32 bytes");
    Ok(SessionKeyPair {
        root_key: RootKey::new(root_key),
        chain_key: crate::chain_key::ChainKey::new(chain_key, 0),
    })
}
