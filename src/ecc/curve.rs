use super::key_pair::EcKeyPair;
use super::keys::{DJB_TYPE, EcPrivateKey, EcPublicKey};
use rand::rngs::OsRng;
use thiserror::Error;
use x25519_dalek::{PublicKey, StaticSecret, x25519};
use xeddsa::xed25519::{PrivateKey as XedPrivateKey, PublicKey as XedPublicKey};
use xeddsa::{Sign, Verify};

#[derive(Debug, Error)]
pub enum CurveError {
    #[error("bad key type byte: {0:#04x}")]
    BadKeyType(u8),
}

/// Generates a fresh X25519 key pair from OS randomness.
pub fn generate_key_pair() -> EcKeyPair {
    let private = StaticSecret::random_from_rng(OsRng);
    let public = PublicKey::from(&private);
    EcKeyPair::new(
        EcPublicKey::new(*public.as_bytes()),
        EcPrivateKey::new(private.to_bytes()),
    )
}

/// Parses a type-prefixed 33-byte public key encoding.
pub fn decode_point(bytes: &[u8]) -> Result<EcPublicKey, CurveError> {
    if bytes.is_empty() {
        return Err(CurveError::BadKeyType(0));
    }
    let key_type = bytes[0];
    if key_type != DJB_TYPE {
        return Err(CurveError::BadKeyType(key_type));
    }
    let key_bytes: [u8; 32] = bytes[1..]
        .try_into()
        .map_err(|_| CurveError::BadKeyType(key_type))?;
    Ok(EcPublicKey::new(key_bytes))
}

/// X25519 Diffie-Hellman agreement.
pub fn calculate_shared_secret(
    our_private_key: &EcPrivateKey,
    their_public_key: &EcPublicKey,
) -> [u8; 32] {
    x25519(our_private_key.bytes(), their_public_key.bytes())
}

/// XEdDSA signature over `message` with an X25519 signing key.
pub fn calculate_signature(signing_key: &EcPrivateKey, message: &[u8]) -> [u8; 64] {
    let priv_key = XedPrivateKey(signing_key.bytes());
    let mut rng = OsRng;
    priv_key.sign(message, &mut rng)
}

pub fn verify_signature(signing_key: &EcPublicKey, message: &[u8], signature: &[u8; 64]) -> bool {
    let pub_key = XedPublicKey(signing_key.bytes());
    pub_key.verify(message, signature).is_ok()
}
