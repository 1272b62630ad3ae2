use crate::crypto;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KdfError {
    #[error("HKDF error: {0}")]
    Hkdf(#[from] crypto::hkdf::HkdfError),
}

/// HKDF-SHA256 derivation used everywhere key material is expanded.
pub fn derive_secrets(
    input_key_material: &[u8],
    salt: Option<&[u8]>,
    info: &[u8],
    output_length: usize,
) -> Result<Vec<u8>, KdfError> {
    Ok(crypto::hkdf::sha256(
        input_key_material,
        salt,
        info,
        output_length,
    )?)
}

/// The per-message secrets split out of an 80-byte derivation.
pub struct KeyMaterial {
    pub cipher_key: [u8; 32],
    pub mac_key: [u8; 32],
    pub iv: [u8; 16],
}
