use aes::Aes256;
use cbc::{Decryptor, Encryptor};
use cipher::{
    BlockDecryptMut, BlockEncryptMut, KeyIvInit,
    block_padding::Pkcs7,
};
use thiserror::Error;

type Aes256CbcEnc = Encryptor<Aes256>;
type Aes256CbcDec = Decryptor<Aes256>;

#[derive(Debug, Error)]
pub enum CbcError {
    #[error("invalid key or IV length for CBC mode: {0}")]
    InvalidLength(#[from] cipher::InvalidLength),
    #[error("ciphertext length {0} is not a positive multiple of the block size")]
    InvalidCiphertextLength(usize),
    #[error("invalid padding")]
    InvalidPadding,
}

type Result<T> = std::result::Result<T, CbcError>;

pub fn encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let enc = Aes256CbcEnc::new_from_slices(key, iv)?;
    Ok(enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

pub fn decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
        return Err(CbcError::InvalidCiphertextLength(ciphertext.len()));
    }
    let mut buf = ciphertext.to_vec();
    let plaintext = Aes256CbcDec::new_from_slices(key, iv)?
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| CbcError::InvalidPadding)?;
    Ok(plaintext.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let key = [0x42u8; 32];
        let iv = [0x24u8; 16];
        let ct = encrypt(&key, &iv, b"attack at dawn").unwrap();
        assert_eq!(decrypt(&key, &iv, &ct).unwrap(), b"attack at dawn");
    }

    #[test]
    fn rejects_partial_blocks() {
        let key = [0u8; 32];
        let iv = [0u8; 16];
        assert!(matches!(
            decrypt(&key, &iv, &[0u8; 15]),
            Err(CbcError::InvalidCiphertextLength(15))
        ));
        assert!(matches!(
            decrypt(&key, &iv, &[]),
            Err(CbcError::InvalidCiphertextLength(0))
        ));
    }
}
