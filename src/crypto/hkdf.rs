use hkdf::Hkdf;
use sha2::Sha256;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HkdfError {
    #[error("invalid output length for HKDF expand")]
    InvalidLength,
}

/// HKDF-SHA256 extract-and-expand over `key` with the given salt and info.
pub fn sha256(
    key: &[u8],
    salt: Option<&[u8]>,
    info: &[u8],
    length: usize,
) -> Result<Vec<u8>, HkdfError> {
    let hk = Hkdf::<Sha256>::new(salt, key);
    let mut okm = vec![0u8; length];
    hk.expand(info, &mut okm)
        .map_err(|_| HkdfError::InvalidLength)?;
    Ok(okm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let a = sha256(b"input key material", Some(b"salt"), b"info", 64).unwrap();
        let b = sha256(b"input key material", Some(b"salt"), b"info", 64).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn matches_rfc5869_test_case_1() {
        let ikm = [0x0bu8; 22];
        let salt = hex::decode("000102030405060708090a0b0c").unwrap();
        let info = hex::decode("f0f1f2f3f4f5f6f7f8f9").unwrap();
        let okm = sha256(&ikm, Some(&salt), &info, 42).unwrap();
        assert_eq!(
            hex::encode(okm),
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865"
        );
    }

    #[test]
    fn info_separates_outputs() {
        let a = sha256(b"ikm", None, b"one", 32).unwrap();
        let b = sha256(b"ikm", None, b"two", 32).unwrap();
        assert_ne!(a, b);
    }
}
