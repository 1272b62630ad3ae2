//! Low-level cryptographic building blocks: HKDF-SHA256 derivation and
//! AES-256-CBC message encryption.

pub mod cbc;
pub mod hkdf;
