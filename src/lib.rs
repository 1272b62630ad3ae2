//! Double Ratchet secure-session engine.
//!
//! The crate implements the cryptographic core of an asynchronous secure
//! messaging system: X3DH-style session establishment from prekey bundles,
//! a Diffie-Hellman ratchet with per-message symmetric key chains, a
//! sender-key group messaging layer, and the binary envelope codec.
//!
//! Storage and transport are external collaborators. The engine calls the
//! async traits in [`store`] around every operation but implements none of
//! them (an in-memory reference store is provided for tests and embedding).
//! Each [`state::session_record::SessionRecord`] must be driven under a
//! single-writer discipline: ratchet advancement is destructive, so one
//! send or receive operation must complete fully before the next begins.

pub mod address;
pub mod chain_key;
pub mod crypto;
pub mod ecc;
pub mod error;
pub mod groups;
pub mod identity;
pub mod kdf;
pub mod message_key;
pub mod protocol;
pub mod ratchet;
pub mod root_key;
pub mod sender_key_name;
pub mod session;
pub mod state;
pub mod store;
pub mod util;

pub use error::ProtocolError;
pub use session::{SessionBuilder, SessionCipher};
