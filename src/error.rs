use crate::crypto::cbc::CbcError;
use crate::ecc::curve::CurveError;
use crate::kdf::KdfError;
use std::error::Error;
use thiserror::Error;

/// Errors returned by store collaborators. The engine never interprets
/// these beyond propagation.
pub type StoreError = Box<dyn Error + Send + Sync>;

/// The crate error taxonomy. Every operation surfaces failures through
/// this enum; nothing is retried or silently dropped.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A supplied public key is not a valid curve point encoding.
    #[error("invalid key encoding (type byte {0:#04x})")]
    InvalidKeyEncoding(u8),

    /// A signed-prekey signature does not verify against the identity key.
    #[error("invalid signed prekey signature")]
    InvalidSignature,

    /// Envelope MAC or group-message signature verification failed.
    /// Terminal for that envelope; callers must not retry.
    #[error("message failed authentication")]
    InvalidMessageAuthentication,

    /// The counter is behind the chain and no cached key exists: either a
    /// replay (the key was consumed) or a message that never existed.
    #[error("duplicate or unknown message (chain index {current}, counter {received})")]
    DuplicateOrUnknownMessage { current: u32, received: u32 },

    /// A group message references a sender key id that was never
    /// distributed to this recipient.
    #[error("unknown sender key id {0}")]
    UnknownSender(u32),

    /// Truncated input, trailing garbage, an unsupported version byte, or
    /// a varint out of range.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(&'static str),

    /// The remote identity key failed the trust check.
    #[error("untrusted remote identity")]
    UntrustedIdentity,

    /// The session has no sending chain yet (or no local sender key state,
    /// for the group layer).
    #[error("uninitialized session")]
    UninitializedSession,

    /// The counter jumps further ahead than the engine will ratchet in one
    /// step.
    #[error("counter is too far in the future")]
    TooFarInFuture,

    #[error("no signed prekey with id {0}")]
    NoSignedPreKey(u32),

    #[error("KDF failure: {0}")]
    Kdf(#[from] KdfError),

    #[error("cipher failure: {0}")]
    Cipher(#[from] CbcError),

    #[error("store error: {0}")]
    Store(#[source] StoreError),
}

impl From<CurveError> for ProtocolError {
    fn from(e: CurveError) -> Self {
        match e {
            CurveError::BadKeyType(t) => ProtocolError::InvalidKeyEncoding(t),
        }
    }
}
