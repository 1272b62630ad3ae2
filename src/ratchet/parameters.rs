use crate::ecc::key_pair::EcKeyPair;
use crate::ecc::keys::EcPublicKey;
use crate::identity::{IdentityKey, IdentityKeyPair};

/// Parameters when we are initiating the session from a prekey bundle.
pub struct SenderParameters {
    pub our_identity_key_pair: IdentityKeyPair,
    pub our_base_key: EcKeyPair,
    pub their_identity_key: IdentityKey,
    pub their_signed_pre_key: EcPublicKey,
    pub their_one_time_pre_key: Option<EcPublicKey>,
}

/// Parameters when we are responding to a session initiation.
pub struct ReceiverParameters<'a> {
    pub our_identity_key_pair: IdentityKeyPair,
    pub our_signed_pre_key: EcKeyPair,
    pub our_one_time_pre_key: Option<&'a EcKeyPair>,
    pub their_identity_key: IdentityKey,
    pub their_base_key: EcPublicKey,
}
