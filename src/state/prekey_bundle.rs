use crate::ecc::keys::EcPublicKey;
use crate::identity::IdentityKey;

/// Published key material allowing session establishment while the owner
/// is offline. Externally supplied and consumed once by the builder.
pub struct PreKeyBundle {
    pub registration_id: u32,
    pub device_id: u32,
    pub pre_key_id: Option<u32>,
    pub pre_key_public: Option<EcPublicKey>,
    pub signed_pre_key_id: u32,
    pub signed_pre_key_public: EcPublicKey,
    pub signed_pre_key_signature: [u8; 64],
    pub identity_key: IdentityKey,
}
