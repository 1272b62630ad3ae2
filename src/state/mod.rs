pub mod prekey_bundle;
pub mod prekey_record;
pub mod sender_key_record;
pub mod sender_key_state;
pub mod session_record;
pub mod session_state;
pub mod signed_prekey_record;
