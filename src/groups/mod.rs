//! Sender-key group messaging: one hash ratchet per (group, sender),
//! fanned out once through pairwise sessions, then used for every group
//! message from that sender.

pub mod builder;
pub mod cipher;
pub mod message;
pub mod ratchet;

pub use builder::GroupSessionBuilder;
pub use cipher::GroupCipher;
