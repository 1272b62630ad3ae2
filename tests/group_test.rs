//! Sender-key group messaging: distribution, fan-in decryption, ordering
//! and replay.

use axolotl::groups::message::{SenderKeyDistributionMessage, SenderKeyMessage};
use axolotl::groups::{GroupCipher, GroupSessionBuilder};
use axolotl::protocol::CiphertextMessage;
use axolotl::sender_key_name::SenderKeyName;
use axolotl::store::memory::MemoryStore;
use axolotl::util::keyhelper;
use axolotl::ProtocolError;
use std::sync::Arc;

fn new_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(
        keyhelper::generate_identity_key_pair(),
        keyhelper::generate_registration_id(),
    ))
}

fn name(sender: &str) -> SenderKeyName {
    SenderKeyName::new("pirates".into(), sender.into())
}

/// Wire round trip for a group envelope.
fn transport(message: &SenderKeyMessage) -> SenderKeyMessage {
    SenderKeyMessage::deserialize(message.serialized()).unwrap()
}

/// Creates Alice's sender key and installs it at Bob's end, the way the
/// distribution message would travel through a pairwise session.
async fn distribute(
    alice_store: &Arc<MemoryStore>,
    bob_store: &Arc<MemoryStore>,
) -> SenderKeyDistributionMessage {
    let distribution = GroupSessionBuilder::new(alice_store.clone())
        .create(&name("alice"))
        .await
        .unwrap();

    let received =
        SenderKeyDistributionMessage::deserialize(&distribution.serialize()).unwrap();
    GroupSessionBuilder::new(bob_store.clone())
        .process(&name("alice"), &received)
        .await
        .unwrap();

    distribution
}

#[tokio::test]
async fn group_messages_flow_after_distribution() {
    let alice_store = new_store();
    let bob_store = new_store();
    distribute(&alice_store, &bob_store).await;

    let alice_cipher = GroupCipher::new(name("alice"), alice_store);
    let bob_cipher = GroupCipher::new(name("alice"), bob_store);

    for i in 0..10u32 {
        let body = format!("ahoy {i}");
        let envelope = alice_cipher.encrypt(body.as_bytes()).await.unwrap();
        assert_eq!(envelope.iteration(), i);
        assert_eq!(
            bob_cipher.decrypt(&transport(&envelope)).await.unwrap(),
            body.as_bytes()
        );
    }
}

#[tokio::test]
async fn group_messages_decrypt_out_of_order() {
    let alice_store = new_store();
    let bob_store = new_store();
    distribute(&alice_store, &bob_store).await;

    let alice_cipher = GroupCipher::new(name("alice"), alice_store);
    let bob_cipher = GroupCipher::new(name("alice"), bob_store);

    let first = alice_cipher.encrypt(b"one").await.unwrap();
    let second = alice_cipher.encrypt(b"two").await.unwrap();
    let third = alice_cipher.encrypt(b"three").await.unwrap();

    assert_eq!(bob_cipher.decrypt(&transport(&third)).await.unwrap(), b"three");
    assert_eq!(bob_cipher.decrypt(&transport(&first)).await.unwrap(), b"one");
    assert_eq!(bob_cipher.decrypt(&transport(&second)).await.unwrap(), b"two");
}

#[tokio::test]
async fn replayed_group_message_is_rejected() {
    let alice_store = new_store();
    let bob_store = new_store();
    distribute(&alice_store, &bob_store).await;

    let alice_cipher = GroupCipher::new(name("alice"), alice_store);
    let bob_cipher = GroupCipher::new(name("alice"), bob_store);

    let envelope = alice_cipher.encrypt(b"once").await.unwrap();
    assert_eq!(bob_cipher.decrypt(&transport(&envelope)).await.unwrap(), b"once");
    assert!(matches!(
        bob_cipher.decrypt(&transport(&envelope)).await,
        Err(ProtocolError::DuplicateOrUnknownMessage { .. })
    ));
}

#[tokio::test]
async fn message_from_undistributed_sender_is_unknown() {
    let alice_store = new_store();
    let bob_store = new_store();

    let distribution = GroupSessionBuilder::new(alice_store.clone())
        .create(&name("alice"))
        .await
        .unwrap();
    let alice_cipher = GroupCipher::new(name("alice"), alice_store);
    let bob_cipher = GroupCipher::new(name("alice"), bob_store);

    // Bob never processed the distribution message.
    let envelope = alice_cipher.encrypt(b"who dis").await.unwrap();
    assert!(matches!(
        bob_cipher.decrypt(&transport(&envelope)).await,
        Err(ProtocolError::UnknownSender(id)) if id == distribution.key_id()
    ));
}

#[tokio::test]
async fn tampered_group_message_fails_signature_check() {
    let alice_store = new_store();
    let bob_store = new_store();
    distribute(&alice_store, &bob_store).await;

    let alice_cipher = GroupCipher::new(name("alice"), alice_store);
    let bob_cipher = GroupCipher::new(name("alice"), bob_store);

    let envelope = alice_cipher.encrypt(b"signed goods").await.unwrap();
    let mut bytes = envelope.serialized().to_vec();
    let flip_at = bytes.len() - 64 - 1;
    bytes[flip_at] ^= 0x01;
    let tampered = SenderKeyMessage::deserialize(&bytes).unwrap();

    assert!(matches!(
        bob_cipher.decrypt(&tampered).await,
        Err(ProtocolError::InvalidMessageAuthentication)
    ));
}

#[tokio::test]
async fn encrypting_without_a_local_sender_key_fails() {
    let store = new_store();
    let cipher = GroupCipher::new(name("alice"), store);
    assert!(matches!(
        cipher.encrypt(b"no key yet").await,
        Err(ProtocolError::UninitializedSession)
    ));
}

#[tokio::test]
async fn recipient_cannot_encrypt_with_a_received_key() {
    let alice_store = new_store();
    let bob_store = new_store();
    distribute(&alice_store, &bob_store).await;

    // Bob only holds the public signing half of Alice's key.
    let bob_cipher = GroupCipher::new(name("alice"), bob_store);
    assert!(matches!(
        bob_cipher.encrypt(b"forgery").await,
        Err(ProtocolError::UninitializedSession)
    ));
}

#[tokio::test]
async fn distribution_message_is_idempotent() {
    let alice_store = new_store();
    let bob_store = new_store();
    let distribution = distribute(&alice_store, &bob_store).await;

    let alice_cipher = GroupCipher::new(name("alice"), alice_store.clone());
    let bob_cipher = GroupCipher::new(name("alice"), bob_store.clone());

    let before = alice_cipher.encrypt(b"before").await.unwrap();
    assert_eq!(bob_cipher.decrypt(&transport(&before)).await.unwrap(), b"before");

    // Processing the same announcement again must not lose chain progress
    // for messages that follow.
    GroupSessionBuilder::new(bob_store)
        .process(&name("alice"), &distribution)
        .await
        .unwrap();
    let after = alice_cipher.encrypt(b"after").await.unwrap();
    assert_eq!(bob_cipher.decrypt(&transport(&after)).await.unwrap(), b"after");
}
