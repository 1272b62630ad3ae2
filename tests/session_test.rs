//! End-to-end session establishment and two-way messaging.

use axolotl::address::SignalAddress;
use axolotl::protocol::{Ciphertext, PREKEY_TYPE, PreKeySignalMessage, SignalMessage, WHISPER_TYPE};
use axolotl::session::{SessionBuilder, SessionCipher};
use axolotl::state::prekey_bundle::PreKeyBundle;
use axolotl::state::session_state::SessionPhase;
use axolotl::store::memory::MemoryStore;
use axolotl::store::{IdentityKeyStore, PreKeyStore, SessionStore, SignedPreKeyStore};
use axolotl::util::keyhelper;
use axolotl::ProtocolError;
use std::sync::Arc;

fn new_store() -> Arc<MemoryStore> {
    let _ = env_logger::builder().is_test(true).try_init();
    Arc::new(MemoryStore::new(
        keyhelper::generate_identity_key_pair(),
        keyhelper::generate_registration_id(),
    ))
}

/// Generates and stores the owner's prekeys, returning the bundle a
/// server would publish for them.
async fn publish_bundle(
    store: &Arc<MemoryStore>,
    prekey_id: Option<u32>,
    signed_prekey_id: u32,
) -> PreKeyBundle {
    let identity = store.get_identity_key_pair().await.unwrap();
    let signed = keyhelper::generate_signed_pre_key(&identity, signed_prekey_id);
    store
        .store_signed_prekey(signed.id(), signed.clone())
        .await
        .unwrap();

    let prekey = match prekey_id {
        Some(id) => {
            let record = keyhelper::generate_pre_keys(id, 1).remove(0);
            store.store_prekey(record.id(), record.clone()).await.unwrap();
            Some(record)
        }
        None => None,
    };

    PreKeyBundle {
        registration_id: store.get_local_registration_id().await.unwrap(),
        device_id: 1,
        pre_key_id: prekey.as_ref().map(|p| p.id()),
        pre_key_public: prekey.as_ref().map(|p| p.key_pair().public_key),
        signed_pre_key_id: signed.id(),
        signed_pre_key_public: signed.key_pair().public_key,
        signed_pre_key_signature: signed.signature(),
        identity_key: identity.public_key().clone(),
    }
}

/// Round-trips an envelope through its wire encoding, the way a real
/// transport would deliver it.
fn transport(envelope: &Ciphertext) -> Ciphertext {
    let bytes = envelope.serialize();
    match envelope.message_type() {
        PREKEY_TYPE => Ciphertext::PreKey(PreKeySignalMessage::deserialize(&bytes).unwrap()),
        WHISPER_TYPE => Ciphertext::Whisper(SignalMessage::deserialize(&bytes).unwrap()),
        other => panic!("unexpected envelope type {other}"),
    }
}

#[tokio::test]
async fn establishes_session_and_exchanges_messages() {
    let alice_store = new_store();
    let bob_store = new_store();
    let alice_address = SignalAddress::new("alice".into(), 1);
    let bob_address = SignalAddress::new("bob".into(), 1);

    let bundle = publish_bundle(&bob_store, Some(31337), 22).await;
    SessionBuilder::new(alice_store.clone(), bob_address.clone())
        .process_bundle(&bundle)
        .await
        .unwrap();

    let alice_cipher = SessionCipher::new(alice_store.clone(), bob_address.clone());
    let bob_cipher = SessionCipher::new(bob_store.clone(), alice_address.clone());

    // Until Bob replies, every envelope from Alice carries the bundle
    // references.
    let outgoing = alice_cipher.encrypt(b"hello bob").await.unwrap();
    assert_eq!(outgoing.message_type(), PREKEY_TYPE);
    let session = alice_store.load_session(&bob_address).await.unwrap();
    assert_eq!(
        session.session_state().phase(),
        SessionPhase::AwaitingFirstMessage
    );

    let plaintext = bob_cipher.decrypt(&transport(&outgoing)).await.unwrap();
    assert_eq!(plaintext, b"hello bob");
    let session = bob_store.load_session(&alice_address).await.unwrap();
    assert_eq!(session.session_state().phase(), SessionPhase::Established);

    // The consumed one-time prekey is gone.
    assert!(!bob_store.contains_prekey(31337).await.unwrap());

    let reply = bob_cipher.encrypt(b"hello alice").await.unwrap();
    assert_eq!(reply.message_type(), WHISPER_TYPE);
    let plaintext = alice_cipher.decrypt(&transport(&reply)).await.unwrap();
    assert_eq!(plaintext, b"hello alice");

    // Bob's reply both establishes Alice's side and acknowledges the
    // session, so her envelopes shrink to plain messages.
    let session = alice_store.load_session(&bob_address).await.unwrap();
    assert_eq!(session.session_state().phase(), SessionPhase::Established);
    let next = alice_cipher.encrypt(b"shorter now").await.unwrap();
    assert_eq!(next.message_type(), WHISPER_TYPE);
    assert_eq!(
        bob_cipher.decrypt(&transport(&next)).await.unwrap(),
        b"shorter now"
    );
}

#[tokio::test]
async fn long_conversation_keeps_ratcheting() {
    let alice_store = new_store();
    let bob_store = new_store();
    let alice_address = SignalAddress::new("alice".into(), 1);
    let bob_address = SignalAddress::new("bob".into(), 1);

    let bundle = publish_bundle(&bob_store, Some(1), 1).await;
    SessionBuilder::new(alice_store.clone(), bob_address.clone())
        .process_bundle(&bundle)
        .await
        .unwrap();

    let alice_cipher = SessionCipher::new(alice_store, bob_address);
    let bob_cipher = SessionCipher::new(bob_store, alice_address);

    for round in 0..30u32 {
        let from_alice = format!("alice round {round}");
        let envelope = alice_cipher.encrypt(from_alice.as_bytes()).await.unwrap();
        assert_eq!(
            bob_cipher.decrypt(&transport(&envelope)).await.unwrap(),
            from_alice.as_bytes()
        );

        let from_bob = format!("bob round {round}");
        let envelope = bob_cipher.encrypt(from_bob.as_bytes()).await.unwrap();
        assert_eq!(
            alice_cipher.decrypt(&transport(&envelope)).await.unwrap(),
            from_bob.as_bytes()
        );
    }
}

#[tokio::test]
async fn bundle_without_one_time_prekey_still_works() {
    let alice_store = new_store();
    let bob_store = new_store();
    let alice_address = SignalAddress::new("alice".into(), 1);
    let bob_address = SignalAddress::new("bob".into(), 1);

    let bundle = publish_bundle(&bob_store, None, 5).await;
    SessionBuilder::new(alice_store.clone(), bob_address.clone())
        .process_bundle(&bundle)
        .await
        .unwrap();

    let alice_cipher = SessionCipher::new(alice_store, bob_address);
    let bob_cipher = SessionCipher::new(bob_store, alice_address);

    let envelope = alice_cipher.encrypt(b"no one-time prekey").await.unwrap();
    assert_eq!(
        bob_cipher.decrypt(&transport(&envelope)).await.unwrap(),
        b"no one-time prekey"
    );
}

#[tokio::test]
async fn tampered_bundle_signature_is_rejected() {
    let alice_store = new_store();
    let bob_store = new_store();
    let bob_address = SignalAddress::new("bob".into(), 1);

    let mut bundle = publish_bundle(&bob_store, Some(1), 1).await;
    bundle.signed_pre_key_signature[10] ^= 0x01;

    let result = SessionBuilder::new(alice_store, bob_address)
        .process_bundle(&bundle)
        .await;
    assert!(matches!(result, Err(ProtocolError::InvalidSignature)));
}

#[tokio::test]
async fn encrypt_without_session_fails() {
    let store = new_store();
    let cipher = SessionCipher::new(store, SignalAddress::new("stranger".into(), 1));
    assert!(matches!(
        cipher.encrypt(b"into the void").await,
        Err(ProtocolError::UninitializedSession)
    ));
}

#[tokio::test]
async fn retransmitted_initiation_reuses_the_session() {
    let alice_store = new_store();
    let bob_store = new_store();
    let alice_address = SignalAddress::new("alice".into(), 1);
    let bob_address = SignalAddress::new("bob".into(), 1);

    let bundle = publish_bundle(&bob_store, Some(1), 1).await;
    SessionBuilder::new(alice_store.clone(), bob_address.clone())
        .process_bundle(&bundle)
        .await
        .unwrap();

    let alice_cipher = SessionCipher::new(alice_store, bob_address);
    let bob_cipher = SessionCipher::new(bob_store, alice_address);

    // Two initiation envelopes from the same session: the second must not
    // tear down the state the first one built.
    let first = alice_cipher.encrypt(b"first").await.unwrap();
    let second = alice_cipher.encrypt(b"second").await.unwrap();
    assert_eq!(second.message_type(), PREKEY_TYPE);

    assert_eq!(
        bob_cipher.decrypt(&transport(&first)).await.unwrap(),
        b"first"
    );
    assert_eq!(
        bob_cipher.decrypt(&transport(&second)).await.unwrap(),
        b"second"
    );
}
