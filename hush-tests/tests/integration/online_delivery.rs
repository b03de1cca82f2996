//! Scenario 2 (SPEC_FULL.md §8): both peers online. A `MSG` is relayed to
//! the recipient's live connection immediately, with `NullID`, and the
//! sender's own request still gets its `OK` — the relay never touches the
//! cache.

use hush_client::ClientEvent;
use hush_core::MessageStore;
use hush_tests::{connect_client, register_user, spawn_server};

#[tokio::test]
async fn message_relays_immediately_when_recipient_is_online() {
    let (addr, services) = spawn_server().await.expect("server starts");

    let alice = connect_client(&addr, "test-server").await.expect("alice connects");
    register_user(&alice, "alice", b"alice-pass").await.expect("alice registers");
    alice.login("alice", b"alice-pass").await.expect("alice logs in");

    let bob = connect_client(&addr, "test-server").await.expect("bob connects");
    register_user(&bob, "bob", b"bob-pass").await.expect("bob registers");
    bob.login("bob", b"bob-pass").await.expect("bob logs in");

    // send_message's own request/reply round trip completing is alice's OK.
    alice
        .send_message("bob", "are you online?")
        .await
        .expect("alice's MSG is acknowledged");

    let event = tokio::time::timeout(std::time::Duration::from_secs(5), bob.next_event())
        .await
        .expect("relayed message arrives before timeout")
        .expect("connection still open");
    match event {
        ClientEvent::Message { sender, plaintext, .. } => {
            assert_eq!(sender, "alice");
            assert_eq!(plaintext, "are you online?");
        }
        other => panic!("expected a relayed Message event, got {other:?}"),
    }

    // An online relay never touches the cache (§4.6 "If dest has an active
    // session, relay ... Else insert into the cache").
    assert!(
        !services.message_store.has_any("bob").await.expect("query cache"),
        "an online relay must not be cached"
    );

    alice.close().await;
    bob.close().await;
}
