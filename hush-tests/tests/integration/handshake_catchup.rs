//! Scenario 1 (SPEC_FULL.md §8): Alice registers and logs in; Bob registers
//! but stays offline. Alice sends Bob a message while he's offline, so it
//! lands in the cache; when Bob later logs in, catch-up delivers it before
//! any other reply, and the cache is empty afterward.

use hush_client::ClientEvent;
use hush_core::MessageStore;
use hush_tests::{connect_client, register_user, spawn_server};

#[tokio::test]
async fn offline_message_is_delivered_on_catchup_login() {
    let (addr, services) = spawn_server().await.expect("server starts");

    let alice = connect_client(&addr, "test-server").await.expect("alice connects");
    register_user(&alice, "alice", b"alice-pass").await.expect("alice registers");
    alice.login("alice", b"alice-pass").await.expect("alice logs in");

    let bob = connect_client(&addr, "test-server").await.expect("bob connects");
    register_user(&bob, "bob", b"bob-pass").await.expect("bob registers");

    // Bob is offline at this point: the server caches the message instead of
    // relaying it immediately (§4.6 "MSG(dest, ...)").
    alice
        .send_message("bob", "hey bob, you there?")
        .await
        .expect("alice sends to offline bob");
    assert!(
        services.message_store.has_any("bob").await.expect("query cache"),
        "message should be cached for the offline recipient"
    );

    // Bob logs in; catch-up must deliver the cached message as an
    // unsolicited push before we do anything else with his connection.
    bob.login("bob", b"bob-pass").await.expect("bob logs in");

    let event = tokio::time::timeout(std::time::Duration::from_secs(5), bob.next_event())
        .await
        .expect("catch-up message arrives before timeout")
        .expect("connection still open");
    match event {
        ClientEvent::Message { sender, plaintext, .. } => {
            assert_eq!(sender, "alice");
            assert_eq!(plaintext, "hey bob, you there?");
        }
        other => panic!("expected a catch-up Message event, got {other:?}"),
    }

    // §3 "Cached message" lifecycle: catch-up drains and deletes up to the
    // newest delivered entry, so nothing is left for bob afterward.
    assert!(
        !services.message_store.has_any("bob").await.expect("query cache"),
        "cache must be empty after catch-up delivers everything"
    );

    alice.close().await;
    bob.close().await;
}
