//! Scenario 4 (SPEC_FULL.md §8): an OWNER/ADMIN schedules a shutdown; every
//! online session (including the admin's own) receives `SHTDWN`, and once
//! the scheduled instant passes the listener stops accepting new
//! connections.

use chrono::{Duration as ChronoDuration, Utc};
use hush_client::ClientEvent;
use hush_db_entities::Permission;
use hush_tests::{connect_client, register_user, register_user_with_permission, spawn_server};

#[tokio::test]
async fn scheduled_shutdown_notifies_sessions_and_stops_the_listener() {
    let (addr, services) = spawn_server().await.expect("server starts");

    let admin = connect_client(&addr, "test-server").await.expect("admin connects");
    register_user_with_permission(&admin, &services, "root", b"root-pass", Permission::Admin)
        .await
        .expect("root registers and is promoted");
    admin.login("root", b"root-pass").await.expect("root logs in");

    let bystander = connect_client(&addr, "test-server").await.expect("bystander connects");
    register_user(&bystander, "bystander", b"bystander-pass")
        .await
        .expect("bystander registers");
    bystander.login("bystander", b"bystander-pass").await.expect("bystander logs in");

    // `encode_timestamp`/`decode_timestamp` round-trip at whole-second
    // precision (§6 "A UNIX timestamp argument is an 8-byte signed
    // big-endian seconds-since-epoch"), so this must clear "now" by a full
    // second even after truncation, or the server's `at <= Utc::now()`
    // rejection could trip on a same-second race.
    let scheduled_at = Utc::now() + ChronoDuration::seconds(2);
    admin.admin_shutdown(scheduled_at).await.expect("owner schedules shutdown");

    for client in [&admin, &bystander] {
        let event = tokio::time::timeout(std::time::Duration::from_secs(5), client.next_event())
            .await
            .expect("SHTDWN arrives before timeout")
            .expect("connection still open");
        match event {
            ClientEvent::Shutdown { at } => {
                assert_eq!(at.timestamp(), scheduled_at.timestamp());
            }
            other => panic!("expected a Shutdown event, got {other:?}"),
        }
    }

    // Give the scheduled timer time to fire and the accept loop to drop its
    // listener (§4.5 "Shutdown": "signals the accept loop to stop").
    tokio::time::sleep(std::time::Duration::from_millis(2500)).await;
    assert!(services.shutdown.is_stopped(), "shutdown coordinator should have fired by now");

    let refused = hush_client::Connection::connect_plain(&addr).await;
    assert!(
        refused.is_err(),
        "no new connection should be accepted once the listener has stopped"
    );

    admin.close().await;
    bystander.close().await;
}
