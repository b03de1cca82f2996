//! Scenario 3 (SPEC_FULL.md §8): Alice is logged in on one connection,
//! subscribed to the `duplicate_session` hook. A second connection trying to
//! LOGIN as `alice` is rejected with `ERR(Login)`, and the incumbent
//! connection receives the hook push.

use hush_client::{ClientError, ClientEvent};
use hush_protocol::{ErrorCode, HookId};
use hush_tests::{connect_client, register_user, spawn_server};

#[tokio::test]
async fn second_login_is_rejected_and_incumbent_is_notified() {
    let (addr, _services) = spawn_server().await.expect("server starts");

    let incumbent = connect_client(&addr, "test-server").await.expect("first connection");
    register_user(&incumbent, "alice", b"alice-pass")
        .await
        .expect("alice registers");
    incumbent.login("alice", b"alice-pass").await.expect("first login succeeds");
    incumbent
        .subscribe_hook(HookId::DuplicateSession)
        .await
        .expect("subscribes to duplicate_session");

    let challenger = connect_client(&addr, "test-server").await.expect("second connection");
    // `Client::login` needs *some* locally stored identity under "alice" to
    // get past its own precondition check before it ever writes LOGIN to
    // the wire; its keypair need not match the one alice registered with,
    // since the server's duplicate-session check in `issue_challenge` runs
    // before any key material is touched (§4.5 "Session establishment").
    challenger
        .generate_identity("alice", b"unrelated-local-passphrase")
        .await
        .expect("challenger creates a throwaway local identity");
    let error = challenger
        .login("alice", b"unrelated-local-passphrase")
        .await
        .expect_err("a second concurrent session for the same username must be rejected");
    match error {
        ClientError::Server(code) => assert_eq!(code, ErrorCode::Login),
        other => panic!("expected ErrorCode::Login, got {other:?}"),
    }

    let event = tokio::time::timeout(std::time::Duration::from_secs(5), incumbent.next_event())
        .await
        .expect("hook arrives before timeout")
        .expect("connection still open");
    match event {
        ClientEvent::Hook { hook, subject, .. } => {
            assert_eq!(hook, HookId::DuplicateSession);
            assert_eq!(subject, "alice");
        }
        other => panic!("expected a DuplicateSession hook event, got {other:?}"),
    }

    incumbent.close().await;
    challenger.close().await;
}
